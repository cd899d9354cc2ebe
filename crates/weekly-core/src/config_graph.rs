//! # Configuration Catalog
//!
//! The catalog is a small typed graph of five node levels:
//!
//! ```text
//! Domain ──< Brand ──< Model >──< Baseline
//!    └──< Module
//! ```
//!
//! - A brand belongs to one or more domains (`domainIds`).
//! - A model belongs to exactly one brand (`brandId`) and may list baselines.
//! - A baseline applies to one or more models (`modelIds`).
//! - A business module applies to one or more domains (`domainIds`).
//!
//! The model/baseline association is read from both sides: a baseline is a
//! child of a model if either record points at the other.
//!
//! ## Integrity
//!
//! Creation and update reject references to nodes that do not exist.
//! Deletion is restricted by default: a node that is still referenced cannot
//! be removed unless the caller passes `DeleteMode::Force`, which leaves the
//! references dangling. Dangling references resolve to `UNKNOWN_LABEL` on read
//! and are never an error.
//!
//! Every mutation requires an administrator and bumps the catalog-wide
//! `updatedAt` that drives configuration sync.

use crate::primitives::{MAX_NAME_LENGTH, UNKNOWN_LABEL};
use crate::types::next_stamp;
use crate::{Dependents, Identity, Level, RecordId, Selection, WeeklyError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

// =============================================================================
// NODE TYPES
// =============================================================================

/// Outgoing references of a catalog node.
///
/// Which fields a node may carry depends on its level; see `ConfigGraph::add_node`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRefs {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub domain_ids: BTreeSet<RecordId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::types::blank"
    )]
    pub brand_id: Option<RecordId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub model_ids: BTreeSet<RecordId>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub baseline_ids: BTreeSet<RecordId>,
}

impl NodeRefs {
    /// Every reference as `(target level, target id)`.
    pub fn targets(&self) -> impl Iterator<Item = (Level, &RecordId)> + '_ {
        self.domain_ids
            .iter()
            .map(|id| (Level::Domain, id))
            .chain(self.brand_id.iter().map(|id| (Level::Brand, id)))
            .chain(self.model_ids.iter().map(|id| (Level::Model, id)))
            .chain(self.baseline_ids.iter().map(|id| (Level::Baseline, id)))
    }

    /// True when these refs point at `(level, id)`.
    #[must_use]
    pub fn references(&self, level: Level, id: &RecordId) -> bool {
        self.targets().any(|(l, target)| l == level && target == id)
    }

    fn count(&self, level: Level) -> usize {
        self.targets().filter(|&(l, _)| l == level).count()
    }
}

/// A node of the configuration catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigNode {
    pub id: RecordId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub refs: NodeRefs,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeData {
    pub name: String,
    pub description: String,
    pub refs: NodeRefs,
}

impl NodeData {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_refs(mut self, refs: NodeRefs) -> Self {
        self.refs = refs;
        self
    }
}

/// Partial update of a node. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub refs: Option<NodeRefs>,
}

/// How `delete_node` treats a node that is still referenced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Refuse with `WeeklyError::Dependency`.
    #[default]
    Restrict,
    /// Delete anyway and leave dangling references behind.
    Force,
}

/// One reference rule: a node of some level may point at `target`.
struct RefRule {
    target: Level,
    required: bool,
}

fn ref_rules(level: Level) -> &'static [RefRule] {
    match level {
        Level::Domain => &[],
        Level::Brand | Level::Module => &[RefRule {
            target: Level::Domain,
            required: true,
        }],
        Level::Model => &[
            RefRule {
                target: Level::Brand,
                required: true,
            },
            RefRule {
                target: Level::Baseline,
                required: false,
            },
        ],
        Level::Baseline => &[RefRule {
            target: Level::Model,
            required: true,
        }],
    }
}

// =============================================================================
// CONFIG GRAPH
// =============================================================================

/// The whole configuration catalog, stored and synced as one document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigGraph {
    #[serde(default)]
    domains: Vec<ConfigNode>,
    #[serde(default)]
    brands: Vec<ConfigNode>,
    #[serde(default)]
    models: Vec<ConfigNode>,
    #[serde(default)]
    baselines: Vec<ConfigNode>,
    #[serde(default)]
    business_modules: Vec<ConfigNode>,
    /// Last catalog mutation. `None` for a catalog that was never edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl ConfigGraph {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a catalog document, rejecting malformed content.
    pub fn from_json(value: serde_json::Value) -> Result<Self, WeeklyError> {
        let graph: Self = serde_json::from_value(value)
            .map_err(|e| WeeklyError::Validation(format!("malformed configuration: {e}")))?;
        graph.check_integrity()?;
        Ok(graph)
    }

    /// Verify that every node has a non-blank id, unique within its level.
    pub fn check_integrity(&self) -> Result<(), WeeklyError> {
        for level in Level::ALL {
            let mut seen = HashSet::new();
            for node in self.nodes(level) {
                if node.id.is_blank() {
                    return Err(WeeklyError::Validation(format!(
                        "{level} '{}' has an empty id",
                        node.name
                    )));
                }
                if !seen.insert(&node.id) {
                    return Err(WeeklyError::Validation(format!(
                        "duplicate {level} id {}",
                        node.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Last mutation time of the catalog.
    #[must_use]
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// All nodes at a level, in insertion order.
    #[must_use]
    pub fn nodes(&self, level: Level) -> &[ConfigNode] {
        match level {
            Level::Domain => &self.domains,
            Level::Brand => &self.brands,
            Level::Model => &self.models,
            Level::Baseline => &self.baselines,
            Level::Module => &self.business_modules,
        }
    }

    fn nodes_mut(&mut self, level: Level) -> &mut Vec<ConfigNode> {
        match level {
            Level::Domain => &mut self.domains,
            Level::Brand => &mut self.brands,
            Level::Model => &mut self.models,
            Level::Baseline => &mut self.baselines,
            Level::Module => &mut self.business_modules,
        }
    }

    /// Total number of nodes across all levels.
    #[must_use]
    pub fn node_count(&self) -> usize {
        Level::ALL.iter().map(|&l| self.nodes(l).len()).sum()
    }

    #[must_use]
    pub fn find(&self, level: Level, id: &RecordId) -> Option<&ConfigNode> {
        self.nodes(level).iter().find(|n| &n.id == id)
    }

    #[must_use]
    pub fn contains(&self, level: Level, id: &RecordId) -> bool {
        self.find(level, id).is_some()
    }

    /// Display name of a node, or `UNKNOWN_LABEL` when unset or dangling.
    #[must_use]
    pub fn label(&self, level: Level, id: Option<&RecordId>) -> &str {
        id.and_then(|id| self.find(level, id))
            .map_or(UNKNOWN_LABEL, |n| n.name.as_str())
    }

    // =========================================================================
    // CASCADE
    // =========================================================================

    /// Nodes at `level` that belong to `parent`, in insertion order.
    ///
    /// The parent is a domain for brands and modules, a brand for models and
    /// a model for baselines. Without a parent every node at the level is
    /// returned. Domains have no parent.
    #[must_use]
    pub fn list_children(&self, level: Level, parent: Option<&RecordId>) -> Vec<&ConfigNode> {
        let Some(parent) = parent else {
            return self.nodes(level).iter().collect();
        };
        match level {
            Level::Domain => self.domains.iter().collect(),
            Level::Brand => Self::pointing_at(&self.brands, Level::Domain, parent),
            Level::Module => self.modules_for_domain(parent),
            Level::Model => Self::pointing_at(&self.models, Level::Brand, parent),
            Level::Baseline => {
                let listed = self
                    .find(Level::Model, parent)
                    .map(|m| &m.refs.baseline_ids);
                self.baselines
                    .iter()
                    .filter(|b| {
                        b.refs.references(Level::Model, parent)
                            || listed.is_some_and(|ids| ids.contains(&b.id))
                    })
                    .collect()
            }
        }
    }

    /// Business modules applicable to a domain.
    #[must_use]
    pub fn modules_for_domain(&self, domain: &RecordId) -> Vec<&ConfigNode> {
        Self::pointing_at(&self.business_modules, Level::Domain, domain)
    }

    fn pointing_at<'a>(
        nodes: &'a [ConfigNode],
        level: Level,
        parent: &RecordId,
    ) -> Vec<&'a ConfigNode> {
        nodes
            .iter()
            .filter(|n| n.refs.references(level, parent))
            .collect()
    }

    /// True when the four ids form a valid path through the catalog.
    #[must_use]
    pub fn validate_selection(&self, selection: &Selection) -> bool {
        let (Some(domain), Some(brand), Some(model), Some(baseline)) = (
            selection.domain_id.as_ref(),
            selection.brand_id.as_ref(),
            selection.model_id.as_ref(),
            selection.baseline_id.as_ref(),
        ) else {
            return false;
        };
        self.contains(Level::Domain, domain)
            && self
                .list_children(Level::Brand, Some(domain))
                .iter()
                .any(|n| &n.id == brand)
            && self
                .list_children(Level::Model, Some(brand))
                .iter()
                .any(|n| &n.id == model)
            && self
                .list_children(Level::Baseline, Some(model))
                .iter()
                .any(|n| &n.id == baseline)
    }

    /// Pre-checked references for a new node: every candidate parent except
    /// the single-valued brand of a model.
    #[must_use]
    pub fn default_refs(&self, level: Level) -> NodeRefs {
        let ids = |l: Level| self.nodes(l).iter().map(|n| n.id.clone()).collect();
        match level {
            Level::Domain => NodeRefs::default(),
            Level::Brand | Level::Module => NodeRefs {
                domain_ids: ids(Level::Domain),
                ..NodeRefs::default()
            },
            Level::Model => NodeRefs {
                baseline_ids: ids(Level::Baseline),
                ..NodeRefs::default()
            },
            Level::Baseline => NodeRefs {
                model_ids: ids(Level::Model),
                ..NodeRefs::default()
            },
        }
    }

    // =========================================================================
    // INTEGRITY
    // =========================================================================

    /// Count the nodes that still reference `(level, id)`, per level.
    #[must_use]
    pub fn dependents(&self, level: Level, id: &RecordId) -> Dependents {
        let mut deps = Dependents::default();
        for owner in Level::ALL {
            for node in self.nodes(owner) {
                if node.refs.references(level, id) {
                    deps.add(owner);
                }
            }
        }
        deps
    }

    fn check_data(&self, level: Level, name: &str, refs: &NodeRefs) -> Result<(), WeeklyError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(WeeklyError::Validation(format!("{level} name is required")));
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(WeeklyError::Validation(format!(
                "{level} name exceeds {MAX_NAME_LENGTH} characters"
            )));
        }

        let rules = ref_rules(level);
        for (target, id) in refs.targets() {
            if !rules.iter().any(|r| r.target == target) {
                return Err(WeeklyError::Validation(format!(
                    "a {level} cannot reference a {target}"
                )));
            }
            if !self.contains(target, id) {
                return Err(WeeklyError::Validation(format!(
                    "{target} {id} does not exist"
                )));
            }
        }
        for rule in rules.iter().filter(|r| r.required) {
            if refs.count(rule.target) == 0 {
                return Err(WeeklyError::Validation(format!(
                    "a {level} must reference at least one {}",
                    rule.target
                )));
            }
        }
        Ok(())
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = Some(next_stamp(self.updated_at.unwrap_or(now), now));
    }

    // =========================================================================
    // MUTATIONS (admin only)
    // =========================================================================

    /// Create a node at `level`.
    pub fn add_node(
        &mut self,
        actor: &Identity,
        level: Level,
        data: NodeData,
    ) -> Result<ConfigNode, WeeklyError> {
        actor.ensure_admin()?;
        self.check_data(level, &data.name, &data.refs)?;

        let now = Utc::now();
        let node = ConfigNode {
            id: RecordId::generate(),
            name: data.name.trim().to_string(),
            description: data.description.trim().to_string(),
            refs: data.refs,
            created_at: now,
            updated_at: now,
        };
        self.nodes_mut(level).push(node.clone());
        self.touch(now);
        Ok(node)
    }

    /// Apply a partial update to an existing node.
    pub fn update_node(
        &mut self,
        actor: &Identity,
        level: Level,
        id: &RecordId,
        patch: NodePatch,
    ) -> Result<ConfigNode, WeeklyError> {
        actor.ensure_admin()?;
        let current = self
            .find(level, id)
            .ok_or_else(|| WeeklyError::not_found(level.name(), id))?;

        let name = patch.name.unwrap_or_else(|| current.name.clone());
        let description = patch
            .description
            .unwrap_or_else(|| current.description.clone());
        let refs = patch.refs.unwrap_or_else(|| current.refs.clone());
        self.check_data(level, &name, &refs)?;

        let now = Utc::now();
        let Some(node) = self.nodes_mut(level).iter_mut().find(|n| &n.id == id) else {
            return Err(WeeklyError::not_found(level.name(), id));
        };
        node.name = name.trim().to_string();
        node.description = description.trim().to_string();
        node.refs = refs;
        node.updated_at = next_stamp(node.updated_at, now);
        let updated = node.clone();
        self.touch(now);
        Ok(updated)
    }

    /// Remove a node. Restricted deletes fail while dependents exist.
    pub fn delete_node(
        &mut self,
        actor: &Identity,
        level: Level,
        id: &RecordId,
        mode: DeleteMode,
    ) -> Result<ConfigNode, WeeklyError> {
        actor.ensure_admin()?;
        let index = self
            .nodes(level)
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| WeeklyError::not_found(level.name(), id))?;

        if mode == DeleteMode::Restrict {
            let dependents = self.dependents(level, id);
            if !dependents.is_empty() {
                return Err(WeeklyError::Dependency {
                    level,
                    id: id.clone(),
                    dependents,
                });
            }
        }

        let removed = self.nodes_mut(level).remove(index);
        self.touch(Utc::now());
        Ok(removed)
    }
}

// =============================================================================
// TESTS
// =============================================================================
