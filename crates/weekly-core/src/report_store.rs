//! # Report Store
//!
//! Owns every weekly report and enforces ownership on each operation:
//! a report is readable and writable by its owner or by an administrator.
//!
//! Permission is checked before any state change, so a rejected call leaves
//! the store untouched. Creation stamps `createdAt` once; every later change
//! moves `updatedAt` forward and never backwards.

use crate::config_graph::ConfigGraph;
use crate::primitives::{MAX_WORK_CONTENT_LENGTH, RETENTION_DAYS};
use crate::types::next_stamp;
use crate::{
    Identity, Level, RecordId, Report, ReportDraft, ReportPatch, ReportStatus, WeeklyError,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Dashboard counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStatistics {
    /// Every report in the store.
    pub total: usize,
    /// Distinct owners with a report created in the retention window.
    pub active_users: usize,
    /// Reports owned by the requester.
    pub mine: usize,
    /// Reports still in draft.
    pub drafts: usize,
}

/// In-memory collection of reports, persisted as one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportStore {
    reports: Vec<Report>,
}

impl ReportStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from decoded records, rejecting blank or duplicate ids.
    pub fn from_records(records: Vec<Report>) -> Result<Self, WeeklyError> {
        let mut seen = HashSet::new();
        for report in &records {
            if report.id.is_blank() || report.user_id.is_blank() {
                return Err(WeeklyError::Validation(
                    "report record without id or owner".to_string(),
                ));
            }
            if !seen.insert(&report.id) {
                return Err(WeeklyError::Validation(format!(
                    "duplicate report id {}",
                    report.id
                )));
            }
        }
        Ok(Self { reports: records })
    }

    #[must_use]
    pub fn records(&self) -> &[Report] {
        &self.reports
    }

    #[must_use]
    pub fn into_records(self) -> Vec<Report> {
        self.reports
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Index of a report the requester may touch.
    fn authorized(&self, requester: &Identity, id: &RecordId) -> Result<usize, WeeklyError> {
        let index = self
            .reports
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| WeeklyError::not_found("report", id))?;
        if !requester.can_access(&self.reports[index].user_id) {
            return Err(WeeklyError::Permission(format!(
                "report {id} belongs to another user"
            )));
        }
        Ok(index)
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Create a report owned by `owner`.
    pub fn create(
        &mut self,
        owner: &Identity,
        draft: ReportDraft,
        catalog: &ConfigGraph,
    ) -> Result<Report, WeeklyError> {
        validate_draft(&draft, None, catalog)?;

        let now = Utc::now();
        let report = Report {
            id: RecordId::generate(),
            user_id: owner.user_id.clone(),
            selection: draft.selection,
            start_date: draft.start_date,
            end_date: draft.end_date,
            content: draft.content,
            status: draft.status,
            created_at: now,
            updated_at: now,
        };
        self.reports.push(report.clone());
        Ok(report)
    }

    /// Apply a patch to a report the requester owns (or any report, for admins).
    pub fn update(
        &mut self,
        requester: &Identity,
        id: &RecordId,
        patch: ReportPatch,
        catalog: &ConfigGraph,
    ) -> Result<Report, WeeklyError> {
        let index = self.authorized(requester, id)?;

        let mut draft = ReportDraft::from(&self.reports[index]);
        if let Some(selection) = patch.selection {
            draft.selection = selection;
        }
        if let Some(start) = patch.start_date {
            draft.start_date = start;
        }
        if let Some(end) = patch.end_date {
            draft.end_date = end;
        }
        if let Some(content) = patch.content {
            draft.content = content;
        }
        if let Some(status) = patch.status {
            draft.status = status;
        }
        validate_draft(&draft, Some(&self.reports[index]), catalog)?;

        let report = &mut self.reports[index];
        report.selection = draft.selection;
        report.start_date = draft.start_date;
        report.end_date = draft.end_date;
        report.content = draft.content;
        report.status = draft.status;
        report.updated_at = next_stamp(report.updated_at, Utc::now());
        Ok(report.clone())
    }

    /// Remove a report and return it.
    pub fn delete(&mut self, requester: &Identity, id: &RecordId) -> Result<Report, WeeklyError> {
        let index = self.authorized(requester, id)?;
        Ok(self.reports.remove(index))
    }

    /// Drop submitted reports created before `cutoff`. Admin only.
    pub fn purge_submitted_before(
        &mut self,
        actor: &Identity,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, WeeklyError> {
        actor.ensure_admin()?;
        let before = self.reports.len();
        self.reports
            .retain(|r| !(r.status == ReportStatus::Submitted && r.created_at < cutoff));
        Ok(before - self.reports.len())
    }

    // =========================================================================
    // READS
    // =========================================================================

    pub fn find_by_id(&self, requester: &Identity, id: &RecordId) -> Result<&Report, WeeklyError> {
        let index = self.authorized(requester, id)?;
        Ok(&self.reports[index])
    }

    /// Reports the requester owns (every report for an admin), most
    /// recently updated first.
    #[must_use]
    pub fn list_by_owner(&self, requester: &Identity) -> Vec<&Report> {
        let mut listed: Vec<&Report> = self.visible_to(requester).collect();
        sort_newest_first(&mut listed);
        listed
    }

    /// Every report the requester may read, in store order.
    pub fn visible_to<'a, 'r>(
        &'a self,
        requester: &'r Identity,
    ) -> impl Iterator<Item = &'a Report> + use<'a, 'r> {
        self.reports
            .iter()
            .filter(move |r| requester.can_access(&r.user_id))
    }

    /// The first `n` of `list_by_owner`.
    #[must_use]
    pub fn recent(&self, requester: &Identity, n: usize) -> Vec<&Report> {
        let mut listed = self.list_by_owner(requester);
        listed.truncate(n);
        listed
    }

    #[must_use]
    pub fn statistics(&self, requester: &Identity, now: DateTime<Utc>) -> ReportStatistics {
        let window_start = now - Duration::days(RETENTION_DAYS);
        let active: BTreeSet<&RecordId> = self
            .reports
            .iter()
            .filter(|r| r.created_at >= window_start)
            .map(|r| &r.user_id)
            .collect();
        ReportStatistics {
            total: self.reports.len(),
            active_users: active.len(),
            mine: self
                .reports
                .iter()
                .filter(|r| requester.owns(&r.user_id))
                .count(),
            drafts: self
                .reports
                .iter()
                .filter(|r| r.status == ReportStatus::Draft)
                .count(),
        }
    }
}

/// Most recently updated first; ties by id.
pub(crate) fn sort_newest_first(reports: &mut [&Report]) {
    reports.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
}

/// Field rules applied on every create and update.
///
/// Drafts may be partial. A submitted report needs a selection that forms a
/// valid catalog path, both dates and at least one content entry.
///
/// References already stored on `previous` may dangle after a forced catalog
/// delete: a module id the report already carries is accepted even when the
/// module is gone, and an unchanged selection of a submitted report is not
/// re-checked.
fn validate_draft(
    draft: &ReportDraft,
    previous: Option<&Report>,
    catalog: &ConfigGraph,
) -> Result<(), WeeklyError> {
    if let (Some(start), Some(end)) = (draft.start_date, draft.end_date)
        && end < start
    {
        return Err(WeeklyError::Validation(format!(
            "end date {end} precedes start date {start}"
        )));
    }

    let stored: HashSet<&RecordId> = previous
        .map(|r| r.content.iter().map(|e| &e.module_id).collect())
        .unwrap_or_default();
    let mut seen = HashSet::new();
    for entry in &draft.content {
        let name = catalog.label(Level::Module, Some(&entry.module_id));
        match catalog.find(Level::Module, &entry.module_id) {
            Some(module) => {
                if let Some(domain) = &draft.selection.domain_id
                    && !module.refs.references(Level::Domain, domain)
                {
                    return Err(WeeklyError::Validation(format!(
                        "business module '{name}' does not apply to the selected domain"
                    )));
                }
            }
            None if stored.contains(&entry.module_id) => {}
            None => {
                return Err(WeeklyError::Validation(format!(
                    "business module {} does not exist",
                    entry.module_id
                )));
            }
        }
        if !seen.insert(&entry.module_id) {
            return Err(WeeklyError::Validation(format!(
                "business module '{name}' appears twice"
            )));
        }
        if entry.work_content.chars().count() > MAX_WORK_CONTENT_LENGTH {
            return Err(WeeklyError::Validation(format!(
                "work content for '{name}' exceeds {MAX_WORK_CONTENT_LENGTH} characters"
            )));
        }
    }

    if draft.status == ReportStatus::Submitted {
        if !draft.selection.is_complete() {
            return Err(WeeklyError::Validation(
                "a submitted report needs a full domain/brand/model/baseline selection"
                    .to_string(),
            ));
        }
        let already_submitted = previous.is_some_and(|r| {
            r.status == ReportStatus::Submitted && r.selection == draft.selection
        });
        if !already_submitted && !catalog.validate_selection(&draft.selection) {
            return Err(WeeklyError::Validation(
                "the selection is not a valid configuration path".to_string(),
            ));
        }
        if draft.start_date.is_none() || draft.end_date.is_none() {
            return Err(WeeklyError::Validation(
                "a submitted report needs a start and end date".to_string(),
            ));
        }
        if draft.content.is_empty() {
            return Err(WeeklyError::Validation(
                "a submitted report needs at least one business module".to_string(),
            ));
        }
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
