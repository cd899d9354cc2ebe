//! # Core Type Definitions
//!
//! This module contains the record types shared by every Weekly component:
//! - Identifiers (`RecordId`) and roles (`Role`, `Identity`)
//! - Catalog levels (`Level`) and dependency counts (`Dependents`)
//! - Report records (`Report`, `Selection`, `ContentEntry`, `ReportDraft`)
//! - User records (`User`)
//! - Error types (`WeeklyError`)
//!
//! ## Wire Shape
//!
//! Every record serializes to camelCase JSON so that local snapshots and the
//! remote CRUD service share one format. Unset selection fields and dates are
//! written as empty strings and read back as `None`.

pub(crate) mod blank;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Identifier of any stored record (user, report, catalog node).
///
/// Identifiers are opaque strings. Records created locally get a random
/// UUIDv4; records loaded from storage keep whatever id they carried.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create an identifier from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// An empty identifier never names a record.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().to_string()))
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// =============================================================================
// ROLES & IDENTITY
// =============================================================================

/// Role of a user account.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full read/write over every record, configuration authority.
    Admin,
    /// Reads and writes only the reports it owns.
    #[default]
    User,
}

impl Role {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Role {
    type Err = WeeklyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "user" => Ok(Self::User),
            other => Err(WeeklyError::Validation(format!("unknown role '{other}'"))),
        }
    }
}

/// The resolved identity of a signed-in user.
///
/// This is what AuthGate hands to every other component. It is a snapshot
/// taken at login time and persisted as the `session` snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: RecordId,
    pub username: String,
    pub name: String,
    pub role: Role,
}

impl Identity {
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// True when this identity created the record owned by `owner`.
    #[must_use]
    pub fn owns(&self, owner: &RecordId) -> bool {
        &self.user_id == owner
    }

    /// Owner or admin.
    #[must_use]
    pub fn can_access(&self, owner: &RecordId) -> bool {
        self.is_admin() || self.owns(owner)
    }

    /// Fail with `Permission` unless this identity is an admin.
    pub fn ensure_admin(&self) -> Result<(), WeeklyError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(WeeklyError::Permission(format!(
                "user '{}' is not an administrator",
                self.username
            )))
        }
    }
}

impl From<&User> for Identity {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            username: user.username.clone(),
            name: user.name.clone(),
            role: user.role,
        }
    }
}

// =============================================================================
// USER
// =============================================================================

/// A user account record.
///
/// `password` is opaque: it is stored and compared exactly as provided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "UserRecord")]
pub struct User {
    pub id: RecordId,
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Decoded form of `User`. Accounts written without `updatedAt` take
/// `createdAt`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserRecord {
    id: RecordId,
    username: String,
    #[serde(default)]
    password: String,
    name: String,
    #[serde(default)]
    role: Role,
    #[serde(default)]
    email: String,
    created_at: DateTime<Utc>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    last_login: Option<DateTime<Utc>>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username,
            password: record.password,
            name: record.name,
            role: record.role,
            email: record.email,
            created_at: record.created_at,
            updated_at: record.updated_at.unwrap_or(record.created_at),
            last_login: record.last_login,
        }
    }
}

// =============================================================================
// CATALOG LEVELS
// =============================================================================

/// A level of the configuration hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Domain,
    Brand,
    Model,
    Baseline,
    /// A business module: a unit of work content applicable to domains.
    Module,
}

impl Level {
    /// Every level, top of the hierarchy first.
    pub const ALL: [Self; 5] = [
        Self::Domain,
        Self::Brand,
        Self::Model,
        Self::Baseline,
        Self::Module,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Brand => "brand",
            Self::Model => "model",
            Self::Baseline => "baseline",
            Self::Module => "module",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for Level {
    type Err = WeeklyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "domain" | "domains" => Ok(Self::Domain),
            "brand" | "brands" => Ok(Self::Brand),
            "model" | "models" => Ok(Self::Model),
            "baseline" | "baselines" => Ok(Self::Baseline),
            "module" | "modules" | "businessmodules" => Ok(Self::Module),
            other => Err(WeeklyError::Validation(format!(
                "unknown configuration level '{other}'"
            ))),
        }
    }
}

/// Per-level count of nodes that still reference a catalog node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependents(pub BTreeMap<Level, usize>);

impl Dependents {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.values().all(|&n| n == 0)
    }

    /// Number of dependents at the given level.
    #[must_use]
    pub fn count(&self, level: Level) -> usize {
        self.0.get(&level).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub(crate) fn add(&mut self, level: Level) {
        *self.0.entry(level).or_insert(0) += 1;
    }
}

impl fmt::Display for Dependents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .filter(|&(_, &n)| n > 0)
            .map(|(level, n)| format!("{n} {level}(s)"))
            .collect();
        f.write_str(&parts.join(", "))
    }
}

// =============================================================================
// REPORT
// =============================================================================

/// Lifecycle state of a report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    #[default]
    Draft,
    /// Reachable from draft; the owner or an admin may still edit it.
    Submitted,
}

impl ReportStatus {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Submitted => "submitted",
        }
    }
}

impl fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for ReportStatus {
    type Err = WeeklyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "submitted" => Ok(Self::Submitted),
            other => Err(WeeklyError::Validation(format!(
                "unknown report status '{other}'"
            ))),
        }
    }
}

/// The domain → brand → model → baseline context a report is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(default, with = "blank")]
    pub domain_id: Option<RecordId>,
    #[serde(default, with = "blank")]
    pub brand_id: Option<RecordId>,
    #[serde(default, with = "blank")]
    pub model_id: Option<RecordId>,
    #[serde(default, with = "blank")]
    pub baseline_id: Option<RecordId>,
}

impl Selection {
    /// A fully specified selection.
    #[must_use]
    pub fn new(
        domain: impl Into<RecordId>,
        brand: impl Into<RecordId>,
        model: impl Into<RecordId>,
        baseline: impl Into<RecordId>,
    ) -> Self {
        Self {
            domain_id: Some(domain.into()),
            brand_id: Some(brand.into()),
            model_id: Some(model.into()),
            baseline_id: Some(baseline.into()),
        }
    }

    /// All four levels chosen.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.domain_id.is_some()
            && self.brand_id.is_some()
            && self.model_id.is_some()
            && self.baseline_id.is_some()
    }
}

/// Work content recorded against one business module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentEntry {
    pub module_id: RecordId,
    #[serde(default)]
    pub work_content: String,
}

impl ContentEntry {
    #[must_use]
    pub fn new(module_id: impl Into<RecordId>, work_content: impl Into<String>) -> Self {
        Self {
            module_id: module_id.into(),
            work_content: work_content.into(),
        }
    }
}

/// A weekly report record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: RecordId,
    /// Owner. Set on creation, never changed afterwards.
    pub user_id: RecordId,
    #[serde(flatten)]
    pub selection: Selection,
    #[serde(default, with = "blank")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "blank")]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub content: Vec<ContentEntry>,
    #[serde(default)]
    pub status: ReportStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The editable part of a report: what a form or the CLI fills in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportDraft {
    pub selection: Selection,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub content: Vec<ContentEntry>,
    pub status: ReportStatus,
}

impl ReportDraft {
    /// A draft covering a single day.
    #[must_use]
    pub fn for_day(date: NaiveDate) -> Self {
        Self {
            start_date: Some(date),
            end_date: Some(date),
            ..Self::default()
        }
    }

    /// Mandatory fields for a draft to be worth persisting unattended.
    #[must_use]
    pub fn is_autosave_ready(&self) -> bool {
        self.selection.is_complete() && self.start_date.is_some() && !self.content.is_empty()
    }
}

impl From<&Report> for ReportDraft {
    fn from(report: &Report) -> Self {
        Self {
            selection: report.selection.clone(),
            start_date: report.start_date,
            end_date: report.end_date,
            content: report.content.clone(),
            status: report.status,
        }
    }
}

/// A partial update of a report. `None` leaves the field unchanged;
/// `Some(None)` clears a date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportPatch {
    pub selection: Option<Selection>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub content: Option<Vec<ContentEntry>>,
    pub status: Option<ReportStatus>,
}

impl From<ReportDraft> for ReportPatch {
    fn from(draft: ReportDraft) -> Self {
        Self {
            selection: Some(draft.selection),
            start_date: Some(draft.start_date),
            end_date: Some(draft.end_date),
            content: Some(draft.content),
            status: Some(draft.status),
        }
    }
}

/// Stamp for a mutation: the current time, never earlier than `previous`.
///
/// Keeps `updatedAt` non-decreasing even if the wall clock steps backwards.
#[must_use]
pub fn next_stamp(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    now.max(previous)
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Weekly system.
///
/// - No silent failures: fallible operations return `Result<T, WeeklyError>`
/// - Local validation errors never reach storage
/// - Storage and network errors propagate to the initiating caller
#[derive(Debug, Error)]
pub enum WeeklyError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Ownership or role mismatch. No state was changed.
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Delete blocked by referential integrity.
    #[error("Cannot delete {level} {id}: still referenced by {dependents}")]
    Dependency {
        level: Level,
        id: RecordId,
        dependents: Dependents,
    },

    /// Remote I/O or write failure. Uploads committed before the failure stay committed.
    #[error("Sync failed on {collection}: {message} ({committed} record(s) already uploaded)")]
    Sync {
        collection: &'static str,
        record: Option<RecordId>,
        committed: usize,
        message: String,
    },

    /// A required field is missing or a stored record is malformed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Bad credentials or no active session.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Local persistent storage failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl WeeklyError {
    pub(crate) fn not_found(entity: &'static str, id: &RecordId) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn sample_report() -> Report {
        let now = Utc::now();
        Report {
            id: RecordId::new("r-1"),
            user_id: RecordId::new("user-1"),
            selection: Selection {
                domain_id: Some(RecordId::new("d-1")),
                ..Selection::default()
            },
            start_date: NaiveDate::from_ymd_opt(2024, 3, 4),
            end_date: None,
            content: vec![ContentEntry::new("m-1", "wrote tests")],
            status: ReportStatus::Draft,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(RecordId::generate(), RecordId::generate());
    }

    #[test]
    fn blank_fields_serialize_as_empty_strings() {
        let json = serde_json::to_value(sample_report()).expect("serialize");
        assert_eq!(json["domainId"], "d-1");
        assert_eq!(json["brandId"], "");
        assert_eq!(json["startDate"], "2024-03-04");
        assert_eq!(json["endDate"], "");
        assert_eq!(json["content"][0]["workContent"], "wrote tests");
    }

    #[test]
    fn report_json_roundtrip_preserves_unset_fields() {
        let report = sample_report();
        let text = serde_json::to_string(&report).expect("serialize");
        let back: Report = serde_json::from_str(&text).expect("deserialize");
        assert_eq!(back, report);
        assert!(back.selection.brand_id.is_none());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let bad = serde_json::json!({ "id": "r-1", "status": "draft" });
        assert!(serde_json::from_value::<Report>(bad).is_err());
    }

    #[test]
    fn user_without_updated_at_takes_created_at() {
        let seeded = serde_json::json!({
            "id": "user-1",
            "username": "admin",
            "password": "admin123",
            "name": "Administrator",
            "role": "admin",
            "createdAt": "2024-01-02T03:04:05.000Z"
        });
        let user: User = serde_json::from_value(seeded).expect("decode");
        assert_eq!(user.updated_at, user.created_at);
        assert_eq!(user.email, "");
        assert!(user.last_login.is_none());

        let json = serde_json::to_value(&user).expect("serialize");
        assert_eq!(json["updatedAt"], json["createdAt"]);
        assert!(serde_json::from_value::<User>(serde_json::json!({ "id": "u" })).is_err());
    }

    #[test]
    fn selection_completeness() {
        assert!(!Selection::default().is_complete());
        assert!(Selection::new("d", "b", "m", "bl").is_complete());
    }

    #[test]
    fn autosave_readiness_requires_selection_date_and_content() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 8).expect("date");
        let mut draft = ReportDraft::for_day(date);
        assert!(!draft.is_autosave_ready());

        draft.selection = Selection::new("d", "b", "m", "bl");
        assert!(!draft.is_autosave_ready());

        draft.content.push(ContentEntry::new("m-1", ""));
        assert!(draft.is_autosave_ready());
    }

    #[test]
    fn identity_access_rules() {
        let user = Identity {
            user_id: RecordId::new("u-1"),
            username: "amy".to_string(),
            name: "Amy".to_string(),
            role: Role::User,
        };
        assert!(user.can_access(&RecordId::new("u-1")));
        assert!(!user.can_access(&RecordId::new("u-2")));
        assert!(matches!(
            user.ensure_admin(),
            Err(WeeklyError::Permission(_))
        ));

        let admin = Identity {
            role: Role::Admin,
            ..user
        };
        assert!(admin.can_access(&RecordId::new("u-2")));
        assert!(admin.ensure_admin().is_ok());
    }

    #[test]
    fn dependents_display_and_counts() {
        let mut deps = Dependents::default();
        deps.add(Level::Brand);
        deps.add(Level::Module);
        deps.add(Level::Module);
        assert_eq!(deps.count(Level::Brand), 1);
        assert_eq!(deps.count(Level::Module), 2);
        assert_eq!(deps.total(), 3);
        assert_eq!(deps.to_string(), "1 brand(s), 2 module(s)");
    }

    #[test]
    fn stamps_never_go_backwards() {
        let later = Utc::now();
        let earlier = later - chrono::Duration::seconds(5);
        assert_eq!(next_stamp(later, earlier), later);
        assert_eq!(next_stamp(earlier, later), later);
    }

    #[test]
    fn level_parsing_accepts_collection_names() {
        assert_eq!("brands".parse::<Level>().expect("parse"), Level::Brand);
        assert_eq!(
            "businessModules".parse::<Level>().expect("parse"),
            Level::Module
        );
        assert!("planet".parse::<Level>().is_err());
    }
}
