//! # weekly-core
//!
//! The record engine for Weekly - THE LOGIC.
//!
//! This crate holds everything about weekly reports that does not need a
//! network or a terminal: the record types, the configuration catalog,
//! ownership rules, querying and export, local snapshot persistence and the
//! last-write-wins upload planner.
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies (pure Rust)
//! - All state is owned by one `Repository`; nothing is global
//! - Every record crossing the storage boundary is validated
//! - Permission checks happen before any state change

// =============================================================================
// MODULES
// =============================================================================

pub mod auth;
pub mod config_graph;
pub mod editor;
pub mod export;
pub mod primitives;
pub mod query;
pub mod report_store;
pub mod repository;
pub mod storage;
pub mod sync;
pub mod types;
pub mod users;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{
    ContentEntry, Dependents, Identity, Level, RecordId, Report, ReportDraft, ReportPatch,
    ReportStatus, Role, Selection, User, WeeklyError,
};

// =============================================================================
// RE-EXPORTS: Components
// =============================================================================

pub use auth::AuthGate;
pub use config_graph::{ConfigGraph, ConfigNode, DeleteMode, NodeData, NodePatch, NodeRefs};
pub use editor::{ReportEditor, SaveGate, SaveOutcome, SaveTrigger, SkipReason};
pub use export::{Labels, escape_csv_field, to_csv, to_text};
pub use query::{Paginator, QueryEngine, ReportFilter};
pub use report_store::{ReportStatistics, ReportStore};
pub use repository::Repository;
pub use storage::{Collection, MemoryStore, RedbStore, SnapshotStore, StorageBackend};
pub use sync::{Record, config_needs_upload, decode_config, decode_records, plan_upload};
pub use users::{NewUser, UserDirectory, UserPatch};
