//! # Weekly
//!
//! The async half of Weekly: settings, the remote collection client, the
//! push/pull sync engine, autosave, and the CLI built on top of them.
//! All record logic lives in `weekly-core`.

pub mod autosave;
pub mod cli;
pub mod remote;
pub mod settings;
pub mod sync;

pub use autosave::{AutosaveHandle, EditingSession, ReportSink, RepositorySink};
pub use remote::{HttpRemote, RemoteError, RemoteStore};
pub use settings::Settings;
pub use sync::{PullSummary, PushSummary, SyncEngine};
