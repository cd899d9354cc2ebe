//! # Fixed Constants
//!
//! Hardcoded limits and defaults for the Weekly core.
//! These are compiled into the binary and immutable at runtime.

/// Reports shown per query page.
pub const PAGE_SIZE: usize = 10;

/// Maximum number of page links in a pagination window.
pub const PAGE_WINDOW: usize = 5;

/// Number of reports returned by `ReportStore::recent`.
pub const RECENT_REPORTS: usize = 5;

/// Window (in days) used for "active users" and the submitted-report cleanup.
pub const RETENTION_DAYS: i64 = 30;

/// Default interval between autosave ticks, in seconds.
pub const AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Minimum accepted password length for new accounts.
pub const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// DEFAULT ADMINISTRATOR
// =============================================================================

/// Id of the administrator seeded into an empty user directory.
pub const DEFAULT_ADMIN_ID: &str = "user-1";

/// Username of the seeded administrator.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Password of the seeded administrator. Change it after first login.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Display name of the seeded administrator.
pub const DEFAULT_ADMIN_NAME: &str = "Administrator";

// =============================================================================
// DISPLAY FALLBACKS
// =============================================================================

/// Label shown for a dangling catalog reference.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Label shown for a report owner that no longer exists.
pub const UNKNOWN_USER: &str = "unknown user";

/// Label shown for a content entry whose module no longer exists.
pub const UNKNOWN_MODULE: &str = "unknown module";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum length for names (users, catalog nodes).
pub const MAX_NAME_LENGTH: usize = 200;

/// Maximum length of one work-content entry.
pub const MAX_WORK_CONTENT_LENGTH: usize = 20_000;
