//! # AuthGate
//!
//! Resolves credentials to an `Identity` and keeps the active session.
//!
//! The gate holds at most one identity. It is restored from the `session`
//! snapshot on startup and written back by the repository on flush. A
//! restored identity is only trusted after `revalidate` has matched it
//! against the user directory.

use crate::users::UserDirectory;
use crate::{Identity, RecordId, WeeklyError};
use chrono::{DateTime, Utc};
use subtle::ConstantTimeEq;

/// Compare a stored password with a provided one in constant time.
///
/// Both inputs are padded to the same length so the comparison runs over the
/// same number of bytes whatever their lengths.
#[must_use]
pub fn passwords_match(stored: &str, provided: &str) -> bool {
    let stored = stored.as_bytes();
    let provided = provided.as_bytes();

    let max_len = stored.len().max(provided.len());
    let mut padded_stored = vec![0u8; max_len];
    let mut padded_provided = vec![0u8; max_len];
    padded_stored[..stored.len()].copy_from_slice(stored);
    padded_provided[..provided.len()].copy_from_slice(provided);

    let bytes_match: bool = padded_stored.ct_eq(&padded_provided).into();
    bytes_match && stored.len() == provided.len()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthGate {
    session: Option<Identity>,
}

impl AuthGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a persisted session.
    #[must_use]
    pub fn with_session(session: Option<Identity>) -> Self {
        Self { session }
    }

    /// Check credentials, record the login time and open a session.
    ///
    /// Unknown usernames and wrong passwords fail the same way.
    pub fn login(
        &mut self,
        users: &mut UserDirectory,
        username: &str,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Identity, WeeklyError> {
        let user = users
            .find_by_username(username.trim())
            .filter(|u| passwords_match(&u.password, password))
            .ok_or_else(|| {
                WeeklyError::Authentication("invalid username or password".to_string())
            })?;
        let identity = Identity::from(user);
        users.record_login(&identity.user_id, now);
        self.session = Some(identity.clone());
        Ok(identity)
    }

    /// Re-resolve the session against the directory.
    ///
    /// A session whose account is gone is closed; otherwise role and names
    /// are taken from the stored record, so a demotion takes effect at once.
    pub fn revalidate(&mut self, users: &UserDirectory) {
        self.session = self
            .session
            .take()
            .and_then(|s| users.find(&s.user_id).map(Identity::from));
    }

    /// Close the session, returning the identity that was signed in.
    pub fn logout(&mut self) -> Option<Identity> {
        self.session.take()
    }

    #[must_use]
    pub fn current(&self) -> Option<&Identity> {
        self.session.as_ref()
    }

    /// The signed-in identity, or `Authentication` when nobody is.
    pub fn require_login(&self) -> Result<&Identity, WeeklyError> {
        self.session
            .as_ref()
            .ok_or_else(|| WeeklyError::Authentication("not signed in".to_string()))
    }

    /// The signed-in identity if it is an admin.
    pub fn require_admin(&self) -> Result<&Identity, WeeklyError> {
        let identity = self.require_login()?;
        identity.ensure_admin()?;
        Ok(identity)
    }

    /// Whether the signed-in identity may touch records owned by `owner`.
    #[must_use]
    pub fn can_access(&self, owner: &RecordId) -> bool {
        self.session.as_ref().is_some_and(|s| s.can_access(owner))
    }
}
