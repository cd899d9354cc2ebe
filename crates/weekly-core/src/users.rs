//! # User Directory
//!
//! Account records and their administration. Only administrators create,
//! edit or delete accounts; nobody can delete the account they are signed
//! in with. A directory without an account named `admin` is seeded with the
//! default administrator.

use crate::primitives::{
    DEFAULT_ADMIN_ID, DEFAULT_ADMIN_NAME, DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME,
    MAX_NAME_LENGTH, MIN_PASSWORD_LEN, UNKNOWN_USER,
};
use crate::types::next_stamp;
use crate::{Identity, RecordId, Role, User, WeeklyError};
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Input for a new account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// Partial account update. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from decoded records.
    ///
    /// Rejects blank ids and duplicate ids or usernames.
    pub fn from_records(records: Vec<User>) -> Result<Self, WeeklyError> {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        for user in &records {
            if user.id.is_blank() || user.username.trim().is_empty() {
                return Err(WeeklyError::Validation(
                    "user record without id or username".to_string(),
                ));
            }
            if !ids.insert(&user.id) {
                return Err(WeeklyError::Validation(format!(
                    "duplicate user id {}",
                    user.id
                )));
            }
            if !names.insert(user.username.as_str()) {
                return Err(WeeklyError::Validation(format!(
                    "duplicate username '{}'",
                    user.username
                )));
            }
        }
        Ok(Self { users: records })
    }

    /// Seed the default administrator when no account is named `admin`.
    ///
    /// The seeded account takes `DEFAULT_ADMIN_ID` unless another account
    /// already holds it. Returns `true` if an account was added.
    pub fn ensure_default_admin(&mut self, now: DateTime<Utc>) -> bool {
        if self.find_by_username(DEFAULT_ADMIN_USERNAME).is_some() {
            return false;
        }
        let default_id = RecordId::new(DEFAULT_ADMIN_ID);
        let id = if self.find(&default_id).is_some() {
            RecordId::generate()
        } else {
            default_id
        };
        self.users.push(User {
            id,
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
            name: DEFAULT_ADMIN_NAME.to_string(),
            role: Role::Admin,
            email: String::new(),
            created_at: now,
            updated_at: now,
            last_login: None,
        });
        true
    }

    #[must_use]
    pub fn records(&self) -> &[User] {
        &self.users
    }

    #[must_use]
    pub fn into_records(self) -> Vec<User> {
        self.users
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    #[must_use]
    pub fn find(&self, id: &RecordId) -> Option<&User> {
        self.users.iter().find(|u| &u.id == id)
    }

    #[must_use]
    pub fn find_by_username(&self, username: &str) -> Option<&User> {
        self.users.iter().find(|u| u.username == username)
    }

    /// `"username (name)"`, or `UNKNOWN_USER` for a dangling id.
    #[must_use]
    pub fn display_name(&self, id: &RecordId) -> String {
        self.find(id).map_or_else(
            || UNKNOWN_USER.to_string(),
            |u| format!("{} ({})", u.username, u.name),
        )
    }

    /// Set `lastLogin`. Does not touch `updatedAt`.
    pub(crate) fn record_login(&mut self, id: &RecordId, now: DateTime<Utc>) {
        if let Some(user) = self.users.iter_mut().find(|u| &u.id == id) {
            user.last_login = Some(now);
        }
    }

    fn check_username(&self, username: &str, except: Option<&RecordId>) -> Result<(), WeeklyError> {
        if username.is_empty() {
            return Err(WeeklyError::Validation("username is required".to_string()));
        }
        if username.chars().count() > MAX_NAME_LENGTH {
            return Err(WeeklyError::Validation(format!(
                "username exceeds {MAX_NAME_LENGTH} characters"
            )));
        }
        let taken = self
            .users
            .iter()
            .any(|u| u.username == username && Some(&u.id) != except);
        if taken {
            return Err(WeeklyError::Validation(format!(
                "username '{username}' is already taken"
            )));
        }
        Ok(())
    }

    // =========================================================================
    // ADMINISTRATION
    // =========================================================================

    pub fn create(&mut self, actor: &Identity, input: NewUser) -> Result<User, WeeklyError> {
        actor.ensure_admin()?;
        let username = input.username.trim().to_string();
        let name = input.name.trim().to_string();
        self.check_username(&username, None)?;
        if name.is_empty() {
            return Err(WeeklyError::Validation("name is required".to_string()));
        }
        check_password(&input.password)?;

        let now = Utc::now();
        let user = User {
            id: RecordId::generate(),
            username,
            password: input.password,
            name,
            role: input.role,
            email: input.email.trim().to_string(),
            created_at: now,
            updated_at: now,
            last_login: None,
        };
        self.users.push(user.clone());
        Ok(user)
    }

    pub fn update(
        &mut self,
        actor: &Identity,
        id: &RecordId,
        patch: UserPatch,
    ) -> Result<User, WeeklyError> {
        actor.ensure_admin()?;
        if self.find(id).is_none() {
            return Err(WeeklyError::not_found("user", id));
        }
        let username = patch.username.map(|u| u.trim().to_string());
        if let Some(username) = &username {
            self.check_username(username, Some(id))?;
        }
        let name = patch.name.map(|n| n.trim().to_string());
        if name.as_deref().is_some_and(str::is_empty) {
            return Err(WeeklyError::Validation("name is required".to_string()));
        }
        if let Some(password) = &patch.password {
            check_password(password)?;
        }

        let Some(user) = self.users.iter_mut().find(|u| &u.id == id) else {
            return Err(WeeklyError::not_found("user", id));
        };
        if let Some(username) = username {
            user.username = username;
        }
        if let Some(name) = name {
            user.name = name;
        }
        if let Some(password) = patch.password {
            user.password = password;
        }
        if let Some(email) = patch.email {
            user.email = email.trim().to_string();
        }
        if let Some(role) = patch.role {
            user.role = role;
        }
        user.updated_at = next_stamp(user.updated_at, Utc::now());
        Ok(user.clone())
    }

    pub fn delete(&mut self, actor: &Identity, id: &RecordId) -> Result<User, WeeklyError> {
        actor.ensure_admin()?;
        if actor.owns(id) {
            return Err(WeeklyError::Permission(
                "cannot delete the signed-in account".to_string(),
            ));
        }
        let index = self
            .users
            .iter()
            .position(|u| &u.id == id)
            .ok_or_else(|| WeeklyError::not_found("user", id))?;
        Ok(self.users.remove(index))
    }
}

fn check_password(password: &str) -> Result<(), WeeklyError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(WeeklyError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}
