//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::account::Account;
use crate::models::group::Group;
use crate::models::role::Role;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub public_id: Uuid,
    pub username: String,
    pub email: String,
    /// Disabled users cannot sign in.
    pub is_enabled: bool,
    pub successful_logins: u64,
    pub failed_logins: u64,
    /// Reset to zero on every successful login; drives lockout.
    pub failed_logins_since_last_success: u32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub last_failed_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity fields of a user about to be persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
}

/// Sign-up request: identity plus the initial basic-auth password.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterUser {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    /// Raw password (hashed with Argon2id before storage).
    #[validate(length(min = 8, max = 1024))]
    #[serde(skip_serializing)]
    pub password: String,
}

impl RegisterUser {
    pub fn identity(&self) -> NewUser {
        NewUser {
            username: self.username.clone(),
            email: self.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Validate)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 255))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub is_enabled: Option<bool>,
}

/// A user with the groups and roles it holds in the ambient account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetails {
    pub user: User,
    pub accounts: Option<Vec<Account>>,
    pub groups: Option<Vec<Group>>,
    pub roles: Option<Vec<Role>>,
}
