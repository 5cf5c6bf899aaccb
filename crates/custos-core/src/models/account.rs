//! Account domain model.
//!
//! Accounts are the tenant boundary: groups, roles and permissions all
//! belong to exactly one account, and users join accounts through
//! membership edges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::group::Group;
use crate::models::permission::Permission;
use crate::models::role::Role;
use crate::models::user::User;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    /// Identifier safe to hand out to clients.
    pub public_id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAccount {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

/// Fields that can be updated on an existing account.
#[derive(Debug, Clone, Serialize, Deserialize, Default, Validate)]
pub struct UpdateAccount {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
}

/// An account with its related collections, populated only when hydrated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDetails {
    pub account: Account,
    pub users: Option<Vec<User>>,
    pub groups: Option<Vec<Group>>,
    pub roles: Option<Vec<Role>>,
    pub permissions: Option<Vec<Permission>>,
}
