//! Role domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::group::Group;
use crate::models::permission::Permission;
use crate::models::user::User;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Role {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub description: String,
    /// System roles (e.g. `Owner`) are seeded with the account and cannot
    /// be renamed or deleted.
    pub is_system_defined: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a user-defined role in the ambient account.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateRole {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub description: String,
}

/// Row to persist; carries the account and the system flag.
#[derive(Debug, Clone)]
pub struct NewRole {
    pub account_id: Uuid,
    pub name: String,
    pub description: String,
    pub is_system_defined: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Validate)]
pub struct UpdateRole {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDetails {
    pub role: Role,
    pub permissions: Option<Vec<Permission>>,
    pub users: Option<Vec<User>>,
    pub groups: Option<Vec<Group>>,
}
