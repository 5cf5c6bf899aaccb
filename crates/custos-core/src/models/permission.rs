//! Permission domain model.
//!
//! A permission grants a set of actions against a resource type, either
//! for every resource of that type (`resource_id == None`) or for one
//! specific resource.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::role::Role;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Account,
    User,
    Group,
    Role,
    Permission,
}

impl ResourceType {
    pub const ALL: [ResourceType; 5] = [
        ResourceType::Account,
        ResourceType::User,
        ResourceType::Group,
        ResourceType::Role,
        ResourceType::Permission,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Account => "account",
            ResourceType::User => "user",
            ResourceType::Group => "group",
            ResourceType::Role => "role",
            ResourceType::Permission => "permission",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
    Execute,
}

impl Action {
    fn bit(self) -> u8 {
        match self {
            Action::Create => 1,
            Action::Read => 1 << 1,
            Action::Update => 1 << 2,
            Action::Delete => 1 << 3,
            Action::Execute => 1 << 4,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Execute => "execute",
        };
        f.write_str(s)
    }
}

/// Set of [`Action`] flags.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct ActionSet(u8);

impl ActionSet {
    pub const NONE: ActionSet = ActionSet(0);
    pub const ALL: ActionSet = ActionSet(0b1_1111);

    pub fn of(actions: &[Action]) -> Self {
        Self(actions.iter().fold(0, |bits, a| bits | a.bit()))
    }

    pub fn with(self, action: Action) -> Self {
        Self(self.0 | action.bit())
    }

    pub fn contains(&self, action: Action) -> bool {
        self.0 & action.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Permission {
    pub id: Uuid,
    pub account_id: Uuid,
    pub name: String,
    pub description: String,
    pub resource_type: ResourceType,
    /// `None` applies to every resource of `resource_type`.
    pub resource_id: Option<Uuid>,
    pub actions: ActionSet,
    pub is_system_defined: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// Whether this permission grants `action` on the given resource.
    ///
    /// A request without a resource id (create, list) is only satisfied
    /// by type-wide permissions.
    pub fn grants(
        &self,
        action: Action,
        resource_type: ResourceType,
        resource_id: Option<Uuid>,
    ) -> bool {
        if self.resource_type != resource_type || !self.actions.contains(action) {
            return false;
        }
        match self.resource_id {
            None => true,
            Some(own) => resource_id == Some(own),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePermission {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(max = 1024))]
    pub description: String,
    pub resource_type: ResourceType,
    pub resource_id: Option<Uuid>,
    pub actions: ActionSet,
}

/// Row to persist; carries the account and the system flag.
#[derive(Debug, Clone)]
pub struct NewPermission {
    pub account_id: Uuid,
    pub name: String,
    pub description: String,
    pub resource_type: ResourceType,
    pub resource_id: Option<Uuid>,
    pub actions: ActionSet,
    pub is_system_defined: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, Validate)]
pub struct UpdatePermission {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    #[validate(length(max = 1024))]
    pub description: Option<String>,
    pub actions: Option<ActionSet>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionDetails {
    pub permission: Permission,
    pub roles: Option<Vec<Role>>,
}
