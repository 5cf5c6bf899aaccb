//! Error types for the Custos system.
//!
//! Every expected business outcome (not-found, conflict, ownership block,
//! unauthorized) is a variant of [`CustosError`]. Callers match on the
//! variant; the `Display` text is the human-readable message.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CustosError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity} named {name}")]
    AlreadyExists { entity: String, name: String },

    #[error("Unauthorized: {reason}")]
    Unauthorized { reason: String },

    // -- Registration steps ------------------------------------------------
    #[error("User creation failed: {reason}")]
    UserCreation { reason: String },

    #[error("Basic auth credential creation failed: {reason}")]
    BasicAuthCreation { reason: String },

    #[error("Account creation failed: {reason}")]
    AccountCreation { reason: String },

    #[error("System role assignment failed: {reason}")]
    SystemRoleAssignment { reason: String },

    // -- Ownership invariant -----------------------------------------------
    #[error("User is the sole owner of account {account_id}")]
    UserIsSoleAccountOwner { account_id: Uuid },

    /// `invalid_ids` lists the ids of the same batch that were rejected
    /// on their own, before the ownership check ran.
    #[error("Removal would leave the account without an owner: {blocked_ids:?}")]
    UserIsSoleOwner {
        blocked_ids: Vec<Uuid>,
        invalid_ids: Vec<Uuid>,
    },

    #[error("Owner role removal blocked: {blocked_ids:?}")]
    OwnerRoleRemovalBlocked {
        blocked_ids: Vec<Uuid>,
        invalid_ids: Vec<Uuid>,
    },

    #[error("Group {group_id} holds the only owners of its account")]
    GroupHasSoleOwners { group_id: Uuid },

    // -- System-defined protection -----------------------------------------
    #[error("Role {role_id} is system defined")]
    SystemDefinedRole { role_id: Uuid },

    #[error("Permission {permission_id} is system defined")]
    SystemDefinedPermission { permission_id: Uuid },

    #[error("System permissions cannot be removed from a system role: {blocked_ids:?}")]
    SystemPermissionRemoval {
        blocked_ids: Vec<Uuid>,
        invalid_ids: Vec<Uuid>,
    },

    // -- Bulk operations ---------------------------------------------------
    #[error("No valid {entity} ids supplied: {invalid_ids:?}")]
    NoValidIds {
        entity: String,
        invalid_ids: Vec<Uuid>,
    },

    // -- Authentication ----------------------------------------------------
    #[error("User {user_id} is locked after too many failed logins")]
    UserLocked { user_id: Uuid },

    #[error("User {user_id} is disabled")]
    UserDisabled { user_id: Uuid },

    #[error("Password does not match")]
    PasswordMismatch,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token: {reason}")]
    TokenInvalid { reason: String },

    // -- Infrastructure ----------------------------------------------------
    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CustosError {
    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: &str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity: entity.into(),
            name: name.into(),
        }
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::Unauthorized {
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type CustosResult<T> = Result<T, CustosError>;
