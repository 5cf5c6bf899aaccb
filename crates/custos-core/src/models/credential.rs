//! Basic-auth credential model.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Username/password credential of a user. Never serialized.
#[derive(Debug, Clone)]
pub struct BasicAuthCredential {
    pub user_id: Uuid,
    /// Argon2id PHC-format hash.
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
