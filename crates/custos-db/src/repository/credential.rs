//! In-memory implementation of [`CredentialRepository`].

use chrono::Utc;
use custos_core::error::CustosResult;
use custos_core::models::credential::BasicAuthCredential;
use custos_core::repository::CredentialRepository;
use uuid::Uuid;

use crate::error::DbError;
use crate::store::Shared;

#[derive(Debug, Clone)]
pub struct MemCredentialRepository {
    shared: Shared,
}

impl MemCredentialRepository {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }
}

impl CredentialRepository for MemCredentialRepository {
    async fn create(&self, user_id: Uuid, password_hash: String) -> CustosResult<BasicAuthCredential> {
        let mut state = self.shared.state.write();
        if !state.users.contains_key(&user_id) {
            return Err(DbError::not_found("user", user_id).into());
        }
        if state.credentials.contains_key(&user_id) {
            return Err(DbError::Integrity(format!("user {user_id} already has a credential")).into());
        }

        let credential = BasicAuthCredential {
            user_id,
            password_hash,
            created_at: Utc::now(),
        };
        state.credentials.insert(user_id, credential.clone());
        Ok(credential)
    }

    async fn get_by_user(&self, user_id: Uuid) -> CustosResult<BasicAuthCredential> {
        let state = self.shared.state.read();
        state
            .credentials
            .get(&user_id)
            .cloned()
            .ok_or_else(|| DbError::not_found("credential", user_id).into())
    }
}
