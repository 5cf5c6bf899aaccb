//! In-memory implementation of [`TokenRepository`].

use chrono::Utc;
use custos_core::error::CustosResult;
use custos_core::models::token::{AuthToken, CreateAuthToken};
use custos_core::repository::TokenRepository;
use uuid::Uuid;

use crate::error::DbError;
use crate::store::Shared;

#[derive(Debug, Clone)]
pub struct MemTokenRepository {
    shared: Shared,
}

impl MemTokenRepository {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }
}

impl TokenRepository for MemTokenRepository {
    async fn create(&self, input: CreateAuthToken) -> CustosResult<AuthToken> {
        let mut state = self.shared.state.write();
        if !state.users.contains_key(&input.user_id) {
            return Err(DbError::not_found("user", input.user_id).into());
        }
        let token = AuthToken {
            id: input.id,
            user_id: input.user_id,
            account_id: input.account_id,
            device_id: input.device_id,
            token_hash: input.token_hash,
            issued_at: input.issued_at,
            expires_at: input.expires_at,
            revoked_at: None,
        };
        state.tokens.insert(token.id, token.clone());
        Ok(token)
    }

    async fn get_by_id(&self, id: Uuid) -> CustosResult<AuthToken> {
        let state = self.shared.state.read();
        state
            .tokens
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("token", id).into())
    }

    async fn revoke(&self, id: Uuid) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        let token = state
            .tokens
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("token", id))?;
        token.revoked_at.get_or_insert_with(Utc::now);
        Ok(())
    }

    async fn revoke_user_tokens(&self, user_id: Uuid) -> CustosResult<u64> {
        let mut state = self.shared.state.write();
        let now = Utc::now();
        let mut revoked = 0;
        for token in state
            .tokens
            .values_mut()
            .filter(|t| t.user_id == user_id && t.revoked_at.is_none())
        {
            token.revoked_at = Some(now);
            revoked += 1;
        }
        Ok(revoked)
    }
}
