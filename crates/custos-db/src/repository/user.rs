//! In-memory implementation of [`UserRepository`].

use chrono::Utc;
use custos_core::error::CustosResult;
use custos_core::models::user::{NewUser, UpdateUser, User};
use custos_core::repository::UserRepository;
use uuid::Uuid;

use crate::error::DbError;
use crate::store::{Shared, State};

#[derive(Debug, Clone)]
pub struct MemUserRepository {
    shared: Shared,
}

impl MemUserRepository {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }
}

/// Usernames and emails are unique, case-insensitively.
fn ensure_unique(
    state: &State,
    except: Option<Uuid>,
    username: Option<&str>,
    email: Option<&str>,
) -> Result<(), DbError> {
    for user in state.users.values().filter(|u| Some(u.id) != except) {
        if let Some(name) = username.filter(|n| user.username.eq_ignore_ascii_case(n)) {
            return Err(DbError::duplicate("user", name));
        }
        if let Some(email) = email.filter(|e| user.email.eq_ignore_ascii_case(e)) {
            return Err(DbError::duplicate("user", email));
        }
    }
    Ok(())
}

impl UserRepository for MemUserRepository {
    async fn create(&self, input: NewUser) -> CustosResult<User> {
        let mut state = self.shared.state.write();
        ensure_unique(&state, None, Some(&input.username), Some(&input.email))?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            public_id: Uuid::new_v4(),
            username: input.username,
            email: input.email,
            is_enabled: true,
            successful_logins: 0,
            failed_logins: 0,
            failed_logins_since_last_success: 0,
            last_login_at: None,
            last_failed_login_at: None,
            created_at: now,
            updated_at: now,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_by_id(&self, id: Uuid) -> CustosResult<User> {
        let state = self.shared.state.read();
        state
            .users
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("user", id).into())
    }

    async fn get_by_username(&self, username: &str) -> CustosResult<User> {
        let state = self.shared.state.read();
        state
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned()
            .ok_or_else(|| DbError::not_found("user", username).into())
    }

    async fn update(&self, id: Uuid, input: UpdateUser) -> CustosResult<User> {
        let mut state = self.shared.state.write();
        ensure_unique(
            &state,
            Some(id),
            input.username.as_deref(),
            input.email.as_deref(),
        )?;

        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("user", id))?;
        if let Some(username) = input.username {
            user.username = username;
        }
        if let Some(email) = input.email {
            user.email = email;
        }
        if let Some(enabled) = input.is_enabled {
            user.is_enabled = enabled;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn record_login_success(&self, id: Uuid) -> CustosResult<User> {
        let mut state = self.shared.state.write();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("user", id))?;
        let now = Utc::now();
        user.successful_logins += 1;
        user.failed_logins_since_last_success = 0;
        user.last_login_at = Some(now);
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn record_login_failure(&self, id: Uuid) -> CustosResult<User> {
        let mut state = self.shared.state.write();
        let user = state
            .users
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("user", id))?;
        let now = Utc::now();
        user.failed_logins += 1;
        user.failed_logins_since_last_success += 1;
        user.last_failed_login_at = Some(now);
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        if state.users.remove(&id).is_none() {
            return Err(DbError::not_found("user", id).into());
        }
        state.credentials.remove(&id);
        state.tokens.retain(|_, t| t.user_id != id);
        state.belongs_to.retain(|(_, u)| *u != id);
        state.member_of.retain(|(_, u)| *u != id);
        state.user_roles.retain(|(u, _)| *u != id);
        Ok(())
    }
}
