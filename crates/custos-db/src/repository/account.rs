//! In-memory implementation of [`AccountRepository`].

use chrono::Utc;
use custos_core::error::CustosResult;
use custos_core::models::account::{Account, CreateAccount, UpdateAccount};
use custos_core::models::user::User;
use custos_core::repository::{AccountRepository, ListQuery, PaginatedResult};
use uuid::Uuid;

use super::{paginate, sorted};
use crate::error::DbError;
use crate::store::Shared;

#[derive(Debug, Clone)]
pub struct MemAccountRepository {
    shared: Shared,
}

impl MemAccountRepository {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }
}

impl AccountRepository for MemAccountRepository {
    async fn create(&self, input: CreateAccount) -> CustosResult<Account> {
        let now = Utc::now();
        let account = Account {
            id: Uuid::new_v4(),
            public_id: Uuid::new_v4(),
            name: input.name,
            created_at: now,
            updated_at: now,
        };
        self.shared
            .state
            .write()
            .accounts
            .insert(account.id, account.clone());
        Ok(account)
    }

    async fn get_by_id(&self, id: Uuid) -> CustosResult<Account> {
        let state = self.shared.state.read();
        state
            .accounts
            .get(&id)
            .cloned()
            .ok_or_else(|| DbError::not_found("account", id).into())
    }

    async fn update(&self, id: Uuid, input: UpdateAccount) -> CustosResult<Account> {
        let mut state = self.shared.state.write();
        let account = state
            .accounts
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("account", id))?;
        if let Some(name) = input.name {
            account.name = name;
        }
        account.updated_at = Utc::now();
        Ok(account.clone())
    }

    async fn delete(&self, id: Uuid) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        if state.accounts.remove(&id).is_none() {
            return Err(DbError::not_found("account", id).into());
        }

        let groups: Vec<Uuid> = state
            .groups
            .values()
            .filter(|g| g.account_id == id)
            .map(|g| g.id)
            .collect();
        for group_id in groups {
            state.groups.remove(&group_id);
            state.detach_group(group_id);
        }

        let roles: Vec<Uuid> = state
            .roles
            .values()
            .filter(|r| r.account_id == id)
            .map(|r| r.id)
            .collect();
        for role_id in roles {
            state.roles.remove(&role_id);
            state.detach_role(role_id);
        }

        let permissions: Vec<Uuid> = state
            .permissions
            .values()
            .filter(|p| p.account_id == id)
            .map(|p| p.id)
            .collect();
        for permission_id in permissions {
            state.permissions.remove(&permission_id);
            state.grants.retain(|(_, p)| *p != permission_id);
        }

        state.belongs_to.retain(|(a, _)| *a != id);
        state.tokens.retain(|_, t| t.account_id != Some(id));
        Ok(())
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Account>> {
        let state = self.shared.state.read();
        let accounts = state
            .belongs_to
            .iter()
            .filter(|(_, u)| *u == user_id)
            .filter_map(|(a, _)| state.accounts.get(a).cloned());
        Ok(paginate(accounts, &query, &self.shared.config))
    }

    async fn get_user_accounts(&self, user_id: Uuid) -> CustosResult<Vec<Account>> {
        let state = self.shared.state.read();
        let accounts = state
            .belongs_to
            .iter()
            .filter(|(_, u)| *u == user_id)
            .filter_map(|(a, _)| state.accounts.get(a).cloned())
            .collect();
        Ok(sorted(accounts))
    }

    async fn add_user(&self, account_id: Uuid, user_id: Uuid) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        if !state.accounts.contains_key(&account_id) {
            return Err(DbError::not_found("account", account_id).into());
        }
        if !state.users.contains_key(&user_id) {
            return Err(DbError::not_found("user", user_id).into());
        }
        state.belongs_to.insert((account_id, user_id));
        Ok(())
    }

    async fn remove_user(&self, account_id: Uuid, user_id: Uuid) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        if !state.belongs_to.remove(&(account_id, user_id)) {
            return Err(DbError::not_found("account member", user_id).into());
        }
        state.detach_user_from_account(account_id, user_id);
        state
            .tokens
            .retain(|_, t| !(t.user_id == user_id && t.account_id == Some(account_id)));
        Ok(())
    }

    async fn is_member(&self, account_id: Uuid, user_id: Uuid) -> CustosResult<bool> {
        Ok(self
            .shared
            .state
            .read()
            .belongs_to
            .contains(&(account_id, user_id)))
    }

    async fn list_users(
        &self,
        account_id: Uuid,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<User>> {
        let state = self.shared.state.read();
        let users = state
            .belongs_to
            .range((account_id, Uuid::nil())..=(account_id, Uuid::from_u128(u128::MAX)))
            .filter_map(|(_, u)| state.users.get(u).cloned());
        Ok(paginate(users, &query, &self.shared.config))
    }
}
