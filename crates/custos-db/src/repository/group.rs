//! In-memory implementation of [`GroupRepository`].

use chrono::Utc;
use custos_core::error::CustosResult;
use custos_core::models::group::{CreateGroup, Group, UpdateGroup};
use custos_core::models::user::User;
use custos_core::repository::{GroupRepository, ListQuery, PaginatedResult};
use uuid::Uuid;

use super::{paginate, sorted};
use crate::error::DbError;
use crate::store::{Shared, State};

#[derive(Debug, Clone)]
pub struct MemGroupRepository {
    shared: Shared,
}

impl MemGroupRepository {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }
}

/// Looks a group up inside one account; groups of other accounts are
/// reported as missing.
fn scoped(state: &State, account_id: Uuid, id: Uuid) -> Result<&Group, DbError> {
    state
        .groups
        .get(&id)
        .filter(|g| g.account_id == account_id)
        .ok_or_else(|| DbError::not_found("group", id))
}

fn name_taken(state: &State, account_id: Uuid, name: &str, except: Option<Uuid>) -> bool {
    state.groups.values().any(|g| {
        g.account_id == account_id && Some(g.id) != except && g.name.eq_ignore_ascii_case(name)
    })
}

impl GroupRepository for MemGroupRepository {
    async fn create(&self, account_id: Uuid, input: CreateGroup) -> CustosResult<Group> {
        let mut state = self.shared.state.write();
        if !state.accounts.contains_key(&account_id) {
            return Err(DbError::not_found("account", account_id).into());
        }
        if name_taken(&state, account_id, &input.name, None) {
            return Err(DbError::duplicate("group", &input.name).into());
        }

        let now = Utc::now();
        let group = Group {
            id: Uuid::new_v4(),
            account_id,
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn get_by_id(&self, account_id: Uuid, id: Uuid) -> CustosResult<Group> {
        let state = self.shared.state.read();
        Ok(scoped(&state, account_id, id)?.clone())
    }

    async fn find_by_name(&self, account_id: Uuid, name: &str) -> CustosResult<Option<Group>> {
        let state = self.shared.state.read();
        Ok(state
            .groups
            .values()
            .find(|g| g.account_id == account_id && g.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn update(&self, account_id: Uuid, id: Uuid, input: UpdateGroup) -> CustosResult<Group> {
        let mut state = self.shared.state.write();
        scoped(&state, account_id, id)?;
        if let Some(name) = input.name.as_deref() {
            if name_taken(&state, account_id, name, Some(id)) {
                return Err(DbError::duplicate("group", name).into());
            }
        }

        let group = state
            .groups
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("group", id))?;
        if let Some(name) = input.name {
            group.name = name;
        }
        if let Some(description) = input.description {
            group.description = description;
        }
        group.updated_at = Utc::now();
        Ok(group.clone())
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        scoped(&state, account_id, id)?;
        state.groups.remove(&id);
        state.detach_group(id);
        Ok(())
    }

    async fn list(&self, account_id: Uuid, query: ListQuery) -> CustosResult<PaginatedResult<Group>> {
        let state = self.shared.state.read();
        let groups = state
            .groups
            .values()
            .filter(|g| g.account_id == account_id)
            .cloned();
        Ok(paginate(groups, &query, &self.shared.config))
    }

    async fn add_member(&self, account_id: Uuid, user_id: Uuid, group_id: Uuid) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        scoped(&state, account_id, group_id)?;
        if !state.belongs_to.contains(&(account_id, user_id)) {
            return Err(DbError::not_found("user", user_id).into());
        }
        state.member_of.insert((group_id, user_id));
        Ok(())
    }

    async fn remove_member(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        group_id: Uuid,
    ) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        scoped(&state, account_id, group_id)?;
        if !state.member_of.remove(&(group_id, user_id)) {
            return Err(DbError::not_found("group member", user_id).into());
        }
        Ok(())
    }

    async fn get_members(&self, account_id: Uuid, group_id: Uuid) -> CustosResult<Vec<User>> {
        let state = self.shared.state.read();
        scoped(&state, account_id, group_id)?;
        let members = state
            .member_of
            .iter()
            .filter(|(g, _)| *g == group_id)
            .filter_map(|(_, u)| state.users.get(u).cloned())
            .collect();
        Ok(sorted(members))
    }

    async fn get_user_groups(&self, account_id: Uuid, user_id: Uuid) -> CustosResult<Vec<Group>> {
        let state = self.shared.state.read();
        let groups = state
            .member_of
            .iter()
            .filter(|(_, u)| *u == user_id)
            .filter_map(|(g, _)| state.groups.get(g))
            .filter(|g| g.account_id == account_id)
            .cloned()
            .collect();
        Ok(sorted(groups))
    }
}
