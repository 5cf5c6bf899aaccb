//! In-memory implementation of [`RoleRepository`].

use std::collections::BTreeSet;

use chrono::Utc;
use custos_core::error::CustosResult;
use custos_core::models::group::Group;
use custos_core::models::role::{NewRole, Role, UpdateRole};
use custos_core::models::user::User;
use custos_core::repository::{ListQuery, PaginatedResult, RoleRepository};
use uuid::Uuid;

use super::{paginate, sorted};
use crate::error::DbError;
use crate::store::{Shared, State};

#[derive(Debug, Clone)]
pub struct MemRoleRepository {
    shared: Shared,
}

impl MemRoleRepository {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }
}

fn scoped(state: &State, account_id: Uuid, id: Uuid) -> Result<&Role, DbError> {
    state
        .roles
        .get(&id)
        .filter(|r| r.account_id == account_id)
        .ok_or_else(|| DbError::not_found("role", id))
}

fn scoped_group(state: &State, account_id: Uuid, id: Uuid) -> Result<&Group, DbError> {
    state
        .groups
        .get(&id)
        .filter(|g| g.account_id == account_id)
        .ok_or_else(|| DbError::not_found("group", id))
}

fn name_taken(state: &State, account_id: Uuid, name: &str, except: Option<Uuid>) -> bool {
    state.roles.values().any(|r| {
        r.account_id == account_id && Some(r.id) != except && r.name.eq_ignore_ascii_case(name)
    })
}

/// Roles of `ids` that belong to `account_id`.
fn collect_roles(state: &State, account_id: Uuid, ids: impl Iterator<Item = Uuid>) -> Vec<Role> {
    let roles = ids
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter_map(|id| state.roles.get(&id))
        .filter(|r| r.account_id == account_id)
        .cloned()
        .collect();
    sorted(roles)
}

fn direct_role_ids(state: &State, user_id: Uuid) -> impl Iterator<Item = Uuid> + '_ {
    state
        .user_roles
        .iter()
        .filter(move |(u, _)| *u == user_id)
        .map(|(_, r)| *r)
}

impl RoleRepository for MemRoleRepository {
    async fn create(&self, input: NewRole) -> CustosResult<Role> {
        let mut state = self.shared.state.write();
        if !state.accounts.contains_key(&input.account_id) {
            return Err(DbError::not_found("account", input.account_id).into());
        }
        if name_taken(&state, input.account_id, &input.name, None) {
            return Err(DbError::duplicate("role", &input.name).into());
        }

        let now = Utc::now();
        let role = Role {
            id: Uuid::new_v4(),
            account_id: input.account_id,
            name: input.name,
            description: input.description,
            is_system_defined: input.is_system_defined,
            created_at: now,
            updated_at: now,
        };
        state.roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn get_by_id(&self, account_id: Uuid, id: Uuid) -> CustosResult<Role> {
        let state = self.shared.state.read();
        Ok(scoped(&state, account_id, id)?.clone())
    }

    async fn find_by_name(&self, account_id: Uuid, name: &str) -> CustosResult<Option<Role>> {
        let state = self.shared.state.read();
        Ok(state
            .roles
            .values()
            .find(|r| r.account_id == account_id && r.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn update(&self, account_id: Uuid, id: Uuid, input: UpdateRole) -> CustosResult<Role> {
        let mut state = self.shared.state.write();
        scoped(&state, account_id, id)?;
        if let Some(name) = input.name.as_deref() {
            if name_taken(&state, account_id, name, Some(id)) {
                return Err(DbError::duplicate("role", name).into());
            }
        }

        let role = state
            .roles
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("role", id))?;
        if let Some(name) = input.name {
            role.name = name;
        }
        if let Some(description) = input.description {
            role.description = description;
        }
        role.updated_at = Utc::now();
        Ok(role.clone())
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        scoped(&state, account_id, id)?;
        state.roles.remove(&id);
        state.detach_role(id);
        Ok(())
    }

    async fn list(&self, account_id: Uuid, query: ListQuery) -> CustosResult<PaginatedResult<Role>> {
        let state = self.shared.state.read();
        let roles = state
            .roles
            .values()
            .filter(|r| r.account_id == account_id)
            .cloned();
        Ok(paginate(roles, &query, &self.shared.config))
    }

    async fn assign_to_user(&self, account_id: Uuid, user_id: Uuid, role_id: Uuid) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        scoped(&state, account_id, role_id)?;
        if !state.belongs_to.contains(&(account_id, user_id)) {
            return Err(DbError::not_found("user", user_id).into());
        }
        state.user_roles.insert((user_id, role_id));
        Ok(())
    }

    async fn unassign_from_user(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        scoped(&state, account_id, role_id)?;
        if !state.user_roles.remove(&(user_id, role_id)) {
            return Err(DbError::not_found("role assignment", role_id).into());
        }
        Ok(())
    }

    async fn get_user_roles(&self, account_id: Uuid, user_id: Uuid) -> CustosResult<Vec<Role>> {
        let state = self.shared.state.read();
        let groups: BTreeSet<Uuid> = state
            .member_of
            .iter()
            .filter(|(_, u)| *u == user_id)
            .map(|(g, _)| *g)
            .collect();
        let via_groups = state
            .group_roles
            .iter()
            .filter(|(g, _)| groups.contains(g))
            .map(|(_, r)| *r);
        Ok(collect_roles(
            &state,
            account_id,
            direct_role_ids(&state, user_id).chain(via_groups),
        ))
    }

    async fn get_direct_user_roles(&self, account_id: Uuid, user_id: Uuid) -> CustosResult<Vec<Role>> {
        let state = self.shared.state.read();
        Ok(collect_roles(
            &state,
            account_id,
            direct_role_ids(&state, user_id),
        ))
    }

    async fn assign_to_group(&self, account_id: Uuid, group_id: Uuid, role_id: Uuid) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        scoped(&state, account_id, role_id)?;
        scoped_group(&state, account_id, group_id)?;
        state.group_roles.insert((group_id, role_id));
        Ok(())
    }

    async fn unassign_from_group(
        &self,
        account_id: Uuid,
        group_id: Uuid,
        role_id: Uuid,
    ) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        scoped(&state, account_id, role_id)?;
        scoped_group(&state, account_id, group_id)?;
        if !state.group_roles.remove(&(group_id, role_id)) {
            return Err(DbError::not_found("role assignment", role_id).into());
        }
        Ok(())
    }

    async fn get_group_roles(&self, account_id: Uuid, group_id: Uuid) -> CustosResult<Vec<Role>> {
        let state = self.shared.state.read();
        scoped_group(&state, account_id, group_id)?;
        let ids = state
            .group_roles
            .iter()
            .filter(|(g, _)| *g == group_id)
            .map(|(_, r)| *r);
        Ok(collect_roles(&state, account_id, ids))
    }

    async fn get_role_users(&self, account_id: Uuid, role_id: Uuid) -> CustosResult<Vec<User>> {
        let state = self.shared.state.read();
        scoped(&state, account_id, role_id)?;
        let users = state
            .user_roles
            .iter()
            .filter(|(_, r)| *r == role_id)
            .filter_map(|(u, _)| state.users.get(u).cloned())
            .collect();
        Ok(sorted(users))
    }

    async fn get_role_groups(&self, account_id: Uuid, role_id: Uuid) -> CustosResult<Vec<Group>> {
        let state = self.shared.state.read();
        scoped(&state, account_id, role_id)?;
        let groups = state
            .group_roles
            .iter()
            .filter(|(_, r)| *r == role_id)
            .filter_map(|(g, _)| state.groups.get(g).cloned())
            .collect();
        Ok(sorted(groups))
    }
}
