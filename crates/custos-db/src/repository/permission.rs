//! In-memory implementation of [`PermissionRepository`].

use chrono::Utc;
use custos_core::error::CustosResult;
use custos_core::models::permission::{NewPermission, Permission, UpdatePermission};
use custos_core::models::role::Role;
use custos_core::repository::{ListQuery, PaginatedResult, PermissionRepository};
use uuid::Uuid;

use super::{paginate, sorted};
use crate::error::DbError;
use crate::store::{Shared, State};

#[derive(Debug, Clone)]
pub struct MemPermissionRepository {
    shared: Shared,
}

impl MemPermissionRepository {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }
}

fn scoped(state: &State, account_id: Uuid, id: Uuid) -> Result<&Permission, DbError> {
    state
        .permissions
        .get(&id)
        .filter(|p| p.account_id == account_id)
        .ok_or_else(|| DbError::not_found("permission", id))
}

fn scoped_role(state: &State, account_id: Uuid, id: Uuid) -> Result<&Role, DbError> {
    state
        .roles
        .get(&id)
        .filter(|r| r.account_id == account_id)
        .ok_or_else(|| DbError::not_found("role", id))
}

fn name_taken(state: &State, account_id: Uuid, name: &str, except: Option<Uuid>) -> bool {
    state.permissions.values().any(|p| {
        p.account_id == account_id && Some(p.id) != except && p.name.eq_ignore_ascii_case(name)
    })
}

impl PermissionRepository for MemPermissionRepository {
    async fn create(&self, input: NewPermission) -> CustosResult<Permission> {
        let mut state = self.shared.state.write();
        if !state.accounts.contains_key(&input.account_id) {
            return Err(DbError::not_found("account", input.account_id).into());
        }
        if name_taken(&state, input.account_id, &input.name, None) {
            return Err(DbError::duplicate("permission", &input.name).into());
        }

        let now = Utc::now();
        let permission = Permission {
            id: Uuid::new_v4(),
            account_id: input.account_id,
            name: input.name,
            description: input.description,
            resource_type: input.resource_type,
            resource_id: input.resource_id,
            actions: input.actions,
            is_system_defined: input.is_system_defined,
            created_at: now,
            updated_at: now,
        };
        state.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }

    async fn get_by_id(&self, account_id: Uuid, id: Uuid) -> CustosResult<Permission> {
        let state = self.shared.state.read();
        Ok(scoped(&state, account_id, id)?.clone())
    }

    async fn find_by_name(
        &self,
        account_id: Uuid,
        name: &str,
    ) -> CustosResult<Option<Permission>> {
        let state = self.shared.state.read();
        Ok(state
            .permissions
            .values()
            .find(|p| p.account_id == account_id && p.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn update(
        &self,
        account_id: Uuid,
        id: Uuid,
        input: UpdatePermission,
    ) -> CustosResult<Permission> {
        let mut state = self.shared.state.write();
        scoped(&state, account_id, id)?;
        if let Some(name) = input.name.as_deref() {
            if name_taken(&state, account_id, name, Some(id)) {
                return Err(DbError::duplicate("permission", name).into());
            }
        }

        let permission = state
            .permissions
            .get_mut(&id)
            .ok_or_else(|| DbError::not_found("permission", id))?;
        if let Some(name) = input.name {
            permission.name = name;
        }
        if let Some(description) = input.description {
            permission.description = description;
        }
        if let Some(actions) = input.actions {
            permission.actions = actions;
        }
        permission.updated_at = Utc::now();
        Ok(permission.clone())
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        scoped(&state, account_id, id)?;
        state.permissions.remove(&id);
        state.grants.retain(|(_, p)| *p != id);
        Ok(())
    }

    async fn list(
        &self,
        account_id: Uuid,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Permission>> {
        let state = self.shared.state.read();
        let permissions = state
            .permissions
            .values()
            .filter(|p| p.account_id == account_id)
            .cloned();
        Ok(paginate(permissions, &query, &self.shared.config))
    }

    async fn grant_to_role(
        &self,
        account_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        scoped_role(&state, account_id, role_id)?;
        scoped(&state, account_id, permission_id)?;
        state.grants.insert((role_id, permission_id));
        Ok(())
    }

    async fn revoke_from_role(
        &self,
        account_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> CustosResult<()> {
        let mut state = self.shared.state.write();
        scoped_role(&state, account_id, role_id)?;
        if !state.grants.remove(&(role_id, permission_id)) {
            return Err(DbError::not_found("permission grant", permission_id).into());
        }
        Ok(())
    }

    async fn get_role_permissions(
        &self,
        account_id: Uuid,
        role_id: Uuid,
    ) -> CustosResult<Vec<Permission>> {
        let state = self.shared.state.read();
        scoped_role(&state, account_id, role_id)?;
        let permissions = state
            .grants
            .iter()
            .filter(|(r, _)| *r == role_id)
            .filter_map(|(_, p)| state.permissions.get(p))
            .filter(|p| p.account_id == account_id)
            .cloned()
            .collect();
        Ok(sorted(permissions))
    }

    async fn get_permission_roles(
        &self,
        account_id: Uuid,
        permission_id: Uuid,
    ) -> CustosResult<Vec<Role>> {
        let state = self.shared.state.read();
        scoped(&state, account_id, permission_id)?;
        let roles = state
            .grants
            .iter()
            .filter(|(_, p)| *p == permission_id)
            .filter_map(|(r, _)| state.roles.get(r).cloned())
            .collect();
        Ok(sorted(roles))
    }
}
