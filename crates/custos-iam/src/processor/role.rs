//! Role processor: roles of the ambient account and their permission
//! grants.

use std::collections::HashSet;

use custos_core::context::UserContextProvider;
use custos_core::error::{CustosError, CustosResult};
use custos_core::models::role::{CreateRole, NewRole, Role, RoleDetails, UpdateRole};
use custos_core::outcome::BulkOutcome;
use custos_core::repository::{
    ListQuery, PaginatedResult, PermissionRepository, Repositories, RoleRepository,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{RoleProcessor, found, plan_bulk};
use crate::authorization::current_account;

#[derive(Clone)]
pub struct Roles<R> {
    repos: R,
}

impl<R: Repositories> Roles<R> {
    pub fn new(repos: R) -> Self {
        Self { repos }
    }

    /// The role, provided it belongs to the ambient account.
    async fn load(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<Role> {
        let account_id = current_account(ctx)?;
        self.repos.roles().get_by_id(account_id, id).await
    }

    async fn granted(&self, account_id: Uuid, role_id: Uuid) -> CustosResult<HashSet<Uuid>> {
        Ok(self
            .repos
            .permissions()
            .get_role_permissions(account_id, role_id)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect())
    }
}

impl<R: Repositories> RoleProcessor for Roles<R> {
    #[instrument(skip_all, fields(name = %input.name))]
    async fn create(&self, ctx: &UserContextProvider, input: CreateRole) -> CustosResult<Role> {
        let account_id = current_account(ctx)?;
        if self
            .repos
            .roles()
            .find_by_name(account_id, &input.name)
            .await?
            .is_some()
        {
            return Err(CustosError::already_exists("role", input.name));
        }
        let role = self
            .repos
            .roles()
            .create(NewRole {
                account_id,
                name: input.name,
                description: input.description,
                is_system_defined: false,
            })
            .await?;
        info!(%account_id, role_id = %role.id, "role created");
        Ok(role)
    }

    /// System roles cannot be changed.
    #[instrument(skip_all, fields(%id))]
    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateRole,
    ) -> CustosResult<Role> {
        let role = self.load(ctx, id).await?;
        if role.is_system_defined {
            return Err(CustosError::SystemDefinedRole { role_id: id });
        }
        if let Some(name) = &input.name {
            let clash = self.repos.roles().find_by_name(role.account_id, name).await?;
            if clash.is_some_and(|r| r.id != id) {
                return Err(CustosError::already_exists("role", name.clone()));
            }
        }
        self.repos.roles().update(role.account_id, id, input).await
    }

    #[instrument(skip_all, fields(%id))]
    async fn delete(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        let role = self.load(ctx, id).await?;
        if role.is_system_defined {
            return Err(CustosError::SystemDefinedRole { role_id: id });
        }
        self.repos.roles().delete(role.account_id, id).await?;
        info!(account_id = %role.account_id, role_id = %id, "role deleted");
        Ok(())
    }

    #[instrument(skip_all, fields(%id, hydrate))]
    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<RoleDetails> {
        let role = self.load(ctx, id).await?;
        if !hydrate {
            return Ok(RoleDetails {
                role,
                permissions: None,
                users: None,
                groups: None,
            });
        }
        let account_id = role.account_id;
        let roles = self.repos.roles();
        Ok(RoleDetails {
            permissions: Some(
                self.repos
                    .permissions()
                    .get_role_permissions(account_id, id)
                    .await?,
            ),
            users: Some(roles.get_role_users(account_id, id).await?),
            groups: Some(roles.get_role_groups(account_id, id).await?),
            role,
        })
    }

    #[instrument(skip_all)]
    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Role>> {
        let account_id = current_account(ctx)?;
        self.repos.roles().list(account_id, query).await
    }

    /// Grants permissions of the ambient account to the role.
    #[instrument(skip_all, fields(%role_id, requested = permission_ids.len()))]
    async fn add_permissions(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        let role = self.load(ctx, role_id).await?;

        let account_id = role.account_id;
        let permissions = self.repos.permissions();
        let granted = self.granted(account_id, role_id).await?;
        let plan = plan_bulk(permission_ids, |id| {
            let granted = &granted;
            async move {
                if granted.contains(&id) {
                    return Ok(false);
                }
                found(permissions.get_by_id(account_id, id).await).map(|p| p.is_some())
            }
        })
        .await?;
        plan.ensure_any_valid("permission")?;

        for &permission_id in &plan.valid {
            permissions
                .grant_to_role(account_id, role_id, permission_id)
                .await?;
        }
        Ok(plan.into_outcome())
    }

    /// Revokes permissions from the role. System permissions stay on
    /// system roles; any such id blocks the whole batch.
    #[instrument(skip_all, fields(%role_id, requested = permission_ids.len()))]
    async fn remove_permissions(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        let role = self.load(ctx, role_id).await?;

        let account_id = role.account_id;
        let permissions = self.repos.permissions();
        let granted: Vec<_> = permissions
            .get_role_permissions(account_id, role_id)
            .await?;
        let plan = plan_bulk(permission_ids, |id| {
            let held = granted.iter().any(|p| p.id == id);
            async move { Ok(held) }
        })
        .await?;
        plan.ensure_any_valid("permission")?;

        if role.is_system_defined {
            let blocked: Vec<Uuid> = granted
                .iter()
                .filter(|p| p.is_system_defined && plan.valid.contains(&p.id))
                .map(|p| p.id)
                .collect();
            if !blocked.is_empty() {
                return Err(CustosError::SystemPermissionRemoval {
                    blocked_ids: blocked,
                    invalid_ids: plan.invalid,
                });
            }
        }

        for &permission_id in &plan.valid {
            permissions
                .revoke_from_role(account_id, role_id, permission_id)
                .await?;
        }
        Ok(plan.into_outcome())
    }
}
