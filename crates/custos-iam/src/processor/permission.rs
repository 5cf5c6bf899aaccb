//! Permission processor: permissions of the ambient account.

use custos_core::context::UserContextProvider;
use custos_core::error::{CustosError, CustosResult};
use custos_core::models::permission::{
    CreatePermission, NewPermission, Permission, PermissionDetails, ResourceType,
    UpdatePermission,
};
use custos_core::repository::{
    AccountRepository, GroupRepository, ListQuery, PaginatedResult, PermissionRepository,
    Repositories, RoleRepository,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{PermissionProcessor, found};
use crate::authorization::current_account;

#[derive(Clone)]
pub struct Permissions<R> {
    repos: R,
}

impl<R: Repositories> Permissions<R> {
    pub fn new(repos: R) -> Self {
        Self { repos }
    }

    async fn load(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<Permission> {
        let account_id = current_account(ctx)?;
        self.repos.permissions().get_by_id(account_id, id).await
    }

    async fn resource_exists(
        &self,
        account_id: Uuid,
        resource_type: ResourceType,
        resource_id: Uuid,
    ) -> CustosResult<bool> {
        match resource_type {
            ResourceType::Account => Ok(resource_id == account_id),
            ResourceType::User => self.repos.accounts().is_member(account_id, resource_id).await,
            ResourceType::Group => {
                found(self.repos.groups().get_by_id(account_id, resource_id).await)
                    .map(|g| g.is_some())
            }
            ResourceType::Role => {
                found(self.repos.roles().get_by_id(account_id, resource_id).await)
                    .map(|r| r.is_some())
            }
            ResourceType::Permission => {
                found(self.repos.permissions().get_by_id(account_id, resource_id).await)
                    .map(|p| p.is_some())
            }
        }
    }
}

impl<R: Repositories> PermissionProcessor for Permissions<R> {
    /// A resource-scoped permission must point at a resource of the
    /// ambient account.
    #[instrument(skip_all, fields(name = %input.name, resource_type = %input.resource_type))]
    async fn create(
        &self,
        ctx: &UserContextProvider,
        input: CreatePermission,
    ) -> CustosResult<Permission> {
        let account_id = current_account(ctx)?;
        if self
            .repos
            .permissions()
            .find_by_name(account_id, &input.name)
            .await?
            .is_some()
        {
            return Err(CustosError::already_exists("permission", input.name));
        }
        if let Some(resource_id) = input.resource_id {
            if !self
                .resource_exists(account_id, input.resource_type, resource_id)
                .await?
            {
                return Err(CustosError::not_found(
                    input.resource_type.as_str(),
                    resource_id,
                ));
            }
        }

        let permission = self
            .repos
            .permissions()
            .create(NewPermission {
                account_id,
                name: input.name,
                description: input.description,
                resource_type: input.resource_type,
                resource_id: input.resource_id,
                actions: input.actions,
                is_system_defined: false,
            })
            .await?;
        info!(%account_id, permission_id = %permission.id, "permission created");
        Ok(permission)
    }

    #[instrument(skip_all, fields(%id))]
    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdatePermission,
    ) -> CustosResult<Permission> {
        let permission = self.load(ctx, id).await?;
        if permission.is_system_defined {
            return Err(CustosError::SystemDefinedPermission { permission_id: id });
        }
        if let Some(name) = &input.name {
            let clash = self
                .repos
                .permissions()
                .find_by_name(permission.account_id, name)
                .await?;
            if clash.is_some_and(|p| p.id != id) {
                return Err(CustosError::already_exists("permission", name.clone()));
            }
        }
        self.repos
            .permissions()
            .update(permission.account_id, id, input)
            .await
    }

    #[instrument(skip_all, fields(%id))]
    async fn delete(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        let permission = self.load(ctx, id).await?;
        if permission.is_system_defined {
            return Err(CustosError::SystemDefinedPermission { permission_id: id });
        }
        self.repos
            .permissions()
            .delete(permission.account_id, id)
            .await?;
        info!(account_id = %permission.account_id, permission_id = %id, "permission deleted");
        Ok(())
    }

    #[instrument(skip_all, fields(%id, hydrate))]
    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<PermissionDetails> {
        let permission = self.load(ctx, id).await?;
        let roles = if hydrate {
            Some(
                self.repos
                    .permissions()
                    .get_permission_roles(permission.account_id, id)
                    .await?,
            )
        } else {
            None
        };
        Ok(PermissionDetails { permission, roles })
    }

    #[instrument(skip_all)]
    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Permission>> {
        let account_id = current_account(ctx)?;
        self.repos.permissions().list(account_id, query).await
    }
}
