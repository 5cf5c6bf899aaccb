//! Authorization decisions over the ambient user context.
//!
//! Every check is a side-effect-free predicate. Effective permissions of
//! a user in an account are the permissions granted to the user's direct
//! roles and to the roles of every group the user belongs to, all
//! restricted to that account. A user who is not a member of the account
//! has no effective permissions there.

use std::collections::BTreeMap;

use custos_core::context::UserContextProvider;
use custos_core::error::{CustosError, CustosResult};
use custos_core::models::permission::{Action, Permission, ResourceType};
use custos_core::repository::{
    AccountRepository, PermissionRepository, Repositories, RoleRepository,
};
use tracing::debug;
use uuid::Uuid;

/// Current user id, or `Unauthorized`.
pub fn current_user(ctx: &UserContextProvider) -> CustosResult<Uuid> {
    ctx.user_id()
        .ok_or_else(|| CustosError::unauthorized("no user context"))
}

/// Current account id, or `Unauthorized`.
pub fn current_account(ctx: &UserContextProvider) -> CustosResult<Uuid> {
    ctx.account_id()
        .ok_or_else(|| CustosError::unauthorized("no account context"))
}

#[derive(Clone)]
pub struct AuthorizationProvider<R> {
    repos: R,
}

impl<R: Repositories> AuthorizationProvider<R> {
    pub fn new(repos: R) -> Self {
        Self { repos }
    }

    pub fn repos(&self) -> &R {
        &self.repos
    }

    pub fn has_user_context(&self, ctx: &UserContextProvider) -> bool {
        ctx.user_id().is_some()
    }

    pub fn has_account_context(&self, ctx: &UserContextProvider) -> bool {
        ctx.account_id().is_some()
    }

    /// Like [`Self::has_account_context`], and the user must still be a
    /// member of the selected account.
    pub async fn has_account_context_verified(
        &self,
        ctx: &UserContextProvider,
    ) -> CustosResult<bool> {
        let current = ctx.current();
        match (current.user_id, current.account_id) {
            (Some(user_id), Some(account_id)) => {
                self.repos.accounts().is_member(account_id, user_id).await
            }
            _ => Ok(false),
        }
    }

    pub fn is_authorized_for_own_user(&self, ctx: &UserContextProvider, user_id: Uuid) -> bool {
        ctx.user_id() == Some(user_id)
    }

    /// Whether any effective permission of the ambient user in the ambient
    /// account grants `action` on the resource. False without account
    /// context.
    pub async fn is_authorized(
        &self,
        ctx: &UserContextProvider,
        action: Action,
        resource_type: ResourceType,
        resource_id: Option<Uuid>,
    ) -> CustosResult<bool> {
        let current = ctx.current();
        let (Some(user_id), Some(account_id)) = (current.user_id, current.account_id) else {
            return Ok(false);
        };

        let granted = self
            .effective_permissions(account_id, user_id)
            .await?
            .iter()
            .any(|p| p.grants(action, resource_type, resource_id));

        debug!(
            %user_id,
            %account_id,
            %action,
            %resource_type,
            resource_id = ?resource_id,
            granted,
            "authorization decision"
        );
        Ok(granted)
    }

    /// [`Self::is_authorized`] as a `Result`: `Unauthorized` when denied.
    pub async fn authorize(
        &self,
        ctx: &UserContextProvider,
        action: Action,
        resource_type: ResourceType,
        resource_id: Option<Uuid>,
    ) -> CustosResult<()> {
        if self
            .is_authorized(ctx, action, resource_type, resource_id)
            .await?
        {
            Ok(())
        } else {
            Err(CustosError::unauthorized(format!(
                "missing {action} permission on {resource_type}"
            )))
        }
    }

    /// Union of the permissions reachable from the user's direct and
    /// group-inherited roles in `account_id`, ordered by name.
    pub async fn effective_permissions(
        &self,
        account_id: Uuid,
        user_id: Uuid,
    ) -> CustosResult<Vec<Permission>> {
        if !self.repos.accounts().is_member(account_id, user_id).await? {
            return Ok(Vec::new());
        }

        let mut permissions = BTreeMap::new();
        for role in self.repos.roles().get_user_roles(account_id, user_id).await? {
            for permission in self
                .repos
                .permissions()
                .get_role_permissions(account_id, role.id)
                .await?
            {
                permissions.insert(permission.id, permission);
            }
        }

        let mut permissions: Vec<Permission> = permissions.into_values().collect();
        permissions.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(permissions)
    }
}
