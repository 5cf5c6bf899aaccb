//! Modification service: updates to entities of the ambient account.

use custos_core::context::UserContextProvider;
use custos_core::error::CustosResult;
use custos_core::models::account::{Account, UpdateAccount};
use custos_core::models::group::{Group, UpdateGroup};
use custos_core::models::permission::{Permission, UpdatePermission};
use custos_core::models::role::{Role, UpdateRole};
use custos_core::models::user::{UpdateUser, User};
use custos_core::repository::Repositories;
use uuid::Uuid;

use super::{ModificationService, transact, validate};
use crate::processor::{
    AccountProcessor, GroupProcessor, PermissionProcessor, Processors, RoleProcessor,
    UserProcessor,
};

#[derive(Clone)]
pub struct Modification<R: Repositories> {
    repos: R,
    processors: Processors<R>,
}

impl<R: Repositories> Modification<R> {
    pub fn new(repos: R, processors: Processors<R>) -> Self {
        Self { repos, processors }
    }
}

impl<R: Repositories> ModificationService for Modification<R> {
    async fn modify_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
        input: UpdateAccount,
    ) -> CustosResult<Account> {
        validate(&input)?;
        transact(
            &self.repos,
            ctx,
            self.processors.accounts.update(ctx, account_id, input),
        )
        .await
    }

    async fn modify_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        input: UpdateUser,
    ) -> CustosResult<User> {
        validate(&input)?;
        transact(
            &self.repos,
            ctx,
            self.processors.users.update(ctx, user_id, input),
        )
        .await
    }

    async fn modify_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        input: UpdateGroup,
    ) -> CustosResult<Group> {
        validate(&input)?;
        transact(
            &self.repos,
            ctx,
            self.processors.groups.update(ctx, group_id, input),
        )
        .await
    }

    async fn modify_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        input: UpdateRole,
    ) -> CustosResult<Role> {
        validate(&input)?;
        transact(
            &self.repos,
            ctx,
            self.processors.roles.update(ctx, role_id, input),
        )
        .await
    }

    async fn modify_permission(
        &self,
        ctx: &UserContextProvider,
        permission_id: Uuid,
        input: UpdatePermission,
    ) -> CustosResult<Permission> {
        validate(&input)?;
        transact(
            &self.repos,
            ctx,
            self.processors.permissions.update(ctx, permission_id, input),
        )
        .await
    }
}
