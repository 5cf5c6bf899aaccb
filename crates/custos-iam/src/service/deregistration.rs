//! Deregistration service: deletions, leaving accounts and bulk removals
//! guarded by the ownership rules.

use custos_core::context::{UserContextProvider, UserContextSetter};
use custos_core::error::CustosResult;
use custos_core::outcome::BulkOutcome;
use custos_core::repository::Repositories;
use tracing::info;
use uuid::Uuid;

use super::{DeregistrationService, log_rejected, transact};
use crate::authorization::current_account;
use crate::processor::{
    AccountProcessor, GroupProcessor, PermissionProcessor, Processors, RoleProcessor,
    UserProcessor,
};

#[derive(Clone)]
pub struct Deregistration<R: Repositories> {
    repos: R,
    processors: Processors<R>,
}

impl<R: Repositories> Deregistration<R> {
    pub fn new(repos: R, processors: Processors<R>) -> Self {
        Self { repos, processors }
    }
}

impl<R: Repositories> DeregistrationService for Deregistration<R> {
    async fn deregister_user(&self, ctx: &UserContextProvider, user_id: Uuid) -> CustosResult<()> {
        transact(&self.repos, ctx, self.processors.users.delete(user_id)).await?;
        UserContextSetter::new(ctx).clear_for_user(user_id);
        info!(%user_id, "user deregistered");
        Ok(())
    }

    async fn deregister_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
    ) -> CustosResult<()> {
        transact(
            &self.repos,
            ctx,
            self.processors.accounts.delete(ctx, account_id),
        )
        .await?;
        UserContextSetter::new(ctx).forget_account(account_id);
        info!(%account_id, "account deregistered");
        Ok(())
    }

    async fn deregister_user_from_account(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
    ) -> CustosResult<()> {
        let account_id = current_account(ctx)?;
        transact(
            &self.repos,
            ctx,
            self.processors.accounts.remove_user(ctx, user_id),
        )
        .await?;
        // Leaving an account ends the session's hold on it.
        if ctx.user_id() == Some(user_id) {
            UserContextSetter::new(ctx).forget_account(account_id);
        }
        info!(%account_id, %user_id, "user deregistered from account");
        Ok(())
    }

    async fn deregister_users_from_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        let outcome = transact(
            &self.repos,
            ctx,
            self.processors.groups.remove_users(ctx, group_id, &user_ids),
        )
        .await?;
        log_rejected("deregister_users_from_group", &outcome);
        Ok(outcome)
    }

    async fn deregister_roles_from_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        let outcome = transact(
            &self.repos,
            ctx,
            self.processors.groups.remove_roles(ctx, group_id, &role_ids),
        )
        .await?;
        log_rejected("deregister_roles_from_group", &outcome);
        Ok(outcome)
    }

    async fn deregister_roles_from_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        let outcome = transact(
            &self.repos,
            ctx,
            self.processors.users.remove_roles(ctx, user_id, &role_ids),
        )
        .await?;
        log_rejected("deregister_roles_from_user", &outcome);
        Ok(outcome)
    }

    async fn deregister_permissions_from_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        let outcome = transact(
            &self.repos,
            ctx,
            self.processors
                .roles
                .remove_permissions(ctx, role_id, &permission_ids),
        )
        .await?;
        log_rejected("deregister_permissions_from_role", &outcome);
        Ok(outcome)
    }

    async fn deregister_group(&self, ctx: &UserContextProvider, group_id: Uuid) -> CustosResult<()> {
        transact(&self.repos, ctx, self.processors.groups.delete(ctx, group_id)).await
    }

    async fn deregister_role(&self, ctx: &UserContextProvider, role_id: Uuid) -> CustosResult<()> {
        transact(&self.repos, ctx, self.processors.roles.delete(ctx, role_id)).await
    }

    async fn deregister_permission(
        &self,
        ctx: &UserContextProvider,
        permission_id: Uuid,
    ) -> CustosResult<()> {
        transact(
            &self.repos,
            ctx,
            self.processors.permissions.delete(ctx, permission_id),
        )
        .await
    }
}
