//! Registration service: sign-up, account creation with its system roles,
//! entity creation and bulk assignments.

use custos_core::context::UserContextProvider;
use custos_core::error::{CustosError, CustosResult};
use custos_core::models::account::{Account, CreateAccount};
use custos_core::models::group::{CreateGroup, Group};
use custos_core::models::permission::{CreatePermission, Permission};
use custos_core::models::role::{CreateRole, Role};
use custos_core::models::user::{RegisterUser, User};
use custos_core::outcome::BulkOutcome;
use custos_core::repository::Repositories;
use tracing::info;
use uuid::Uuid;

use super::{RegistrationService, log_rejected, transact, validate};
use crate::authorization::current_user;
use crate::processor::{
    AccountProcessor, GroupProcessor, PermissionProcessor, Processors, RoleProcessor,
    UserProcessor,
};

/// Wraps the failure of one registration step in that step's error.
/// Conflicts and cancellation keep their own variant.
fn step_failed(err: CustosError, wrap: fn(String) -> CustosError) -> CustosError {
    match err {
        CustosError::AlreadyExists { .. } | CustosError::Cancelled => err,
        other => wrap(other.to_string()),
    }
}

#[derive(Clone)]
pub struct Registration<R: Repositories> {
    repos: R,
    processors: Processors<R>,
}

impl<R: Repositories> Registration<R> {
    pub fn new(repos: R, processors: Processors<R>) -> Self {
        Self { repos, processors }
    }
}

impl<R: Repositories> RegistrationService for Registration<R> {
    async fn register_user(&self, ctx: &UserContextProvider, input: RegisterUser) -> CustosResult<User> {
        validate(&input)?;
        let users = &self.processors.users;
        let user = transact(&self.repos, ctx, async {
            let user = users
                .create(input.identity())
                .await
                .map_err(|e| step_failed(e, |reason| CustosError::UserCreation { reason }))?;
            users
                .create_credential(user.id, &input.password)
                .await
                .map_err(|e| step_failed(e, |reason| CustosError::BasicAuthCreation { reason }))?;
            Ok::<_, CustosError>(user)
        })
        .await?;
        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    async fn register_account(
        &self,
        ctx: &UserContextProvider,
        input: CreateAccount,
    ) -> CustosResult<Account> {
        validate(&input)?;
        let owner = current_user(ctx)?;
        let accounts = &self.processors.accounts;
        let account = transact(&self.repos, ctx, async {
            let account = accounts
                .create(owner, input)
                .await
                .map_err(|e| step_failed(e, |reason| CustosError::AccountCreation { reason }))?;
            accounts
                .seed_system_roles(account.id, owner)
                .await
                .map_err(|e| {
                    step_failed(e, |reason| CustosError::SystemRoleAssignment { reason })
                })?;
            Ok::<_, CustosError>(account)
        })
        .await?;
        info!(account_id = %account.id, %owner, "account registered");
        Ok(account)
    }

    async fn register_user_with_account(
        &self,
        ctx: &UserContextProvider,
        input: RegisterUser,
    ) -> CustosResult<User> {
        validate(&input)?;
        transact(
            &self.repos,
            ctx,
            self.processors.users.register_in_account(ctx, input),
        )
        .await
    }

    async fn register_group(&self, ctx: &UserContextProvider, input: CreateGroup) -> CustosResult<Group> {
        validate(&input)?;
        transact(&self.repos, ctx, self.processors.groups.create(ctx, input)).await
    }

    async fn register_role(&self, ctx: &UserContextProvider, input: CreateRole) -> CustosResult<Role> {
        validate(&input)?;
        transact(&self.repos, ctx, self.processors.roles.create(ctx, input)).await
    }

    async fn register_permission(
        &self,
        ctx: &UserContextProvider,
        input: CreatePermission,
    ) -> CustosResult<Permission> {
        validate(&input)?;
        transact(&self.repos, ctx, self.processors.permissions.create(ctx, input)).await
    }

    async fn register_users_to_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        let outcome = transact(
            &self.repos,
            ctx,
            self.processors.groups.add_users(ctx, group_id, &user_ids),
        )
        .await?;
        log_rejected("register_users_to_group", &outcome);
        Ok(outcome)
    }

    async fn register_roles_to_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        let outcome = transact(
            &self.repos,
            ctx,
            self.processors.groups.add_roles(ctx, group_id, &role_ids),
        )
        .await?;
        log_rejected("register_roles_to_group", &outcome);
        Ok(outcome)
    }

    async fn register_roles_to_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        let outcome = transact(
            &self.repos,
            ctx,
            self.processors.users.assign_roles(ctx, user_id, &role_ids),
        )
        .await?;
        log_rejected("register_roles_to_user", &outcome);
        Ok(outcome)
    }

    async fn register_permissions_to_role(
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
                .add_permissions(ctx, role_id, &permission_ids),
        )
        .await?;
        log_rejected("register_permissions_to_role", &outcome);
        Ok(outcome)
    }
}
