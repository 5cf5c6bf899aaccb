//! Orchestration services.
//!
//! Each service method opens one unit of work, runs one or more processor
//! calls inside it and commits on success or rolls back on failure.
//! Validation runs before the transaction begins.

mod deregistration;
mod modification;
mod registration;
mod retrieval;

use custos_core::context::UserContextProvider;
use custos_core::error::{CustosError, CustosResult};
use custos_core::models::account::{Account, AccountDetails, CreateAccount, UpdateAccount};
use custos_core::models::group::{CreateGroup, Group, GroupDetails, UpdateGroup};
use custos_core::models::permission::{
    CreatePermission, Permission, PermissionDetails, UpdatePermission,
};
use custos_core::models::role::{CreateRole, Role, RoleDetails, UpdateRole};
use custos_core::models::user::{RegisterUser, UpdateUser, User, UserDetails};
use custos_core::outcome::BulkOutcome;
use custos_core::repository::{ListQuery, PaginatedResult, Repositories, UnitOfWork, finish};
use tracing::warn;
use uuid::Uuid;
use validator::Validate;

pub use deregistration::Deregistration;
pub use modification::Modification;
pub use registration::Registration;
pub use retrieval::Retrieval;

pub(crate) fn validate(input: &impl Validate) -> CustosResult<()> {
    input.validate().map_err(|e| CustosError::Validation {
        message: e.to_string(),
    })
}

/// Runs `work` inside a fresh unit of work. `work` is not polled before
/// the transaction is open.
pub(crate) async fn transact<R: Repositories, T>(
    repos: &R,
    ctx: &UserContextProvider,
    work: impl Future<Output = CustosResult<T>>,
) -> CustosResult<T> {
    let tx = repos.unit_of_work().begin(ctx.cancellation()).await?;
    let result = work.await;
    finish(tx, result).await
}

pub(crate) fn log_rejected(operation: &'static str, outcome: &BulkOutcome) {
    if !outcome.invalid_ids.is_empty() {
        warn!(
            operation,
            applied = outcome.applied,
            invalid_ids = ?outcome.invalid_ids,
            "bulk request had invalid ids"
        );
    }
}

pub trait RegistrationService: Send + Sync {
    /// Anonymous sign-up: user plus basic-auth credential, atomically.
    fn register_user(
        &self,
        ctx: &UserContextProvider,
        input: RegisterUser,
    ) -> impl Future<Output = CustosResult<User>> + Send;

    /// Creates an account owned by the current user, seeded with the
    /// system roles and permissions.
    fn register_account(
        &self,
        ctx: &UserContextProvider,
        input: CreateAccount,
    ) -> impl Future<Output = CustosResult<Account>> + Send;

    /// Creates a user directly inside the current account.
    fn register_user_with_account(
        &self,
        ctx: &UserContextProvider,
        input: RegisterUser,
    ) -> impl Future<Output = CustosResult<User>> + Send;

    fn register_group(
        &self,
        ctx: &UserContextProvider,
        input: CreateGroup,
    ) -> impl Future<Output = CustosResult<Group>> + Send;

    fn register_role(
        &self,
        ctx: &UserContextProvider,
        input: CreateRole,
    ) -> impl Future<Output = CustosResult<Role>> + Send;

    fn register_permission(
        &self,
        ctx: &UserContextProvider,
        input: CreatePermission,
    ) -> impl Future<Output = CustosResult<Permission>> + Send;

    fn register_users_to_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: Vec<Uuid>,
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;

    fn register_roles_to_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;

    fn register_roles_to_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;

    fn register_permissions_to_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;
}

pub trait DeregistrationService: Send + Sync {
    /// Deletes a user. Clears the context when it belongs to that user.
    fn deregister_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    /// Deletes an account. Deselects it in the context when current.
    fn deregister_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    /// Removes one user from the current account.
    fn deregister_user_from_account(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    fn deregister_users_from_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: Vec<Uuid>,
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;

    fn deregister_roles_from_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;

    fn deregister_roles_from_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;

    fn deregister_permissions_from_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;

    fn deregister_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    fn deregister_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    fn deregister_permission(
        &self,
        ctx: &UserContextProvider,
        permission_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;
}

pub trait ModificationService: Send + Sync {
    fn modify_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
        input: UpdateAccount,
    ) -> impl Future<Output = CustosResult<Account>> + Send;

    fn modify_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = CustosResult<User>> + Send;

    fn modify_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        input: UpdateGroup,
    ) -> impl Future<Output = CustosResult<Group>> + Send;

    fn modify_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = CustosResult<Role>> + Send;

    fn modify_permission(
        &self,
        ctx: &UserContextProvider,
        permission_id: Uuid,
        input: UpdatePermission,
    ) -> impl Future<Output = CustosResult<Permission>> + Send;
}

/// Read access. `hydrate` fills the related collections of a detail view;
/// they stay `None` otherwise.
pub trait RetrievalService: Send + Sync {
    fn list_accounts(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Account>>> + Send;

    fn get_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
        hydrate: bool,
    ) -> impl Future<Output = CustosResult<AccountDetails>> + Send;

    fn list_users(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<User>>> + Send;

    fn get_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        hydrate: bool,
    ) -> impl Future<Output = CustosResult<UserDetails>> + Send;

    fn list_groups(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Group>>> + Send;

    fn get_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        hydrate: bool,
    ) -> impl Future<Output = CustosResult<GroupDetails>> + Send;

    fn list_roles(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Role>>> + Send;

    fn get_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        hydrate: bool,
    ) -> impl Future<Output = CustosResult<RoleDetails>> + Send;

    fn list_permissions(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Permission>>> + Send;

    fn get_permission(
        &self,
        ctx: &UserContextProvider,
        permission_id: Uuid,
        hydrate: bool,
    ) -> impl Future<Output = CustosResult<PermissionDetails>> + Send;
}
