//! Logging wrapper: one line before and one after every call.

use custos_auth::service::{AuthenticationService, SignIn, SignInOutput};
use custos_core::context::{UserContext, UserContextProvider};
use custos_core::error::CustosResult;
use custos_core::models::account::{Account, AccountDetails, CreateAccount, UpdateAccount};
use custos_core::models::group::{CreateGroup, Group, GroupDetails, UpdateGroup};
use custos_core::models::permission::{
    CreatePermission, Permission, PermissionDetails, UpdatePermission,
};
use custos_core::models::role::{CreateRole, Role, RoleDetails, UpdateRole};
use custos_core::models::user::{RegisterUser, UpdateUser, User, UserDetails};
use custos_core::outcome::BulkOutcome;
use custos_core::repository::{ListQuery, PaginatedResult};
use serde::Serialize;
use tracing::{info, trace, warn};
use uuid::Uuid;

use crate::service::{
    DeregistrationService, ModificationService, RegistrationService, RetrievalService,
};

/// Logs every call before and after it runs. Errors pass through as is.
#[derive(Clone)]
pub struct Logged<S> {
    inner: S,
}

impl<S> Logged<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

/// Logs the outcome including the serialized result.
pub(super) async fn with_result<T: Serialize>(
    operation: &'static str,
    call: impl Future<Output = CustosResult<T>>,
) -> CustosResult<T> {
    trace!(operation, "invoking");
    let result = call.await;
    match &result {
        Ok(value) => match serde_json::to_string(value) {
            Ok(value) => info!(operation, result = %value, "completed"),
            Err(err) => warn!(operation, error = %err, "completed, result not serializable"),
        },
        Err(err) => warn!(operation, error = %err, "failed"),
    }
    result
}

pub(super) async fn without_result<T>(
    operation: &'static str,
    call: impl Future<Output = CustosResult<T>>,
) -> CustosResult<T> {
    trace!(operation, "invoking");
    let result = call.await;
    match &result {
        Ok(_) => info!(operation, "completed"),
        Err(err) => warn!(operation, error = %err, "failed"),
    }
    result
}

impl<S: RegistrationService> RegistrationService for Logged<S> {
    async fn register_user(&self, ctx: &UserContextProvider, input: RegisterUser) -> CustosResult<User> {
        with_result("register_user", self.inner.register_user(ctx, input)).await
    }

    async fn register_account(
        &self,
        ctx: &UserContextProvider,
        input: CreateAccount,
    ) -> CustosResult<Account> {
        with_result("register_account", self.inner.register_account(ctx, input)).await
    }

    async fn register_user_with_account(
        &self,
        ctx: &UserContextProvider,
        input: RegisterUser,
    ) -> CustosResult<User> {
        with_result(
            "register_user_with_account",
            self.inner.register_user_with_account(ctx, input),
        )
        .await
    }

    async fn register_group(&self, ctx: &UserContextProvider, input: CreateGroup) -> CustosResult<Group> {
        with_result("register_group", self.inner.register_group(ctx, input)).await
    }

    async fn register_role(&self, ctx: &UserContextProvider, input: CreateRole) -> CustosResult<Role> {
        with_result("register_role", self.inner.register_role(ctx, input)).await
    }

    async fn register_permission(
        &self,
        ctx: &UserContextProvider,
        input: CreatePermission,
    ) -> CustosResult<Permission> {
        with_result("register_permission", self.inner.register_permission(ctx, input)).await
    }

    async fn register_users_to_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "register_users_to_group",
            self.inner.register_users_to_group(ctx, group_id, user_ids),
        )
        .await
    }

    async fn register_roles_to_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "register_roles_to_group",
            self.inner.register_roles_to_group(ctx, group_id, role_ids),
        )
        .await
    }

    async fn register_roles_to_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "register_roles_to_user",
            self.inner.register_roles_to_user(ctx, user_id, role_ids),
        )
        .await
    }

    async fn register_permissions_to_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "register_permissions_to_role",
            self.inner
                .register_permissions_to_role(ctx, role_id, permission_ids),
        )
        .await
    }
}

impl<S: DeregistrationService> DeregistrationService for Logged<S> {
    async fn deregister_user(&self, ctx: &UserContextProvider, user_id: Uuid) -> CustosResult<()> {
        without_result("deregister_user", self.inner.deregister_user(ctx, user_id)).await
    }

    async fn deregister_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
    ) -> CustosResult<()> {
        without_result(
            "deregister_account",
            self.inner.deregister_account(ctx, account_id),
        )
        .await
    }

    async fn deregister_user_from_account(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
    ) -> CustosResult<()> {
        without_result(
            "deregister_user_from_account",
            self.inner.deregister_user_from_account(ctx, user_id),
        )
        .await
    }

    async fn deregister_users_from_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "deregister_users_from_group",
            self.inner.deregister_users_from_group(ctx, group_id, user_ids),
        )
        .await
    }

    async fn deregister_roles_from_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "deregister_roles_from_group",
            self.inner.deregister_roles_from_group(ctx, group_id, role_ids),
        )
        .await
    }

    async fn deregister_roles_from_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "deregister_roles_from_user",
            self.inner.deregister_roles_from_user(ctx, user_id, role_ids),
        )
        .await
    }

    async fn deregister_permissions_from_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "deregister_permissions_from_role",
            self.inner
                .deregister_permissions_from_role(ctx, role_id, permission_ids),
        )
        .await
    }

    async fn deregister_group(&self, ctx: &UserContextProvider, group_id: Uuid) -> CustosResult<()> {
        without_result("deregister_group", self.inner.deregister_group(ctx, group_id)).await
    }

    async fn deregister_role(&self, ctx: &UserContextProvider, role_id: Uuid) -> CustosResult<()> {
        without_result("deregister_role", self.inner.deregister_role(ctx, role_id)).await
    }

    async fn deregister_permission(
        &self,
        ctx: &UserContextProvider,
        permission_id: Uuid,
    ) -> CustosResult<()> {
        without_result(
            "deregister_permission",
            self.inner.deregister_permission(ctx, permission_id),
        )
        .await
    }
}

impl<S: ModificationService> ModificationService for Logged<S> {
    async fn modify_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
        input: UpdateAccount,
    ) -> CustosResult<Account> {
        with_result(
            "modify_account",
            self.inner.modify_account(ctx, account_id, input),
        )
        .await
    }

    async fn modify_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        input: UpdateUser,
    ) -> CustosResult<User> {
        with_result("modify_user", self.inner.modify_user(ctx, user_id, input)).await
    }

    async fn modify_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        input: UpdateGroup,
    ) -> CustosResult<Group> {
        with_result("modify_group", self.inner.modify_group(ctx, group_id, input)).await
    }

    async fn modify_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        input: UpdateRole,
    ) -> CustosResult<Role> {
        with_result("modify_role", self.inner.modify_role(ctx, role_id, input)).await
    }

    async fn modify_permission(
        &self,
        ctx: &UserContextProvider,
        permission_id: Uuid,
        input: UpdatePermission,
    ) -> CustosResult<Permission> {
        with_result(
            "modify_permission",
            self.inner.modify_permission(ctx, permission_id, input),
        )
        .await
    }
}

impl<S: RetrievalService> RetrievalService for Logged<S> {
    async fn list_accounts(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Account>> {
        with_result("list_accounts", self.inner.list_accounts(ctx, query)).await
    }

    async fn get_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<AccountDetails> {
        with_result(
            "get_account",
            self.inner.get_account(ctx, account_id, hydrate),
        )
        .await
    }

    async fn list_users(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<User>> {
        with_result("list_users", self.inner.list_users(ctx, query)).await
    }

    async fn get_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<UserDetails> {
        with_result("get_user", self.inner.get_user(ctx, user_id, hydrate)).await
    }

    async fn list_groups(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Group>> {
        with_result("list_groups", self.inner.list_groups(ctx, query)).await
    }

    async fn get_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<GroupDetails> {
        with_result("get_group", self.inner.get_group(ctx, group_id, hydrate)).await
    }

    async fn list_roles(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Role>> {
        with_result("list_roles", self.inner.list_roles(ctx, query)).await
    }

    async fn get_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<RoleDetails> {
        with_result("get_role", self.inner.get_role(ctx, role_id, hydrate)).await
    }

    async fn list_permissions(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Permission>> {
        with_result("list_permissions", self.inner.list_permissions(ctx, query)).await
    }

    async fn get_permission(
        &self,
        ctx: &UserContextProvider,
        permission_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<PermissionDetails> {
        with_result(
            "get_permission",
            self.inner.get_permission(ctx, permission_id, hydrate),
        )
        .await
    }
}

impl<S: AuthenticationService> AuthenticationService for Logged<S> {
    async fn sign_in(&self, ctx: &UserContextProvider, input: SignIn) -> CustosResult<SignInOutput> {
        with_result("sign_in", self.inner.sign_in(ctx, input)).await
    }

    async fn sign_out(&self, ctx: &UserContextProvider, token_id: Uuid) -> CustosResult<()> {
        without_result("sign_out", self.inner.sign_out(ctx, token_id)).await
    }

    async fn sign_out_all(&self, ctx: &UserContextProvider) -> CustosResult<u64> {
        with_result("sign_out_all", self.inner.sign_out_all(ctx)).await
    }

    async fn switch_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
    ) -> CustosResult<SignInOutput> {
        with_result("switch_account", self.inner.switch_account(ctx, account_id)).await
    }

    async fn resume_session(
        &self,
        ctx: &UserContextProvider,
        token: &str,
    ) -> CustosResult<UserContext> {
        with_result("resume_session", self.inner.resume_session(ctx, token)).await
    }
}
