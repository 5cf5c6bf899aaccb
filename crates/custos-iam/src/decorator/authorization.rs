//! Authorization wrapper: checks the ambient context before calling
//! inward.

use custos_auth::service::{AuthenticationService, SignIn, SignInOutput};
use custos_core::context::{UserContext, UserContextProvider};
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
use tracing::debug;
use uuid::Uuid;

use crate::authorization::AuthorizationProvider;
use crate::service::{
    DeregistrationService, ModificationService, RegistrationService, RetrievalService,
};

/// Gates each call on one ambient-context predicate. Resource permissions
/// are checked further in, by the processors.
#[derive(Clone)]
pub struct Authorized<S, R> {
    inner: S,
    authz: AuthorizationProvider<R>,
}

impl<S, R: Repositories> Authorized<S, R> {
    pub fn new(inner: S, authz: AuthorizationProvider<R>) -> Self {
        Self { inner, authz }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub(crate) fn authz(&self) -> &AuthorizationProvider<R> {
        &self.authz
    }

    fn require_user(&self, ctx: &UserContextProvider, operation: &str) -> CustosResult<()> {
        if self.authz.has_user_context(ctx) {
            return Ok(());
        }
        debug!(operation, "denied: no user context");
        Err(CustosError::unauthorized(format!(
            "{operation} requires a signed-in user"
        )))
    }

    /// The membership lookup runs in its own unit of work, so it never
    /// observes another caller's uncommitted changes.
    async fn require_account(&self, ctx: &UserContextProvider, operation: &str) -> CustosResult<()> {
        let tx = self
            .authz
            .repos()
            .unit_of_work()
            .begin(ctx.cancellation())
            .await?;
        let verified = self.authz.has_account_context_verified(ctx).await;
        if finish(tx, verified).await? {
            return Ok(());
        }
        debug!(operation, "denied: no account context");
        Err(CustosError::unauthorized(format!(
            "{operation} requires a selected account"
        )))
    }

    fn require_own_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        operation: &str,
    ) -> CustosResult<()> {
        if self.authz.is_authorized_for_own_user(ctx, user_id) {
            return Ok(());
        }
        debug!(operation, %user_id, "denied: not the caller's own user");
        Err(CustosError::unauthorized(format!(
            "{operation} is only allowed on your own user"
        )))
    }
}

impl<S: RegistrationService, R: Repositories> RegistrationService for Authorized<S, R> {
    async fn register_user(&self, ctx: &UserContextProvider, input: RegisterUser) -> CustosResult<User> {
        self.inner.register_user(ctx, input).await
    }

    async fn register_account(
        &self,
        ctx: &UserContextProvider,
        input: CreateAccount,
    ) -> CustosResult<Account> {
        self.require_user(ctx, "register_account")?;
        self.inner.register_account(ctx, input).await
    }

    async fn register_user_with_account(
        &self,
        ctx: &UserContextProvider,
        input: RegisterUser,
    ) -> CustosResult<User> {
        self.require_account(ctx, "register_user_with_account").await?;
        self.inner.register_user_with_account(ctx, input).await
    }

    async fn register_group(&self, ctx: &UserContextProvider, input: CreateGroup) -> CustosResult<Group> {
        self.require_account(ctx, "register_group").await?;
        self.inner.register_group(ctx, input).await
    }

    async fn register_role(&self, ctx: &UserContextProvider, input: CreateRole) -> CustosResult<Role> {
        self.require_account(ctx, "register_role").await?;
        self.inner.register_role(ctx, input).await
    }

    async fn register_permission(
        &self,
        ctx: &UserContextProvider,
        input: CreatePermission,
    ) -> CustosResult<Permission> {
        self.require_account(ctx, "register_permission").await?;
        self.inner.register_permission(ctx, input).await
    }

    async fn register_users_to_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        self.require_account(ctx, "register_users_to_group").await?;
        self.inner.register_users_to_group(ctx, group_id, user_ids).await
    }

    async fn register_roles_to_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        self.require_account(ctx, "register_roles_to_group").await?;
        self.inner.register_roles_to_group(ctx, group_id, role_ids).await
    }

    async fn register_roles_to_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        self.require_account(ctx, "register_roles_to_user").await?;
        self.inner.register_roles_to_user(ctx, user_id, role_ids).await
    }

    async fn register_permissions_to_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        self.require_account(ctx, "register_permissions_to_role").await?;
        self.inner
            .register_permissions_to_role(ctx, role_id, permission_ids)
            .await
    }
}

impl<S: DeregistrationService, R: Repositories> DeregistrationService for Authorized<S, R> {
    async fn deregister_user(&self, ctx: &UserContextProvider, user_id: Uuid) -> CustosResult<()> {
        self.require_own_user(ctx, user_id, "deregister_user")?;
        self.inner.deregister_user(ctx, user_id).await
    }

    async fn deregister_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
    ) -> CustosResult<()> {
        self.require_account(ctx, "deregister_account").await?;
        self.inner.deregister_account(ctx, account_id).await
    }

    async fn deregister_user_from_account(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
    ) -> CustosResult<()> {
        self.require_account(ctx, "deregister_user_from_account").await?;
        self.inner.deregister_user_from_account(ctx, user_id).await
    }

    async fn deregister_users_from_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        self.require_account(ctx, "deregister_users_from_group").await?;
        self.inner
            .deregister_users_from_group(ctx, group_id, user_ids)
            .await
    }

    async fn deregister_roles_from_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        self.require_account(ctx, "deregister_roles_from_group").await?;
        self.inner
            .deregister_roles_from_group(ctx, group_id, role_ids)
            .await
    }

    async fn deregister_roles_from_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        self.require_account(ctx, "deregister_roles_from_user").await?;
        self.inner
            .deregister_roles_from_user(ctx, user_id, role_ids)
            .await
    }

    async fn deregister_permissions_from_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: Vec<Uuid>,
    ) -> CustosResult<BulkOutcome> {
        self.require_account(ctx, "deregister_permissions_from_role")
            .await?;
        self.inner
            .deregister_permissions_from_role(ctx, role_id, permission_ids)
            .await
    }

    async fn deregister_group(&self, ctx: &UserContextProvider, group_id: Uuid) -> CustosResult<()> {
        self.require_account(ctx, "deregister_group").await?;
        self.inner.deregister_group(ctx, group_id).await
    }

    async fn deregister_role(&self, ctx: &UserContextProvider, role_id: Uuid) -> CustosResult<()> {
        self.require_account(ctx, "deregister_role").await?;
        self.inner.deregister_role(ctx, role_id).await
    }

    async fn deregister_permission(
        &self,
        ctx: &UserContextProvider,
        permission_id: Uuid,
    ) -> CustosResult<()> {
        self.require_account(ctx, "deregister_permission").await?;
        self.inner.deregister_permission(ctx, permission_id).await
    }
}

impl<S: ModificationService, R: Repositories> ModificationService for Authorized<S, R> {
    async fn modify_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
        input: UpdateAccount,
    ) -> CustosResult<Account> {
        self.require_account(ctx, "modify_account").await?;
        self.inner.modify_account(ctx, account_id, input).await
    }

    async fn modify_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        input: UpdateUser,
    ) -> CustosResult<User> {
        self.require_user(ctx, "modify_user")?;
        self.inner.modify_user(ctx, user_id, input).await
    }

    async fn modify_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        input: UpdateGroup,
    ) -> CustosResult<Group> {
        self.require_account(ctx, "modify_group").await?;
        self.inner.modify_group(ctx, group_id, input).await
    }

    async fn modify_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        input: UpdateRole,
    ) -> CustosResult<Role> {
        self.require_account(ctx, "modify_role").await?;
        self.inner.modify_role(ctx, role_id, input).await
    }

    async fn modify_permission(
        &self,
        ctx: &UserContextProvider,
        permission_id: Uuid,
        input: UpdatePermission,
    ) -> CustosResult<Permission> {
        self.require_account(ctx, "modify_permission").await?;
        self.inner.modify_permission(ctx, permission_id, input).await
    }
}

impl<S: RetrievalService, R: Repositories> RetrievalService for Authorized<S, R> {
    async fn list_accounts(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Account>> {
        self.require_user(ctx, "list_accounts")?;
        self.inner.list_accounts(ctx, query).await
    }

    async fn get_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<AccountDetails> {
        self.require_user(ctx, "get_account")?;
        self.inner.get_account(ctx, account_id, hydrate).await
    }

    async fn list_users(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<User>> {
        self.require_account(ctx, "list_users").await?;
        self.inner.list_users(ctx, query).await
    }

    async fn get_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<UserDetails> {
        self.require_account(ctx, "get_user").await?;
        self.inner.get_user(ctx, user_id, hydrate).await
    }

    async fn list_groups(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Group>> {
        self.require_account(ctx, "list_groups").await?;
        self.inner.list_groups(ctx, query).await
    }

    async fn get_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<GroupDetails> {
        self.require_account(ctx, "get_group").await?;
        self.inner.get_group(ctx, group_id, hydrate).await
    }

    async fn list_roles(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Role>> {
        self.require_account(ctx, "list_roles").await?;
        self.inner.list_roles(ctx, query).await
    }

    async fn get_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<RoleDetails> {
        self.require_account(ctx, "get_role").await?;
        self.inner.get_role(ctx, role_id, hydrate).await
    }

    async fn list_permissions(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Permission>> {
        self.require_account(ctx, "list_permissions").await?;
        self.inner.list_permissions(ctx, query).await
    }

    async fn get_permission(
        &self,
        ctx: &UserContextProvider,
        permission_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<PermissionDetails> {
        self.require_account(ctx, "get_permission").await?;
        self.inner.get_permission(ctx, permission_id, hydrate).await
    }
}

impl<S: AuthenticationService, R: Repositories> AuthenticationService for Authorized<S, R> {
    async fn sign_in(&self, ctx: &UserContextProvider, input: SignIn) -> CustosResult<SignInOutput> {
        self.inner.sign_in(ctx, input).await
    }

    async fn sign_out(&self, ctx: &UserContextProvider, token_id: Uuid) -> CustosResult<()> {
        self.require_user(ctx, "sign_out")?;
        self.inner.sign_out(ctx, token_id).await
    }

    async fn sign_out_all(&self, ctx: &UserContextProvider) -> CustosResult<u64> {
        self.require_user(ctx, "sign_out_all")?;
        self.inner.sign_out_all(ctx).await
    }

    async fn switch_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
    ) -> CustosResult<SignInOutput> {
        self.require_user(ctx, "switch_account")?;
        self.inner.switch_account(ctx, account_id).await
    }

    async fn resume_session(
        &self,
        ctx: &UserContextProvider,
        token: &str,
    ) -> CustosResult<UserContext> {
        self.inner.resume_session(ctx, token).await
    }
}
