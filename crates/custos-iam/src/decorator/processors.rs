//! The authorization and logging wrappers over the domain processors.
//!
//! `Authorized` carries the resource permission checks of every processor
//! method that acts for the caller. Methods the services call on their
//! own behalf (record creation, system seeding, self-deletion) pass
//! straight through.

use custos_core::context::UserContextProvider;
use custos_core::error::CustosResult;
use custos_core::models::account::{Account, AccountDetails, CreateAccount, UpdateAccount};
use custos_core::models::credential::BasicAuthCredential;
use custos_core::models::group::{CreateGroup, Group, GroupDetails, UpdateGroup};
use custos_core::models::permission::{
    Action, CreatePermission, Permission, PermissionDetails, ResourceType, UpdatePermission,
};
use custos_core::models::role::{CreateRole, Role, RoleDetails, UpdateRole};
use custos_core::models::user::{NewUser, RegisterUser, UpdateUser, User, UserDetails};
use custos_core::outcome::BulkOutcome;
use custos_core::repository::{ListQuery, PaginatedResult, Repositories};
use uuid::Uuid;

use super::logging::{with_result, without_result};
use super::{Authorized, Logged};
use crate::defaults::SystemRoles;
use crate::processor::{
    AccountProcessor, GroupProcessor, PermissionProcessor, RoleProcessor, UserProcessor,
};

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

impl<S, R: Repositories> Authorized<S, R> {
    async fn permit(
        &self,
        ctx: &UserContextProvider,
        action: Action,
        resource_type: ResourceType,
        resource_id: Option<Uuid>,
    ) -> CustosResult<()> {
        self.authz()
            .authorize(ctx, action, resource_type, resource_id)
            .await
    }
}

impl<S: AccountProcessor, R: Repositories> AccountProcessor for Authorized<S, R> {
    async fn create(&self, creator: Uuid, input: CreateAccount) -> CustosResult<Account> {
        self.inner().create(creator, input).await
    }

    async fn seed_system_roles(&self, account_id: Uuid, owner: Uuid) -> CustosResult<SystemRoles> {
        self.inner().seed_system_roles(account_id, owner).await
    }

    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateAccount,
    ) -> CustosResult<Account> {
        self.permit(ctx, Action::Update, ResourceType::Account, Some(id))
            .await?;
        self.inner().update(ctx, id, input).await
    }

    async fn delete(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        self.permit(ctx, Action::Delete, ResourceType::Account, Some(id))
            .await?;
        self.inner().delete(ctx, id).await
    }

    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<AccountDetails> {
        self.inner().get(ctx, id, hydrate).await
    }

    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Account>> {
        self.inner().list(ctx, query).await
    }

    /// Users may always remove themselves; removing others takes `Delete`
    /// on the user.
    async fn remove_user(&self, ctx: &UserContextProvider, user_id: Uuid) -> CustosResult<()> {
        if !self.authz().is_authorized_for_own_user(ctx, user_id) {
            self.permit(ctx, Action::Delete, ResourceType::User, Some(user_id))
                .await?;
        }
        self.inner().remove_user(ctx, user_id).await
    }
}

impl<S: UserProcessor, R: Repositories> UserProcessor for Authorized<S, R> {
    async fn create(&self, input: NewUser) -> CustosResult<User> {
        self.inner().create(input).await
    }

    async fn create_credential(
        &self,
        user_id: Uuid,
        password: &str,
    ) -> CustosResult<BasicAuthCredential> {
        self.inner().create_credential(user_id, password).await
    }

    async fn register_in_account(
        &self,
        ctx: &UserContextProvider,
        input: RegisterUser,
    ) -> CustosResult<User> {
        self.permit(ctx, Action::Create, ResourceType::User, None)
            .await?;
        self.inner().register_in_account(ctx, input).await
    }

    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateUser,
    ) -> CustosResult<User> {
        if !self.authz().is_authorized_for_own_user(ctx, id) {
            self.permit(ctx, Action::Update, ResourceType::User, Some(id))
                .await?;
        }
        self.inner().update(ctx, id, input).await
    }

    async fn delete(&self, id: Uuid) -> CustosResult<()> {
        self.inner().delete(id).await
    }

    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<UserDetails> {
        self.permit(ctx, Action::Read, ResourceType::User, Some(id))
            .await?;
        self.inner().get(ctx, id, hydrate).await
    }

    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<User>> {
        self.permit(ctx, Action::Read, ResourceType::User, None)
            .await?;
        self.inner().list(ctx, query).await
    }

    async fn assign_roles(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        self.permit(ctx, Action::Update, ResourceType::User, Some(user_id))
            .await?;
        self.inner().assign_roles(ctx, user_id, role_ids).await
    }

    async fn remove_roles(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        self.permit(ctx, Action::Update, ResourceType::User, Some(user_id))
            .await?;
        self.inner().remove_roles(ctx, user_id, role_ids).await
    }
}

impl<S: GroupProcessor, R: Repositories> GroupProcessor for Authorized<S, R> {
    async fn create(&self, ctx: &UserContextProvider, input: CreateGroup) -> CustosResult<Group> {
        self.permit(ctx, Action::Create, ResourceType::Group, None)
            .await?;
        self.inner().create(ctx, input).await
    }

    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateGroup,
    ) -> CustosResult<Group> {
        self.permit(ctx, Action::Update, ResourceType::Group, Some(id))
            .await?;
        self.inner().update(ctx, id, input).await
    }

    async fn delete(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        self.permit(ctx, Action::Delete, ResourceType::Group, Some(id))
            .await?;
        self.inner().delete(ctx, id).await
    }

    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<GroupDetails> {
        self.permit(ctx, Action::Read, ResourceType::Group, Some(id))
            .await?;
        self.inner().get(ctx, id, hydrate).await
    }

    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Group>> {
        self.permit(ctx, Action::Read, ResourceType::Group, None)
            .await?;
        self.inner().list(ctx, query).await
    }

    async fn add_users(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        self.permit(ctx, Action::Update, ResourceType::Group, Some(group_id))
            .await?;
        self.inner().add_users(ctx, group_id, user_ids).await
    }

    async fn remove_users(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        self.permit(ctx, Action::Update, ResourceType::Group, Some(group_id))
            .await?;
        self.inner().remove_users(ctx, group_id, user_ids).await
    }

    async fn add_roles(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        self.permit(ctx, Action::Update, ResourceType::Group, Some(group_id))
            .await?;
        self.inner().add_roles(ctx, group_id, role_ids).await
    }

    async fn remove_roles(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        self.permit(ctx, Action::Update, ResourceType::Group, Some(group_id))
            .await?;
        self.inner().remove_roles(ctx, group_id, role_ids).await
    }
}

impl<S: RoleProcessor, R: Repositories> RoleProcessor for Authorized<S, R> {
    async fn create(&self, ctx: &UserContextProvider, input: CreateRole) -> CustosResult<Role> {
        self.permit(ctx, Action::Create, ResourceType::Role, None)
            .await?;
        self.inner().create(ctx, input).await
    }

    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateRole,
    ) -> CustosResult<Role> {
        self.permit(ctx, Action::Update, ResourceType::Role, Some(id))
            .await?;
        self.inner().update(ctx, id, input).await
    }

    async fn delete(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        self.permit(ctx, Action::Delete, ResourceType::Role, Some(id))
            .await?;
        self.inner().delete(ctx, id).await
    }

    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<RoleDetails> {
        self.permit(ctx, Action::Read, ResourceType::Role, Some(id))
            .await?;
        self.inner().get(ctx, id, hydrate).await
    }

    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Role>> {
        self.permit(ctx, Action::Read, ResourceType::Role, None)
            .await?;
        self.inner().list(ctx, query).await
    }

    async fn add_permissions(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        self.permit(ctx, Action::Update, ResourceType::Role, Some(role_id))
            .await?;
        self.inner().add_permissions(ctx, role_id, permission_ids).await
    }

    async fn remove_permissions(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        self.permit(ctx, Action::Update, ResourceType::Role, Some(role_id))
            .await?;
        self.inner()
            .remove_permissions(ctx, role_id, permission_ids)
            .await
    }
}

impl<S: PermissionProcessor, R: Repositories> PermissionProcessor for Authorized<S, R> {
    async fn create(
        &self,
        ctx: &UserContextProvider,
        input: CreatePermission,
    ) -> CustosResult<Permission> {
        self.permit(ctx, Action::Create, ResourceType::Permission, None)
            .await?;
        self.inner().create(ctx, input).await
    }

    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdatePermission,
    ) -> CustosResult<Permission> {
        self.permit(ctx, Action::Update, ResourceType::Permission, Some(id))
            .await?;
        self.inner().update(ctx, id, input).await
    }

    async fn delete(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        self.permit(ctx, Action::Delete, ResourceType::Permission, Some(id))
            .await?;
        self.inner().delete(ctx, id).await
    }

    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<PermissionDetails> {
        self.permit(ctx, Action::Read, ResourceType::Permission, Some(id))
            .await?;
        self.inner().get(ctx, id, hydrate).await
    }

    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Permission>> {
        self.permit(ctx, Action::Read, ResourceType::Permission, None)
            .await?;
        self.inner().list(ctx, query).await
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

impl<S: AccountProcessor> AccountProcessor for Logged<S> {
    async fn create(&self, creator: Uuid, input: CreateAccount) -> CustosResult<Account> {
        with_result("account.create", self.inner().create(creator, input)).await
    }

    async fn seed_system_roles(&self, account_id: Uuid, owner: Uuid) -> CustosResult<SystemRoles> {
        without_result(
            "account.seed_system_roles",
            self.inner().seed_system_roles(account_id, owner),
        )
        .await
    }

    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateAccount,
    ) -> CustosResult<Account> {
        with_result("account.update", self.inner().update(ctx, id, input)).await
    }

    async fn delete(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        without_result("account.delete", self.inner().delete(ctx, id)).await
    }

    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<AccountDetails> {
        with_result("account.get", self.inner().get(ctx, id, hydrate)).await
    }

    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Account>> {
        with_result("account.list", self.inner().list(ctx, query)).await
    }

    async fn remove_user(&self, ctx: &UserContextProvider, user_id: Uuid) -> CustosResult<()> {
        without_result("account.remove_user", self.inner().remove_user(ctx, user_id)).await
    }
}

impl<S: UserProcessor> UserProcessor for Logged<S> {
    async fn create(&self, input: NewUser) -> CustosResult<User> {
        with_result("user.create", self.inner().create(input)).await
    }

    async fn create_credential(
        &self,
        user_id: Uuid,
        password: &str,
    ) -> CustosResult<BasicAuthCredential> {
        without_result(
            "user.create_credential",
            self.inner().create_credential(user_id, password),
        )
        .await
    }

    async fn register_in_account(
        &self,
        ctx: &UserContextProvider,
        input: RegisterUser,
    ) -> CustosResult<User> {
        with_result(
            "user.register_in_account",
            self.inner().register_in_account(ctx, input),
        )
        .await
    }

    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateUser,
    ) -> CustosResult<User> {
        with_result("user.update", self.inner().update(ctx, id, input)).await
    }

    async fn delete(&self, id: Uuid) -> CustosResult<()> {
        without_result("user.delete", self.inner().delete(id)).await
    }

    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<UserDetails> {
        with_result("user.get", self.inner().get(ctx, id, hydrate)).await
    }

    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<User>> {
        with_result("user.list", self.inner().list(ctx, query)).await
    }

    async fn assign_roles(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "user.assign_roles",
            self.inner().assign_roles(ctx, user_id, role_ids),
        )
        .await
    }

    async fn remove_roles(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "user.remove_roles",
            self.inner().remove_roles(ctx, user_id, role_ids),
        )
        .await
    }
}

impl<S: GroupProcessor> GroupProcessor for Logged<S> {
    async fn create(&self, ctx: &UserContextProvider, input: CreateGroup) -> CustosResult<Group> {
        with_result("group.create", self.inner().create(ctx, input)).await
    }

    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateGroup,
    ) -> CustosResult<Group> {
        with_result("group.update", self.inner().update(ctx, id, input)).await
    }

    async fn delete(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        without_result("group.delete", self.inner().delete(ctx, id)).await
    }

    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<GroupDetails> {
        with_result("group.get", self.inner().get(ctx, id, hydrate)).await
    }

    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Group>> {
        with_result("group.list", self.inner().list(ctx, query)).await
    }

    async fn add_users(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "group.add_users",
            self.inner().add_users(ctx, group_id, user_ids),
        )
        .await
    }

    async fn remove_users(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "group.remove_users",
            self.inner().remove_users(ctx, group_id, user_ids),
        )
        .await
    }

    async fn add_roles(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "group.add_roles",
            self.inner().add_roles(ctx, group_id, role_ids),
        )
        .await
    }

    async fn remove_roles(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "group.remove_roles",
            self.inner().remove_roles(ctx, group_id, role_ids),
        )
        .await
    }
}

impl<S: RoleProcessor> RoleProcessor for Logged<S> {
    async fn create(&self, ctx: &UserContextProvider, input: CreateRole) -> CustosResult<Role> {
        with_result("role.create", self.inner().create(ctx, input)).await
    }

    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateRole,
    ) -> CustosResult<Role> {
        with_result("role.update", self.inner().update(ctx, id, input)).await
    }

    async fn delete(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        without_result("role.delete", self.inner().delete(ctx, id)).await
    }

    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<RoleDetails> {
        with_result("role.get", self.inner().get(ctx, id, hydrate)).await
    }

    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Role>> {
        with_result("role.list", self.inner().list(ctx, query)).await
    }

    async fn add_permissions(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "role.add_permissions",
            self.inner().add_permissions(ctx, role_id, permission_ids),
        )
        .await
    }

    async fn remove_permissions(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        with_result(
            "role.remove_permissions",
            self.inner().remove_permissions(ctx, role_id, permission_ids),
        )
        .await
    }
}

impl<S: PermissionProcessor> PermissionProcessor for Logged<S> {
    async fn create(
        &self,
        ctx: &UserContextProvider,
        input: CreatePermission,
    ) -> CustosResult<Permission> {
        with_result("permission.create", self.inner().create(ctx, input)).await
    }

    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdatePermission,
    ) -> CustosResult<Permission> {
        with_result("permission.update", self.inner().update(ctx, id, input)).await
    }

    async fn delete(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        without_result("permission.delete", self.inner().delete(ctx, id)).await
    }

    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<PermissionDetails> {
        with_result("permission.get", self.inner().get(ctx, id, hydrate)).await
    }

    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Permission>> {
        with_result("permission.list", self.inner().list(ctx, query)).await
    }
}
