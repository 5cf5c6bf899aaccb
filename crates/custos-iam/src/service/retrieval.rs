//! Retrieval service: list and get for every entity, optionally hydrated.

use custos_core::context::UserContextProvider;
use custos_core::error::CustosResult;
use custos_core::models::account::{Account, AccountDetails};
use custos_core::models::group::{Group, GroupDetails};
use custos_core::models::permission::{Permission, PermissionDetails};
use custos_core::models::role::{Role, RoleDetails};
use custos_core::models::user::{User, UserDetails};
use custos_core::repository::{ListQuery, PaginatedResult, Repositories};
use uuid::Uuid;

use super::{RetrievalService, transact};
use crate::processor::{
    AccountProcessor, GroupProcessor, PermissionProcessor, Processors, RoleProcessor,
    UserProcessor,
};

/// Reads run in a transaction too, so they never observe a half-applied
/// mutation.
#[derive(Clone)]
pub struct Retrieval<R: Repositories> {
    repos: R,
    processors: Processors<R>,
}

impl<R: Repositories> Retrieval<R> {
    pub fn new(repos: R, processors: Processors<R>) -> Self {
        Self { repos, processors }
    }
}

impl<R: Repositories> RetrievalService for Retrieval<R> {
    async fn list_accounts(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Account>> {
        transact(&self.repos, ctx, self.processors.accounts.list(ctx, query)).await
    }

    async fn get_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<AccountDetails> {
        transact(
            &self.repos,
            ctx,
            self.processors.accounts.get(ctx, account_id, hydrate),
        )
        .await
    }

    async fn list_users(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<User>> {
        transact(&self.repos, ctx, self.processors.users.list(ctx, query)).await
    }

    async fn get_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<UserDetails> {
        transact(
            &self.repos,
            ctx,
            self.processors.users.get(ctx, user_id, hydrate),
        )
        .await
    }

    async fn list_groups(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Group>> {
        transact(&self.repos, ctx, self.processors.groups.list(ctx, query)).await
    }

    async fn get_group(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<GroupDetails> {
        transact(
            &self.repos,
            ctx,
            self.processors.groups.get(ctx, group_id, hydrate),
        )
        .await
    }

    async fn list_roles(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Role>> {
        transact(&self.repos, ctx, self.processors.roles.list(ctx, query)).await
    }

    async fn get_role(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<RoleDetails> {
        transact(
            &self.repos,
            ctx,
            self.processors.roles.get(ctx, role_id, hydrate),
        )
        .await
    }

    async fn list_permissions(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Permission>> {
        transact(&self.repos, ctx, self.processors.permissions.list(ctx, query)).await
    }

    async fn get_permission(
        &self,
        ctx: &UserContextProvider,
        permission_id: Uuid,
        hydrate: bool,
    ) -> CustosResult<PermissionDetails> {
        transact(
            &self.repos,
            ctx,
            self.processors.permissions.get(ctx, permission_id, hydrate),
        )
        .await
    }
}
