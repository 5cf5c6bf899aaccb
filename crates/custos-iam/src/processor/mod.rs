//! Domain processors: per-entity operations and entity-local invariants.
//!
//! Processors run inside the unit of work opened by the calling service
//! and never begin or end transactions themselves. Each one scopes its
//! lookups to the ambient account, so an id from another account is
//! reported as not found.
//!
//! Every processor trait is implemented by a concrete type here and by
//! the [`Authorized`](crate::decorator::Authorized) and
//! [`Logged`](crate::decorator::Logged) wrappers, which carry the
//! resource permission checks and the per-call logging.

mod account;
mod group;
mod permission;
mod role;
mod user;

use std::collections::HashSet;

use custos_core::context::UserContextProvider;
use custos_core::error::CustosResult;
use custos_core::models::account::{Account, AccountDetails, CreateAccount, UpdateAccount};
use custos_core::models::credential::BasicAuthCredential;
use custos_core::models::group::{CreateGroup, Group, GroupDetails, UpdateGroup};
use custos_core::models::permission::{
    CreatePermission, Permission, PermissionDetails, UpdatePermission,
};
use custos_core::models::role::{CreateRole, Role, RoleDetails, UpdateRole};
use custos_core::models::user::{NewUser, RegisterUser, UpdateUser, User, UserDetails};
use custos_core::outcome::{BulkOutcome, BulkPlan};
use custos_core::repository::{ListQuery, PaginatedResult, Repositories};
use uuid::Uuid;

use crate::defaults::SystemRoles;
use crate::stack::{Layered, layer};

pub use account::Accounts;
pub use group::Groups;
pub use permission::Permissions;
pub use role::Roles;
pub use user::Users;

pub trait AccountProcessor: Send + Sync {
    /// Creates the account with `creator` as its first member.
    fn create(
        &self,
        creator: Uuid,
        input: CreateAccount,
    ) -> impl Future<Output = CustosResult<Account>> + Send;

    /// Seeds the system roles and hands `Owner` to `owner`. Runs without
    /// any permission check.
    fn seed_system_roles(
        &self,
        account_id: Uuid,
        owner: Uuid,
    ) -> impl Future<Output = CustosResult<SystemRoles>> + Send;

    fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateAccount,
    ) -> impl Future<Output = CustosResult<Account>> + Send;

    fn delete(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> impl Future<Output = CustosResult<AccountDetails>> + Send;

    fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Account>>> + Send;

    /// Removes a user from the ambient account.
    fn remove_user(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;
}

pub trait UserProcessor: Send + Sync {
    fn create(&self, input: NewUser) -> impl Future<Output = CustosResult<User>> + Send;

    /// Hashes `password` and stores it as the user's basic-auth credential.
    fn create_credential(
        &self,
        user_id: Uuid,
        password: &str,
    ) -> impl Future<Output = CustosResult<BasicAuthCredential>> + Send;

    /// Creates a user with a credential directly inside the ambient account.
    fn register_in_account(
        &self,
        ctx: &UserContextProvider,
        input: RegisterUser,
    ) -> impl Future<Output = CustosResult<User>> + Send;

    fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateUser,
    ) -> impl Future<Output = CustosResult<User>> + Send;

    /// Deletes the user unless it is the sole owner of any of its accounts.
    fn delete(&self, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;

    fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> impl Future<Output = CustosResult<UserDetails>> + Send;

    fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<User>>> + Send;

    fn assign_roles(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;

    fn remove_roles(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;
}

pub trait GroupProcessor: Send + Sync {
    fn create(
        &self,
        ctx: &UserContextProvider,
        input: CreateGroup,
    ) -> impl Future<Output = CustosResult<Group>> + Send;

    fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateGroup,
    ) -> impl Future<Output = CustosResult<Group>> + Send;

    fn delete(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> impl Future<Output = CustosResult<GroupDetails>> + Send;

    fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Group>>> + Send;

    fn add_users(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;

    fn remove_users(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;

    fn add_roles(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: &[Uuid],
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;

    fn remove_roles(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: &[Uuid],
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;
}

pub trait RoleProcessor: Send + Sync {
    fn create(
        &self,
        ctx: &UserContextProvider,
        input: CreateRole,
    ) -> impl Future<Output = CustosResult<Role>> + Send;

    fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = CustosResult<Role>> + Send;

    fn delete(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> impl Future<Output = CustosResult<RoleDetails>> + Send;

    fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Role>>> + Send;

    fn add_permissions(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;

    fn remove_permissions(
        &self,
        ctx: &UserContextProvider,
        role_id: Uuid,
        permission_ids: &[Uuid],
    ) -> impl Future<Output = CustosResult<BulkOutcome>> + Send;
}

pub trait PermissionProcessor: Send + Sync {
    fn create(
        &self,
        ctx: &UserContextProvider,
        input: CreatePermission,
    ) -> impl Future<Output = CustosResult<Permission>> + Send;

    fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdatePermission,
    ) -> impl Future<Output = CustosResult<Permission>> + Send;

    fn delete(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> impl Future<Output = CustosResult<PermissionDetails>> + Send;

    fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Permission>>> + Send;
}

/// Every processor over one repository bundle, each behind the
/// authorization and logging wrappers.
#[derive(Clone)]
pub struct Processors<R: Repositories> {
    pub accounts: Layered<Accounts<R>, R>,
    pub users: Layered<Users<R>, R>,
    pub groups: Layered<Groups<R>, R>,
    pub roles: Layered<Roles<R>, R>,
    pub permissions: Layered<Permissions<R>, R>,
}

impl<R: Repositories> Processors<R> {
    /// `pepper` is mixed into every password hashed by the user processor.
    pub fn new(repos: R, pepper: Option<String>) -> Self {
        Self {
            accounts: layer(Accounts::new(repos.clone()), &repos),
            users: layer(Users::new(repos.clone(), pepper), &repos),
            groups: layer(Groups::new(repos.clone()), &repos),
            roles: layer(Roles::new(repos.clone()), &repos),
            permissions: layer(Permissions::new(repos.clone()), &repos),
        }
    }
}

/// `Ok(None)` for a not-found lookup, other errors pass through.
pub(crate) fn found<T>(result: CustosResult<T>) -> CustosResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_not_found() => Ok(None),
        Err(err) => Err(err),
    }
}

/// Drains every page of a list query.
pub(crate) async fn collect_all<T, F, Fut>(mut fetch: F) -> CustosResult<Vec<T>>
where
    F: FnMut(ListQuery) -> Fut,
    Fut: Future<Output = CustosResult<PaginatedResult<T>>>,
{
    let mut items = Vec::new();
    loop {
        let page = fetch(ListQuery::page(items.len() as u64, u64::MAX)).await?;
        let done = page.items.is_empty() || !page.has_more();
        items.extend(page.items);
        if done {
            return Ok(items);
        }
    }
}

/// Plans a bulk request. `accept` decides whether an id may be applied;
/// repeated ids are rejected after their first occurrence.
pub(crate) async fn plan_bulk<F, Fut>(ids: &[Uuid], mut accept: F) -> CustosResult<BulkPlan>
where
    F: FnMut(Uuid) -> Fut,
    Fut: Future<Output = CustosResult<bool>>,
{
    let mut plan = BulkPlan::default();
    let mut seen = HashSet::new();
    for &id in ids {
        if seen.insert(id) && accept(id).await? {
            plan.accept(id);
        } else {
            plan.reject(id);
        }
    }
    Ok(plan)
}
