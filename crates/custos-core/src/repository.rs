//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Account-scoped repositories
//! require an `account_id` parameter to enforce data isolation: an id
//! that exists in another account is reported as not found.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::CustosResult;
use crate::models::{
    account::{Account, CreateAccount, UpdateAccount},
    credential::BasicAuthCredential,
    group::{CreateGroup, Group, UpdateGroup},
    permission::{NewPermission, Permission, UpdatePermission},
    role::{NewRole, Role, UpdateRole},
    token::{AuthToken, CreateAuthToken},
    user::{NewUser, UpdateUser, User},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NameAsc,
    NameDesc,
    CreatedAsc,
    CreatedDesc,
}

/// Filter, order and page of a list query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    /// Case-insensitive substring match on the entity name.
    pub filter: Option<String>,
    pub order: SortOrder,
    pub pagination: Pagination,
}

impl ListQuery {
    pub fn page(offset: u64, limit: u64) -> Self {
        Self {
            pagination: Pagination { offset, limit },
            ..Self::default()
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

impl<T> PaginatedResult<T> {
    pub fn has_more(&self) -> bool {
        self.offset + (self.items.len() as u64) < self.total
    }
}

// ---------------------------------------------------------------------------
// Accounts & users (global scope)
// ---------------------------------------------------------------------------

pub trait AccountRepository: Send + Sync {
    fn create(&self, input: CreateAccount) -> impl Future<Output = CustosResult<Account>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CustosResult<Account>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateAccount,
    ) -> impl Future<Output = CustosResult<Account>> + Send;
    /// Deletes the account together with its groups, roles, permissions,
    /// memberships and tokens scoped to it.
    fn delete(&self, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;

    /// Accounts the user is a member of.
    fn list_for_user(
        &self,
        user_id: Uuid,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Account>>> + Send;
    fn get_user_accounts(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Account>>> + Send;

    /// Add a user to an account (creates a `belongs_to` edge).
    fn add_user(
        &self,
        account_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;
    /// Remove a user from an account, including the user's group
    /// memberships and direct role assignments inside that account.
    fn remove_user(
        &self,
        account_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;
    fn is_member(
        &self,
        account_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<bool>> + Send;
    fn list_users(
        &self,
        account_id: Uuid,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<User>>> + Send;
}

pub trait UserRepository: Send + Sync {
    fn create(&self, input: NewUser) -> impl Future<Output = CustosResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CustosResult<User>> + Send;
    fn get_by_username(&self, username: &str) -> impl Future<Output = CustosResult<User>> + Send;
    fn update(&self, id: Uuid, input: UpdateUser)
    -> impl Future<Output = CustosResult<User>> + Send;
    /// Atomically bumps the success counter and resets the failure streak.
    fn record_login_success(&self, id: Uuid) -> impl Future<Output = CustosResult<User>> + Send;
    /// Atomically bumps both failure counters.
    fn record_login_failure(&self, id: Uuid) -> impl Future<Output = CustosResult<User>> + Send;
    /// Deletes the user with its credential, tokens and every edge.
    fn delete(&self, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;
}

pub trait CredentialRepository: Send + Sync {
    fn create(
        &self,
        user_id: Uuid,
        password_hash: String,
    ) -> impl Future<Output = CustosResult<BasicAuthCredential>> + Send;
    fn get_by_user(
        &self,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<BasicAuthCredential>> + Send;
}

// ---------------------------------------------------------------------------
// Account-scoped repositories
// ---------------------------------------------------------------------------

pub trait GroupRepository: Send + Sync {
    fn create(
        &self,
        account_id: Uuid,
        input: CreateGroup,
    ) -> impl Future<Output = CustosResult<Group>> + Send;
    fn get_by_id(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<Group>> + Send;
    fn find_by_name(
        &self,
        account_id: Uuid,
        name: &str,
    ) -> impl Future<Output = CustosResult<Option<Group>>> + Send;
    fn update(
        &self,
        account_id: Uuid,
        id: Uuid,
        input: UpdateGroup,
    ) -> impl Future<Output = CustosResult<Group>> + Send;
    fn delete(&self, account_id: Uuid, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;
    fn list(
        &self,
        account_id: Uuid,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Group>>> + Send;

    /// Add a user to a group (creates a `member_of` edge).
    fn add_member(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;
    /// Remove a user from a group.
    fn remove_member(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;
    /// Get all members of a group.
    fn get_members(
        &self,
        account_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<User>>> + Send;
    /// Get all groups of the account a user belongs to.
    fn get_user_groups(
        &self,
        account_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Group>>> + Send;
}

pub trait RoleRepository: Send + Sync {
    fn create(&self, input: NewRole) -> impl Future<Output = CustosResult<Role>> + Send;
    fn get_by_id(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<Role>> + Send;
    fn find_by_name(
        &self,
        account_id: Uuid,
        name: &str,
    ) -> impl Future<Output = CustosResult<Option<Role>>> + Send;
    fn update(
        &self,
        account_id: Uuid,
        id: Uuid,
        input: UpdateRole,
    ) -> impl Future<Output = CustosResult<Role>> + Send;
    fn delete(&self, account_id: Uuid, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;
    fn list(
        &self,
        account_id: Uuid,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Role>>> + Send;

    /// Assign a role to a user (creates a `has_role` edge).
    fn assign_to_user(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;
    /// Remove a direct role assignment from a user.
    fn unassign_from_user(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;
    /// Get all roles of a user (direct + via group membership).
    fn get_user_roles(
        &self,
        account_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Role>>> + Send;
    /// Get the roles assigned directly to a user.
    fn get_direct_user_roles(
        &self,
        account_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Role>>> + Send;

    /// Assign a role to a group.
    fn assign_to_group(
        &self,
        account_id: Uuid,
        group_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;
    /// Remove a role assignment from a group.
    fn unassign_from_group(
        &self,
        account_id: Uuid,
        group_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;
    /// Get all roles assigned to a group.
    fn get_group_roles(
        &self,
        account_id: Uuid,
        group_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Role>>> + Send;

    /// Users holding the role directly.
    fn get_role_users(
        &self,
        account_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<User>>> + Send;
    /// Groups holding the role.
    fn get_role_groups(
        &self,
        account_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Group>>> + Send;
}

pub trait PermissionRepository: Send + Sync {
    fn create(&self, input: NewPermission)
    -> impl Future<Output = CustosResult<Permission>> + Send;
    fn get_by_id(
        &self,
        account_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = CustosResult<Permission>> + Send;
    fn find_by_name(
        &self,
        account_id: Uuid,
        name: &str,
    ) -> impl Future<Output = CustosResult<Option<Permission>>> + Send;
    fn update(
        &self,
        account_id: Uuid,
        id: Uuid,
        input: UpdatePermission,
    ) -> impl Future<Output = CustosResult<Permission>> + Send;
    fn delete(&self, account_id: Uuid, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;
    fn list(
        &self,
        account_id: Uuid,
        query: ListQuery,
    ) -> impl Future<Output = CustosResult<PaginatedResult<Permission>>> + Send;

    /// Grant a permission to a role (creates a `grants` edge).
    fn grant_to_role(
        &self,
        account_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;
    /// Revoke a permission from a role.
    fn revoke_from_role(
        &self,
        account_id: Uuid,
        role_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;
    /// Get all permissions granted to a role.
    fn get_role_permissions(
        &self,
        account_id: Uuid,
        role_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Permission>>> + Send;
    /// Get all roles a permission is granted to.
    fn get_permission_roles(
        &self,
        account_id: Uuid,
        permission_id: Uuid,
    ) -> impl Future<Output = CustosResult<Vec<Role>>> + Send;
}

pub trait TokenRepository: Send + Sync {
    fn create(&self, input: CreateAuthToken)
    -> impl Future<Output = CustosResult<AuthToken>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CustosResult<AuthToken>> + Send;
    /// Revoke a single token.
    fn revoke(&self, id: Uuid) -> impl Future<Output = CustosResult<()>> + Send;
    /// Revoke every outstanding token of a user; returns how many were revoked.
    fn revoke_user_tokens(&self, user_id: Uuid)
    -> impl Future<Output = CustosResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Unit of work
// ---------------------------------------------------------------------------

/// An open transaction. Dropping it without committing rolls it back.
pub trait Transaction: Send {
    /// Commits the transaction. A cancelled transaction is rolled back
    /// instead and reports [`crate::error::CustosError::Cancelled`].
    fn commit(self) -> impl Future<Output = CustosResult<()>> + Send;
    fn rollback(self) -> impl Future<Output = CustosResult<()>> + Send;
}

/// Demarcates atomic multi-step mutations.
///
/// Transactions are serialized: while one is open, `begin` waits. This is
/// what makes ownership check-then-remove sequences race free.
pub trait UnitOfWork: Send + Sync {
    type Transaction: Transaction;

    fn begin(
        &self,
        cancellation: &CancellationToken,
    ) -> impl Future<Output = CustosResult<Self::Transaction>> + Send;
}

/// Ends `tx` according to `result`: commit on success, rollback on failure.
/// A failed commit replaces the successful result.
pub async fn finish<T, X: Transaction>(tx: X, result: CustosResult<T>) -> CustosResult<T> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            tx.rollback().await?;
            Err(err)
        }
    }
}

/// Every repository a service needs, behind one type parameter.
pub trait Repositories: Clone + Send + Sync + 'static {
    type Accounts: AccountRepository;
    type Users: UserRepository;
    type Credentials: CredentialRepository;
    type Groups: GroupRepository;
    type Roles: RoleRepository;
    type Permissions: PermissionRepository;
    type Tokens: TokenRepository;
    type UnitOfWork: UnitOfWork;

    fn accounts(&self) -> &Self::Accounts;
    fn users(&self) -> &Self::Users;
    fn credentials(&self) -> &Self::Credentials;
    fn groups(&self) -> &Self::Groups;
    fn roles(&self) -> &Self::Roles;
    fn permissions(&self) -> &Self::Permissions;
    fn tokens(&self) -> &Self::Tokens;
    fn unit_of_work(&self) -> &Self::UnitOfWork;
}
