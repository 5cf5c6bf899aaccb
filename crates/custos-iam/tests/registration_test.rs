//! Integration tests for registration and the bulk assignment protocol.

mod common;

use std::sync::{Arc, Mutex};

use custos_auth::{AuthConfig, password};
use custos_core::context::{UserContext, UserContextProvider};
use custos_core::error::{CustosError, CustosResult};
use custos_core::models::account::{Account, CreateAccount, UpdateAccount};
use custos_core::models::credential::BasicAuthCredential;
use custos_core::models::group::{CreateGroup, Group};
use custos_core::models::permission::{Action, ResourceType};
use custos_core::models::role::{CreateRole, NewRole, Role, UpdateRole};
use custos_core::models::user::{RegisterUser, User};
use custos_core::outcome::BulkStatus;
use custos_core::repository::{
    AccountRepository, CredentialRepository, ListQuery, PaginatedResult, Repositories,
    RoleRepository, UserRepository,
};
use custos_db::MemStore;
use custos_iam::defaults::{ADMINISTRATOR_ROLE, MEMBER_ROLE, OWNER_ROLE};
use custos_iam::{AuthorizationProvider, IamStack, OwnershipProcessor, RegistrationService};
use uuid::Uuid;

use common::{create_user, join, owned_account, role, stack};

fn sign_up(username: &str) -> RegisterUser {
    RegisterUser {
        username: username.into(),
        email: format!("{username}@example.com"),
        password: "correct-horse-battery".into(),
    }
}

// ---------------------------------------------------------------------------
// Fault injection: a store with one kind of write that always fails
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Fault {
    Credentials,
    Membership,
    OwnerAssignment,
}

fn injected(what: &str) -> CustosError {
    CustosError::Database(format!("{what} unavailable"))
}

#[derive(Clone)]
struct FailingCredentials {
    store: MemStore,
    fail: bool,
}

impl CredentialRepository for FailingCredentials {
    async fn create(&self, user_id: Uuid, hash: String) -> CustosResult<BasicAuthCredential> {
        if self.fail {
            return Err(injected("credential table"));
        }
        self.store.credentials().create(user_id, hash).await
    }

    async fn get_by_user(&self, user_id: Uuid) -> CustosResult<BasicAuthCredential> {
        self.store.credentials().get_by_user(user_id).await
    }
}

/// Fails `add_user` once the account row exists, remembering the account.
#[derive(Clone)]
struct FailingAccounts {
    store: MemStore,
    fail: bool,
    attempted: Arc<Mutex<Option<Uuid>>>,
}

impl AccountRepository for FailingAccounts {
    async fn create(&self, input: CreateAccount) -> CustosResult<Account> {
        self.store.accounts().create(input).await
    }

    async fn get_by_id(&self, id: Uuid) -> CustosResult<Account> {
        self.store.accounts().get_by_id(id).await
    }

    async fn update(&self, id: Uuid, input: UpdateAccount) -> CustosResult<Account> {
        self.store.accounts().update(id, input).await
    }

    async fn delete(&self, id: Uuid) -> CustosResult<()> {
        self.store.accounts().delete(id).await
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Account>> {
        self.store.accounts().list_for_user(user_id, query).await
    }

    async fn get_user_accounts(&self, user_id: Uuid) -> CustosResult<Vec<Account>> {
        self.store.accounts().get_user_accounts(user_id).await
    }

    async fn add_user(&self, account_id: Uuid, user_id: Uuid) -> CustosResult<()> {
        if self.fail {
            *self.attempted.lock().unwrap() = Some(account_id);
            return Err(injected("membership table"));
        }
        self.store.accounts().add_user(account_id, user_id).await
    }

    async fn remove_user(&self, account_id: Uuid, user_id: Uuid) -> CustosResult<()> {
        self.store.accounts().remove_user(account_id, user_id).await
    }

    async fn is_member(&self, account_id: Uuid, user_id: Uuid) -> CustosResult<bool> {
        self.store.accounts().is_member(account_id, user_id).await
    }

    async fn list_users(
        &self,
        account_id: Uuid,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<User>> {
        self.store.accounts().list_users(account_id, query).await
    }
}

/// Fails `assign_to_user` once the system roles exist, remembering the
/// account.
#[derive(Clone)]
struct FailingRoles {
    store: MemStore,
    fail: bool,
    attempted: Arc<Mutex<Option<Uuid>>>,
}

impl RoleRepository for FailingRoles {
    async fn create(&self, input: NewRole) -> CustosResult<Role> {
        self.store.roles().create(input).await
    }

    async fn get_by_id(&self, account_id: Uuid, id: Uuid) -> CustosResult<Role> {
        self.store.roles().get_by_id(account_id, id).await
    }

    async fn find_by_name(&self, account_id: Uuid, name: &str) -> CustosResult<Option<Role>> {
        self.store.roles().find_by_name(account_id, name).await
    }

    async fn update(&self, account_id: Uuid, id: Uuid, input: UpdateRole) -> CustosResult<Role> {
        self.store.roles().update(account_id, id, input).await
    }

    async fn delete(&self, account_id: Uuid, id: Uuid) -> CustosResult<()> {
        self.store.roles().delete(account_id, id).await
    }

    async fn list(&self, account_id: Uuid, query: ListQuery) -> CustosResult<PaginatedResult<Role>> {
        self.store.roles().list(account_id, query).await
    }

    async fn assign_to_user(&self, account_id: Uuid, user_id: Uuid, role_id: Uuid) -> CustosResult<()> {
        if self.fail {
            *self.attempted.lock().unwrap() = Some(account_id);
            return Err(injected("role assignment table"));
        }
        self.store.roles().assign_to_user(account_id, user_id, role_id).await
    }

    async fn unassign_from_user(
        &self,
        account_id: Uuid,
        user_id: Uuid,
        role_id: Uuid,
    ) -> CustosResult<()> {
        self.store
            .roles()
            .unassign_from_user(account_id, user_id, role_id)
            .await
    }

    async fn get_user_roles(&self, account_id: Uuid, user_id: Uuid) -> CustosResult<Vec<Role>> {
        self.store.roles().get_user_roles(account_id, user_id).await
    }

    async fn get_direct_user_roles(
        &self,
        account_id: Uuid,
        user_id: Uuid,
    ) -> CustosResult<Vec<Role>> {
        self.store
            .roles()
            .get_direct_user_roles(account_id, user_id)
            .await
    }

    async fn assign_to_group(
        &self,
        account_id: Uuid,
        group_id: Uuid,
        role_id: Uuid,
    ) -> CustosResult<()> {
        self.store
            .roles()
            .assign_to_group(account_id, group_id, role_id)
            .await
    }

    async fn unassign_from_group(
        &self,
        account_id: Uuid,
        group_id: Uuid,
        role_id: Uuid,
    ) -> CustosResult<()> {
        self.store
            .roles()
            .unassign_from_group(account_id, group_id, role_id)
            .await
    }

    async fn get_group_roles(&self, account_id: Uuid, group_id: Uuid) -> CustosResult<Vec<Role>> {
        self.store.roles().get_group_roles(account_id, group_id).await
    }

    async fn get_role_users(&self, account_id: Uuid, role_id: Uuid) -> CustosResult<Vec<User>> {
        self.store.roles().get_role_users(account_id, role_id).await
    }

    async fn get_role_groups(&self, account_id: Uuid, role_id: Uuid) -> CustosResult<Vec<Group>> {
        self.store.roles().get_role_groups(account_id, role_id).await
    }
}

#[derive(Clone)]
struct FailingStore {
    inner: MemStore,
    credentials: FailingCredentials,
    accounts: FailingAccounts,
    roles: FailingRoles,
    attempted: Arc<Mutex<Option<Uuid>>>,
}

impl FailingStore {
    fn new(store: &MemStore, fault: Fault) -> Self {
        let attempted = Arc::new(Mutex::new(None));
        Self {
            inner: store.clone(),
            credentials: FailingCredentials {
                store: store.clone(),
                fail: fault == Fault::Credentials,
            },
            accounts: FailingAccounts {
                store: store.clone(),
                fail: fault == Fault::Membership,
                attempted: attempted.clone(),
            },
            roles: FailingRoles {
                store: store.clone(),
                fail: fault == Fault::OwnerAssignment,
                attempted: attempted.clone(),
            },
            attempted,
        }
    }

    /// Account id seen by the failing write.
    fn attempted(&self) -> Uuid {
        self.attempted.lock().unwrap().unwrap()
    }
}

impl Repositories for FailingStore {
    type Accounts = FailingAccounts;
    type Users = <MemStore as Repositories>::Users;
    type Credentials = FailingCredentials;
    type Groups = <MemStore as Repositories>::Groups;
    type Roles = FailingRoles;
    type Permissions = <MemStore as Repositories>::Permissions;
    type Tokens = <MemStore as Repositories>::Tokens;
    type UnitOfWork = <MemStore as Repositories>::UnitOfWork;

    fn accounts(&self) -> &Self::Accounts {
        &self.accounts
    }

    fn users(&self) -> &Self::Users {
        self.inner.users()
    }

    fn credentials(&self) -> &Self::Credentials {
        &self.credentials
    }

    fn groups(&self) -> &Self::Groups {
        self.inner.groups()
    }

    fn roles(&self) -> &Self::Roles {
        &self.roles
    }

    fn permissions(&self) -> &Self::Permissions {
        self.inner.permissions()
    }

    fn tokens(&self) -> &Self::Tokens {
        self.inner.tokens()
    }

    fn unit_of_work(&self) -> &Self::UnitOfWork {
        self.inner.unit_of_work()
    }
}

// ---------------------------------------------------------------------------
// User registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_user_stores_hashed_credential() {
    let store = MemStore::default();
    let stack = stack(&store);
    let ctx = UserContextProvider::anonymous();

    let user = stack
        .registration
        .register_user(&ctx, sign_up("alice"))
        .await
        .unwrap();

    let credential = store.credentials().get_by_user(user.id).await.unwrap();
    assert!(credential.password_hash.starts_with("$argon2id$"));
    assert!(
        password::verify_password("correct-horse-battery", &credential.password_hash, None)
            .unwrap()
    );
    assert_eq!(store.transaction_stats().committed, 1);
}

#[tokio::test]
async fn register_user_rejects_duplicate_username() {
    let store = MemStore::default();
    let stack = stack(&store);
    create_user(&store, "alice").await;

    let err = stack
        .registration
        .register_user(&UserContextProvider::anonymous(), sign_up("alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, CustosError::AlreadyExists { .. }));
}

#[tokio::test]
async fn invalid_registration_never_opens_a_transaction() {
    let store = MemStore::default();
    let stack = stack(&store);

    let err = stack
        .registration
        .register_user(
            &UserContextProvider::anonymous(),
            RegisterUser {
                password: "short".into(),
                ..sign_up("alice")
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CustosError::Validation { .. }));
    assert_eq!(store.transaction_stats().begun, 0);
}

#[tokio::test]
async fn credential_failure_rolls_back_user_creation() {
    let store = MemStore::default();
    let failing = FailingStore::new(&store, Fault::Credentials);
    let stack = IamStack::new(failing, AuthConfig::default());

    let err = stack
        .registration
        .register_user(&UserContextProvider::anonymous(), sign_up("alice"))
        .await
        .unwrap_err();

    assert!(matches!(err, CustosError::BasicAuthCreation { .. }));
    let stats = store.transaction_stats();
    assert_eq!(stats.rolled_back, 1);
    assert_eq!(stats.committed, 0);
    assert!(store.users().get_by_username("alice").await.unwrap_err().is_not_found());
}

// ---------------------------------------------------------------------------
// Account registration
// ---------------------------------------------------------------------------

#[tokio::test]
async fn register_account_seeds_system_roles_and_owner() {
    let store = MemStore::default();
    let stack = stack(&store);
    let (owner, acme, _) = owned_account(&store, &stack, "u1", "Acme").await;

    for name in [OWNER_ROLE, ADMINISTRATOR_ROLE, MEMBER_ROLE] {
        assert!(role(&store, acme.id, name).await.is_system_defined);
    }

    let ownership = OwnershipProcessor::new(store.clone());
    let standing = ownership
        .is_sole_owner_of_account(owner.id, acme.id)
        .await
        .unwrap();
    assert!(standing.is_sole_owner);
    assert!(standing.user_has_owner_role);

    let authz = AuthorizationProvider::new(store.clone());
    let effective = authz.effective_permissions(acme.id, owner.id).await.unwrap();
    assert_eq!(effective.len(), ResourceType::ALL.len());
    assert!(effective.iter().all(|p| p.actions.contains(Action::Delete)));
}

#[tokio::test]
async fn register_account_requires_a_user() {
    let store = MemStore::default();
    let stack = stack(&store);

    let err = stack
        .registration
        .register_account(
            &UserContextProvider::anonymous(),
            CreateAccount {
                name: "Acme".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CustosError::Unauthorized { .. }));
    assert_eq!(store.transaction_stats().begun, 0);
}

#[tokio::test]
async fn membership_failure_rolls_back_account_creation() {
    let store = MemStore::default();
    let owner = create_user(&store, "u1").await;
    let failing = FailingStore::new(&store, Fault::Membership);
    let stack = IamStack::new(failing.clone(), AuthConfig::default());
    let ctx = UserContextProvider::new(UserContext::for_user(owner.id));

    let err = stack
        .registration
        .register_account(&ctx, CreateAccount { name: "Acme".into() })
        .await
        .unwrap_err();

    assert!(matches!(err, CustosError::AccountCreation { .. }));
    let stats = store.transaction_stats();
    assert_eq!(stats.rolled_back, 1);
    assert_eq!(stats.committed, 0);
    let account_id = failing.attempted();
    assert!(store.accounts().get_by_id(account_id).await.unwrap_err().is_not_found());
    assert!(store.accounts().get_user_accounts(owner.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn owner_assignment_failure_rolls_back_the_whole_account() {
    let store = MemStore::default();
    let owner = create_user(&store, "u1").await;
    let failing = FailingStore::new(&store, Fault::OwnerAssignment);
    let stack = IamStack::new(failing.clone(), AuthConfig::default());
    let ctx = UserContextProvider::new(UserContext::for_user(owner.id));

    let err = stack
        .registration
        .register_account(&ctx, CreateAccount { name: "Acme".into() })
        .await
        .unwrap_err();

    assert!(matches!(err, CustosError::SystemRoleAssignment { .. }));
    let stats = store.transaction_stats();
    assert_eq!(stats.rolled_back, 1);
    assert_eq!(stats.committed, 0);
    let account_id = failing.attempted();
    assert!(store.accounts().get_by_id(account_id).await.unwrap_err().is_not_found());
    assert!(store.accounts().get_user_accounts(owner.id).await.unwrap().is_empty());
    for name in [OWNER_ROLE, ADMINISTRATOR_ROLE, MEMBER_ROLE] {
        assert!(store.roles().find_by_name(account_id, name).await.unwrap().is_none());
    }
    assert!(
        store
            .roles()
            .get_direct_user_roles(account_id, owner.id)
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn register_user_with_account_joins_ambient_account() {
    let store = MemStore::default();
    let stack = stack(&store);
    let (_, acme, ctx) = owned_account(&store, &stack, "u1", "Acme").await;

    let user = stack
        .registration
        .register_user_with_account(&ctx, sign_up("u2"))
        .await
        .unwrap();

    assert!(store.accounts().is_member(acme.id, user.id).await.unwrap());
}

// ---------------------------------------------------------------------------
// Bulk assignment
// ---------------------------------------------------------------------------

#[tokio::test]
async fn bulk_assignment_reports_partial_success() {
    let store = MemStore::default();
    let stack = stack(&store);
    let (_, acme, ctx) = owned_account(&store, &stack, "u1", "Acme").await;
    let u2 = create_user(&store, "u2").await;
    join(&store, acme.id, u2.id).await;

    let v1 = stack
        .registration
        .register_role(
            &ctx,
            CreateRole {
                name: "editor".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
    let v2 = role(&store, acme.id, MEMBER_ROLE).await;
    let invalid = Uuid::new_v4();

    let outcome = stack
        .registration
        .register_roles_to_user(&ctx, u2.id, vec![v1.id, v2.id, invalid])
        .await
        .unwrap();

    assert_eq!(outcome.status, BulkStatus::PartialSuccess);
    assert_eq!(outcome.applied, 2);
    assert_eq!(outcome.invalid_ids, vec![invalid]);
    let held = store.roles().get_direct_user_roles(acme.id, u2.id).await.unwrap();
    assert_eq!(held.len(), 2);
}

#[tokio::test]
async fn bulk_assignment_with_only_invalid_ids_fails() {
    let store = MemStore::default();
    let stack = stack(&store);
    let (owner, acme, ctx) = owned_account(&store, &stack, "u1", "Acme").await;
    let owner_role = role(&store, acme.id, OWNER_ROLE).await;

    // Already assigned counts as invalid.
    let err = stack
        .registration
        .register_roles_to_user(&ctx, owner.id, vec![owner_role.id])
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CustosError::NoValidIds {
            entity: "role".into(),
            invalid_ids: vec![owner_role.id],
        }
    );
}

#[tokio::test]
async fn empty_bulk_request_succeeds() {
    let store = MemStore::default();
    let stack = stack(&store);
    let (_, _, ctx) = owned_account(&store, &stack, "u1", "Acme").await;
    let group = stack
        .registration
        .register_group(
            &ctx,
            CreateGroup {
                name: "ops".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();

    let outcome = stack
        .registration
        .register_users_to_group(&ctx, group.id, Vec::new())
        .await
        .unwrap();
    assert_eq!(outcome.status, BulkStatus::Success);
    assert_eq!(outcome.applied, 0);
}

#[tokio::test]
async fn users_outside_the_account_cannot_join_its_groups() {
    let store = MemStore::default();
    let stack = stack(&store);
    let (owner, _, ctx) = owned_account(&store, &stack, "u1", "Acme").await;
    let outsider = create_user(&store, "outsider").await;
    let group = stack
        .registration
        .register_group(
            &ctx,
            CreateGroup {
                name: "ops".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();

    let outcome = stack
        .registration
        .register_users_to_group(&ctx, group.id, vec![owner.id, outsider.id, owner.id])
        .await
        .unwrap();
    assert_eq!(outcome.applied, 1);
    assert_eq!(outcome.invalid_ids, vec![outsider.id, owner.id]);
}
