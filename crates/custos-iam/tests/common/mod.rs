//! Shared fixtures for the IAM integration tests.
#![allow(dead_code)]

use custos_auth::AuthConfig;
use custos_core::context::{UserContext, UserContextProvider};
use custos_core::models::account::{Account, CreateAccount};
use custos_core::models::role::Role;
use custos_core::models::user::{NewUser, User};
use custos_core::repository::{AccountRepository, Repositories, RoleRepository, UserRepository};
use custos_db::MemStore;
use custos_iam::{IamStack, RegistrationService};
use uuid::Uuid;

pub fn stack(store: &MemStore) -> IamStack<MemStore> {
    IamStack::new(store.clone(), AuthConfig::default())
}

/// Inserts a user without a credential.
pub async fn create_user(store: &MemStore, username: &str) -> User {
    store
        .users()
        .create(NewUser {
            username: username.into(),
            email: format!("{username}@example.com"),
        })
        .await
        .unwrap()
}

/// Context of `user_id` acting in `account_id`.
pub fn acting(user_id: Uuid, account_id: Uuid) -> UserContextProvider {
    UserContextProvider::new(UserContext::for_account(user_id, account_id))
}

/// Registers `name` through the service stack, owned by a new user named
/// `owner`. Returns the owner, the account and the owner's context.
pub async fn owned_account(
    store: &MemStore,
    stack: &IamStack<MemStore>,
    owner: &str,
    name: &str,
) -> (User, Account, UserContextProvider) {
    let user = create_user(store, owner).await;
    let ctx = UserContextProvider::new(UserContext::for_user(user.id));
    let account = stack
        .registration
        .register_account(&ctx, CreateAccount { name: name.into() })
        .await
        .unwrap();
    (user.clone(), account.clone(), acting(user.id, account.id))
}

/// Adds an existing user to an account directly through the store.
pub async fn join(store: &MemStore, account_id: Uuid, user_id: Uuid) {
    store.accounts().add_user(account_id, user_id).await.unwrap();
}

pub async fn role(store: &MemStore, account_id: Uuid, name: &str) -> Role {
    store
        .roles()
        .find_by_name(account_id, name)
        .await
        .unwrap()
        .unwrap()
}
