//! Integration tests for account, user, credential and token repositories.

use chrono::{Duration, Utc};
use custos_core::error::CustosError;
use custos_core::models::account::{CreateAccount, UpdateAccount};
use custos_core::models::group::CreateGroup;
use custos_core::models::role::NewRole;
use custos_core::models::token::CreateAuthToken;
use custos_core::models::user::{NewUser, UpdateUser};
use custos_core::repository::{
    AccountRepository, CredentialRepository, GroupRepository, ListQuery, Repositories,
    RoleRepository, TokenRepository, UserRepository,
};
use custos_db::MemStore;
use uuid::Uuid;

fn new_user(name: &str) -> NewUser {
    NewUser {
        username: name.into(),
        email: format!("{name}@example.com"),
    }
}

/// Helper: store with one account and two members.
async fn setup() -> (MemStore, Uuid, Uuid, Uuid) {
    let store = MemStore::default();
    let account = store
        .accounts()
        .create(CreateAccount {
            name: "Acme".into(),
        })
        .await
        .unwrap();
    let alice = store.users().create(new_user("alice")).await.unwrap();
    let bob = store.users().create(new_user("bob")).await.unwrap();
    store.accounts().add_user(account.id, alice.id).await.unwrap();
    store.accounts().add_user(account.id, bob.id).await.unwrap();
    (store, account.id, alice.id, bob.id)
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_get_update_account() {
    let (store, account_id, _, _) = setup().await;

    let fetched = store.accounts().get_by_id(account_id).await.unwrap();
    assert_eq!(fetched.name, "Acme");
    assert_ne!(fetched.public_id, fetched.id);

    let updated = store
        .accounts()
        .update(
            account_id,
            UpdateAccount {
                name: Some("Acme Corp".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Acme Corp");
    assert!(updated.updated_at >= fetched.updated_at);
}

#[tokio::test]
async fn membership_lists() {
    let (store, account_id, alice, _) = setup().await;
    let other = store
        .accounts()
        .create(CreateAccount {
            name: "Globex".into(),
        })
        .await
        .unwrap();
    store.accounts().add_user(other.id, alice).await.unwrap();

    let accounts = store.accounts().get_user_accounts(alice).await.unwrap();
    let names: Vec<_> = accounts.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, ["Acme", "Globex"]);

    let users = store
        .accounts()
        .list_users(account_id, ListQuery::default())
        .await
        .unwrap();
    assert_eq!(users.total, 2);
    assert_eq!(users.items[0].username, "alice");

    assert!(store.accounts().is_member(other.id, alice).await.unwrap());
}

#[tokio::test]
async fn removing_member_strips_groups_and_roles() {
    let (store, account_id, alice, _) = setup().await;
    let group = store
        .groups()
        .create(
            account_id,
            CreateGroup {
                name: "ops".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
    let role = store
        .roles()
        .create(NewRole {
            account_id,
            name: "editor".into(),
            description: String::new(),
            is_system_defined: false,
        })
        .await
        .unwrap();
    store.groups().add_member(account_id, alice, group.id).await.unwrap();
    store.roles().assign_to_user(account_id, alice, role.id).await.unwrap();

    store.accounts().remove_user(account_id, alice).await.unwrap();

    assert!(!store.accounts().is_member(account_id, alice).await.unwrap());
    assert!(
        store
            .groups()
            .get_user_groups(account_id, alice)
            .await
            .unwrap()
            .is_empty()
    );
    assert!(
        store
            .roles()
            .get_user_roles(account_id, alice)
            .await
            .unwrap()
            .is_empty()
    );

    let err = store.accounts().remove_user(account_id, alice).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn deleting_account_cascades() {
    let (store, account_id, alice, _) = setup().await;
    let group = store
        .groups()
        .create(
            account_id,
            CreateGroup {
                name: "ops".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap();

    store.accounts().delete(account_id).await.unwrap();

    assert!(store.accounts().get_by_id(account_id).await.unwrap_err().is_not_found());
    assert!(
        store
            .groups()
            .get_by_id(account_id, group.id)
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(store.accounts().get_user_accounts(alice).await.unwrap().is_empty());
    // Users outlive their accounts.
    assert!(store.users().get_by_id(alice).await.is_ok());
}

// ---------------------------------------------------------------------------
// Users & credentials
// ---------------------------------------------------------------------------

#[tokio::test]
async fn duplicate_username_rejected() {
    let (store, _, _, _) = setup().await;
    let err = store
        .users()
        .create(NewUser {
            username: "ALICE".into(),
            email: "other@example.com".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CustosError::AlreadyExists { .. }));
}

#[tokio::test]
async fn update_user_keeps_unset_fields() {
    let (store, _, alice, _) = setup().await;
    let updated = store
        .users()
        .update(
            alice,
            UpdateUser {
                is_enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(!updated.is_enabled);
    assert_eq!(updated.username, "alice");

    let err = store
        .users()
        .update(
            alice,
            UpdateUser {
                username: Some("bob".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CustosError::AlreadyExists { .. }));
}

#[tokio::test]
async fn login_counters() {
    let (store, _, alice, _) = setup().await;

    store.users().record_login_failure(alice).await.unwrap();
    let user = store.users().record_login_failure(alice).await.unwrap();
    assert_eq!(user.failed_logins, 2);
    assert_eq!(user.failed_logins_since_last_success, 2);
    assert!(user.last_failed_login_at.is_some());

    let user = store.users().record_login_success(alice).await.unwrap();
    assert_eq!(user.successful_logins, 1);
    assert_eq!(user.failed_logins, 2);
    assert_eq!(user.failed_logins_since_last_success, 0);
    assert!(user.last_login_at.is_some());
}

#[tokio::test]
async fn credential_per_user() {
    let (store, _, alice, _) = setup().await;
    store
        .credentials()
        .create(alice, "$argon2id$hash".into())
        .await
        .unwrap();

    let credential = store.credentials().get_by_user(alice).await.unwrap();
    assert_eq!(credential.password_hash, "$argon2id$hash");

    assert!(
        store
            .credentials()
            .create(alice, "again".into())
            .await
            .is_err()
    );
    assert!(
        store
            .credentials()
            .create(Uuid::new_v4(), "orphan".into())
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn deleting_user_cascades() {
    let (store, account_id, alice, _) = setup().await;
    store.credentials().create(alice, "h".into()).await.unwrap();

    store.users().delete(alice).await.unwrap();

    assert!(store.credentials().get_by_user(alice).await.is_err());
    assert!(!store.accounts().is_member(account_id, alice).await.unwrap());
    assert!(store.users().get_by_username("alice").await.is_err());
}

// ---------------------------------------------------------------------------
// Tokens
// ---------------------------------------------------------------------------

fn token_for(user_id: Uuid) -> CreateAuthToken {
    let now = Utc::now();
    CreateAuthToken {
        id: Uuid::new_v4(),
        user_id,
        account_id: None,
        device_id: Some("laptop".into()),
        token_hash: "abc".into(),
        issued_at: now,
        expires_at: now + Duration::hours(1),
    }
}

#[tokio::test]
async fn revoke_single_and_all_tokens() {
    let (store, _, alice, bob) = setup().await;
    let t1 = store.tokens().create(token_for(alice)).await.unwrap();
    let t2 = store.tokens().create(token_for(alice)).await.unwrap();
    let t3 = store.tokens().create(token_for(alice)).await.unwrap();
    let other = store.tokens().create(token_for(bob)).await.unwrap();

    store.tokens().revoke(t1.id).await.unwrap();
    assert!(!store.tokens().get_by_id(t1.id).await.unwrap().is_active(Utc::now()));

    let revoked = store.tokens().revoke_user_tokens(alice).await.unwrap();
    assert_eq!(revoked, 2);
    for id in [t2.id, t3.id] {
        assert!(store.tokens().get_by_id(id).await.unwrap().revoked_at.is_some());
    }
    assert!(store.tokens().get_by_id(other.id).await.unwrap().is_active(Utc::now()));
}
