//! Integration tests for group, role and permission repositories.

use custos_core::error::CustosError;
use custos_core::models::account::CreateAccount;
use custos_core::models::group::{CreateGroup, UpdateGroup};
use custos_core::models::permission::{Action, ActionSet, NewPermission, ResourceType};
use custos_core::models::role::{NewRole, UpdateRole};
use custos_core::models::user::NewUser;
use custos_core::repository::{
    AccountRepository, GroupRepository, ListQuery, PermissionRepository, Repositories,
    RoleRepository, SortOrder, UserRepository,
};
use custos_db::MemStore;
use uuid::Uuid;

/// Helper: store with two accounts and one user belonging to the first.
async fn setup() -> (MemStore, Uuid, Uuid, Uuid) {
    let store = MemStore::default();
    let acme = store
        .accounts()
        .create(CreateAccount {
            name: "Acme".into(),
        })
        .await
        .unwrap();
    let globex = store
        .accounts()
        .create(CreateAccount {
            name: "Globex".into(),
        })
        .await
        .unwrap();
    let user = store
        .users()
        .create(NewUser {
            username: "alice".into(),
            email: "alice@example.com".into(),
        })
        .await
        .unwrap();
    store.accounts().add_user(acme.id, user.id).await.unwrap();
    (store, acme.id, globex.id, user.id)
}

fn new_role(account_id: Uuid, name: &str) -> NewRole {
    NewRole {
        account_id,
        name: name.into(),
        description: format!("{name} role"),
        is_system_defined: false,
    }
}

fn new_permission(account_id: Uuid, name: &str) -> NewPermission {
    NewPermission {
        account_id,
        name: name.into(),
        description: String::new(),
        resource_type: ResourceType::Group,
        resource_id: None,
        actions: ActionSet::of(&[Action::Read]),
        is_system_defined: false,
    }
}

async fn create_group(store: &MemStore, account_id: Uuid, name: &str) -> Uuid {
    store
        .groups()
        .create(
            account_id,
            CreateGroup {
                name: name.into(),
                description: String::new(),
            },
        )
        .await
        .unwrap()
        .id
}

// ---------------------------------------------------------------------------
// Group tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn group_is_invisible_from_other_account() {
    let (store, acme, globex, _) = setup().await;
    let group = create_group(&store, acme, "ops").await;

    assert!(store.groups().get_by_id(acme, group).await.is_ok());
    assert!(
        store
            .groups()
            .get_by_id(globex, group)
            .await
            .unwrap_err()
            .is_not_found()
    );
    let page = store.groups().list(globex, ListQuery::default()).await.unwrap();
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn group_names_unique_per_account() {
    let (store, acme, globex, _) = setup().await;
    create_group(&store, acme, "ops").await;

    let err = store
        .groups()
        .create(
            acme,
            CreateGroup {
                name: "OPS".into(),
                description: String::new(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CustosError::AlreadyExists { .. }));

    // Same name in another account is fine.
    create_group(&store, globex, "ops").await;
}

#[tokio::test]
async fn update_group_and_list_ordering() {
    let (store, acme, _, _) = setup().await;
    let a = create_group(&store, acme, "alpha").await;
    create_group(&store, acme, "beta").await;

    let updated = store
        .groups()
        .update(
            acme,
            a,
            UpdateGroup {
                name: Some("gamma".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "gamma");
    assert_eq!(updated.description, "");

    let page = store
        .groups()
        .list(
            acme,
            ListQuery {
                order: SortOrder::NameDesc,
                ..ListQuery::default()
            },
        )
        .await
        .unwrap();
    let names: Vec<_> = page.items.iter().map(|g| g.name.as_str()).collect();
    assert_eq!(names, ["gamma", "beta"]);
}

#[tokio::test]
async fn members_must_belong_to_account() {
    let (store, acme, globex, user) = setup().await;
    let group = create_group(&store, acme, "ops").await;
    let foreign = create_group(&store, globex, "ops").await;

    store.groups().add_member(acme, user, group).await.unwrap();
    let members = store.groups().get_members(acme, group).await.unwrap();
    assert_eq!(members.len(), 1);

    // User is not a member of Globex.
    assert!(store.groups().add_member(globex, user, foreign).await.is_err());
    // Group of Globex is not reachable from Acme.
    assert!(store.groups().add_member(acme, user, foreign).await.is_err());

    store.groups().remove_member(acme, user, group).await.unwrap();
    assert!(store.groups().get_members(acme, group).await.unwrap().is_empty());
}

// ---------------------------------------------------------------------------
// Role tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_update_delete_role() {
    let (store, acme, _, user) = setup().await;
    let role = store.roles().create(new_role(acme, "editor")).await.unwrap();
    assert!(!role.is_system_defined);

    let updated = store
        .roles()
        .update(
            acme,
            role.id,
            UpdateRole {
                description: Some("Can edit".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "editor");
    assert_eq!(updated.description, "Can edit");

    store.roles().assign_to_user(acme, user, role.id).await.unwrap();
    store.roles().delete(acme, role.id).await.unwrap();
    assert!(store.roles().get_user_roles(acme, user).await.unwrap().is_empty());
}

#[tokio::test]
async fn user_roles_include_group_roles() {
    let (store, acme, _, user) = setup().await;
    let direct = store.roles().create(new_role(acme, "direct")).await.unwrap();
    let inherited = store.roles().create(new_role(acme, "inherited")).await.unwrap();
    let group = create_group(&store, acme, "ops").await;

    store.roles().assign_to_user(acme, user, direct.id).await.unwrap();
    store.roles().assign_to_group(acme, group, inherited.id).await.unwrap();
    store.groups().add_member(acme, user, group).await.unwrap();
    // Held both ways: reported once.
    store.roles().assign_to_group(acme, group, direct.id).await.unwrap();

    let roles = store.roles().get_user_roles(acme, user).await.unwrap();
    let names: Vec<_> = roles.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["direct", "inherited"]);

    let direct_only = store.roles().get_direct_user_roles(acme, user).await.unwrap();
    assert_eq!(direct_only.len(), 1);

    let holders = store.roles().get_role_groups(acme, inherited.id).await.unwrap();
    assert_eq!(holders[0].id, group);
    let users = store.roles().get_role_users(acme, direct.id).await.unwrap();
    assert_eq!(users[0].id, user);
}

#[tokio::test]
async fn foreign_role_cannot_be_assigned() {
    let (store, acme, globex, user) = setup().await;
    let foreign = store.roles().create(new_role(globex, "editor")).await.unwrap();

    let err = store
        .roles()
        .assign_to_user(acme, user, foreign.id)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

// ---------------------------------------------------------------------------
// Permission tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn grant_and_revoke_permission() {
    let (store, acme, _, _) = setup().await;
    let role = store.roles().create(new_role(acme, "reader")).await.unwrap();
    let permission = store
        .permissions()
        .create(new_permission(acme, "group:read"))
        .await
        .unwrap();

    store
        .permissions()
        .grant_to_role(acme, role.id, permission.id)
        .await
        .unwrap();
    let granted = store
        .permissions()
        .get_role_permissions(acme, role.id)
        .await
        .unwrap();
    assert_eq!(granted, vec![permission.clone()]);
    let roles = store
        .permissions()
        .get_permission_roles(acme, permission.id)
        .await
        .unwrap();
    assert_eq!(roles[0].id, role.id);

    store
        .permissions()
        .revoke_from_role(acme, role.id, permission.id)
        .await
        .unwrap();
    assert!(
        store
            .permissions()
            .revoke_from_role(acme, role.id, permission.id)
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn deleting_permission_drops_grants() {
    let (store, acme, globex, _) = setup().await;
    let role = store.roles().create(new_role(acme, "reader")).await.unwrap();
    let permission = store
        .permissions()
        .create(new_permission(acme, "group:read"))
        .await
        .unwrap();
    store
        .permissions()
        .grant_to_role(acme, role.id, permission.id)
        .await
        .unwrap();

    assert!(store.permissions().delete(globex, permission.id).await.is_err());
    store.permissions().delete(acme, permission.id).await.unwrap();

    assert!(
        store
            .permissions()
            .get_role_permissions(acme, role.id)
            .await
            .unwrap()
            .is_empty()
    );
}
