//! System roles and permissions seeded into every new account.

use std::collections::HashMap;

use custos_core::error::CustosResult;
use custos_core::models::permission::{Action, ActionSet, NewPermission, Permission, ResourceType};
use custos_core::models::role::{NewRole, Role};
use custos_core::repository::{PermissionRepository, Repositories, RoleRepository};
use tracing::debug;
use uuid::Uuid;

pub const OWNER_ROLE: &str = "Owner";
pub const ADMINISTRATOR_ROLE: &str = "Administrator";
pub const MEMBER_ROLE: &str = "Member";

/// Name of the type-wide permission granting every action.
pub fn manage_permission(resource_type: ResourceType) -> String {
    format!("{resource_type}:manage")
}

/// Name of the type-wide read-only permission.
pub fn read_permission(resource_type: ResourceType) -> String {
    format!("{resource_type}:read")
}

/// The system roles of a freshly seeded account.
#[derive(Debug, Clone)]
pub struct SystemRoles {
    pub owner: Role,
    pub administrator: Role,
    pub member: Role,
}

/// Creates the system permissions and roles of `account_id` and wires the
/// grants between them.
pub async fn seed_account<R: Repositories>(
    repos: &R,
    account_id: Uuid,
) -> CustosResult<SystemRoles> {
    let mut manage = HashMap::new();
    let mut read = HashMap::new();
    for resource_type in ResourceType::ALL {
        let p = create_permission(
            repos,
            account_id,
            manage_permission(resource_type),
            resource_type,
            ActionSet::ALL,
        )
        .await?;
        manage.insert(resource_type, p.id);

        let p = create_permission(
            repos,
            account_id,
            read_permission(resource_type),
            resource_type,
            ActionSet::of(&[Action::Read]),
        )
        .await?;
        read.insert(resource_type, p.id);
    }

    let owner = create_role(repos, account_id, OWNER_ROLE, "Full control of the account").await?;
    let administrator = create_role(
        repos,
        account_id,
        ADMINISTRATOR_ROLE,
        "Manages users, groups, roles and permissions",
    )
    .await?;
    let member = create_role(repos, account_id, MEMBER_ROLE, "Read access to the account").await?;

    let permissions = repos.permissions();
    for resource_type in ResourceType::ALL {
        permissions
            .grant_to_role(account_id, owner.id, manage[&resource_type])
            .await?;
        let admin_grant = match resource_type {
            ResourceType::Account => read[&resource_type],
            _ => manage[&resource_type],
        };
        permissions
            .grant_to_role(account_id, administrator.id, admin_grant)
            .await?;
        permissions
            .grant_to_role(account_id, member.id, read[&resource_type])
            .await?;
    }

    debug!(%account_id, "system roles seeded");
    Ok(SystemRoles {
        owner,
        administrator,
        member,
    })
}

async fn create_permission<R: Repositories>(
    repos: &R,
    account_id: Uuid,
    name: String,
    resource_type: ResourceType,
    actions: ActionSet,
) -> CustosResult<Permission> {
    repos
        .permissions()
        .create(NewPermission {
            account_id,
            description: format!("System permission {name}"),
            name,
            resource_type,
            resource_id: None,
            actions,
            is_system_defined: true,
        })
        .await
}

async fn create_role<R: Repositories>(
    repos: &R,
    account_id: Uuid,
    name: &str,
    description: &str,
) -> CustosResult<Role> {
    repos
        .roles()
        .create(NewRole {
            account_id,
            name: name.into(),
            description: description.into(),
            is_system_defined: true,
        })
        .await
}
