//! Sole-ownership checks.
//!
//! Every account keeps at least one member holding its system `Owner`
//! role, directly or through a group. The predicates here are read-only
//! and are evaluated inside the transaction that performs the removal
//! they guard.

use std::collections::BTreeSet;

use custos_core::error::CustosResult;
use custos_core::models::role::Role;
use custos_core::repository::{AccountRepository, GroupRepository, Repositories, RoleRepository};
use serde::Serialize;
use uuid::Uuid;

use crate::defaults::OWNER_ROLE;

/// Ownership standing of one user in one account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SoleOwnership {
    pub is_sole_owner: bool,
    pub user_has_owner_role: bool,
}

#[derive(Clone)]
pub struct OwnershipProcessor<R> {
    repos: R,
}

impl<R: Repositories> OwnershipProcessor<R> {
    pub fn new(repos: R) -> Self {
        Self { repos }
    }

    /// The account's system `Owner` role, if it was seeded.
    pub async fn owner_role(&self, account_id: Uuid) -> CustosResult<Option<Role>> {
        Ok(self
            .repos
            .roles()
            .find_by_name(account_id, OWNER_ROLE)
            .await?
            .filter(|r| r.is_system_defined))
    }

    /// Members of the account holding `Owner` directly or through a group.
    pub async fn account_owners(&self, account_id: Uuid) -> CustosResult<BTreeSet<Uuid>> {
        let Some(owner) = self.owner_role(account_id).await? else {
            return Ok(BTreeSet::new());
        };

        let mut holders: BTreeSet<Uuid> = self
            .repos
            .roles()
            .get_role_users(account_id, owner.id)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect();
        for group in self.repos.roles().get_role_groups(account_id, owner.id).await? {
            for member in self.repos.groups().get_members(account_id, group.id).await? {
                holders.insert(member.id);
            }
        }

        let mut owners = BTreeSet::new();
        for user_id in holders {
            if self.repos.accounts().is_member(account_id, user_id).await? {
                owners.insert(user_id);
            }
        }
        Ok(owners)
    }

    pub async fn is_sole_owner_of_account(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> CustosResult<SoleOwnership> {
        let owners = self.account_owners(account_id).await?;
        let user_has_owner_role = owners.contains(&user_id);
        Ok(SoleOwnership {
            is_sole_owner: user_has_owner_role && owners.len() == 1,
            user_has_owner_role,
        })
    }

    /// Whether the user holds `Owner` directly, or through any group other
    /// than `excluded_group_id`.
    pub async fn has_ownership_outside_group(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        excluded_group_id: Uuid,
    ) -> CustosResult<bool> {
        let Some(owner) = self.owner_role(account_id).await? else {
            return Ok(false);
        };
        if self.holds_directly(user_id, account_id, owner.id).await? {
            return Ok(true);
        }
        self.holds_via_groups(user_id, account_id, owner.id, Some(excluded_group_id))
            .await
    }

    /// Short-circuits on the first user with ownership outside the group.
    pub async fn any_user_has_ownership_outside_group(
        &self,
        user_ids: &[Uuid],
        account_id: Uuid,
        excluded_group_id: Uuid,
    ) -> CustosResult<bool> {
        for &user_id in user_ids {
            if self
                .has_ownership_outside_group(user_id, account_id, excluded_group_id)
                .await?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Whether the user keeps `Owner` through a group after losing the
    /// direct assignment.
    pub async fn has_ownership_via_groups(
        &self,
        user_id: Uuid,
        account_id: Uuid,
    ) -> CustosResult<bool> {
        let Some(owner) = self.owner_role(account_id).await? else {
            return Ok(false);
        };
        self.holds_via_groups(user_id, account_id, owner.id, None).await
    }

    async fn holds_directly(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        owner_id: Uuid,
    ) -> CustosResult<bool> {
        Ok(self
            .repos
            .roles()
            .get_direct_user_roles(account_id, user_id)
            .await?
            .iter()
            .any(|r| r.id == owner_id))
    }

    async fn holds_via_groups(
        &self,
        user_id: Uuid,
        account_id: Uuid,
        owner_id: Uuid,
        excluded_group_id: Option<Uuid>,
    ) -> CustosResult<bool> {
        for group in self.repos.groups().get_user_groups(account_id, user_id).await? {
            if Some(group.id) == excluded_group_id {
                continue;
            }
            let roles = self.repos.roles().get_group_roles(account_id, group.id).await?;
            if roles.iter().any(|r| r.id == owner_id) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}
