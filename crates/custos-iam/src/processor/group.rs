//! Group processor: groups of the ambient account, their members and
//! their roles.

use std::collections::HashSet;

use custos_core::context::UserContextProvider;
use custos_core::error::{CustosError, CustosResult};
use custos_core::models::group::{CreateGroup, Group, GroupDetails, UpdateGroup};
use custos_core::outcome::BulkOutcome;
use custos_core::repository::{
    AccountRepository, GroupRepository, ListQuery, PaginatedResult, Repositories, RoleRepository,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{GroupProcessor, found, plan_bulk};
use crate::authorization::current_account;
use crate::ownership::OwnershipProcessor;

#[derive(Clone)]
pub struct Groups<R> {
    repos: R,
    ownership: OwnershipProcessor<R>,
}

impl<R: Repositories> Groups<R> {
    pub fn new(repos: R) -> Self {
        Self {
            ownership: OwnershipProcessor::new(repos.clone()),
            repos,
        }
    }

    /// The group, provided it belongs to the ambient account.
    async fn load(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<Group> {
        let account_id = current_account(ctx)?;
        self.repos.groups().get_by_id(account_id, id).await
    }

    async fn member_ids(&self, account_id: Uuid, group_id: Uuid) -> CustosResult<HashSet<Uuid>> {
        Ok(self
            .repos
            .groups()
            .get_members(account_id, group_id)
            .await?
            .into_iter()
            .map(|u| u.id)
            .collect())
    }

    async fn role_ids(&self, account_id: Uuid, group_id: Uuid) -> CustosResult<HashSet<Uuid>> {
        Ok(self
            .repos
            .roles()
            .get_group_roles(account_id, group_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect())
    }

    /// Whether losing this group's `Owner` grant leaves the account with no
    /// owner at all.
    async fn strips_last_owners(&self, account_id: Uuid, group_id: Uuid) -> CustosResult<bool> {
        let Some(owner) = self.ownership.owner_role(account_id).await? else {
            return Ok(false);
        };
        if !self.role_ids(account_id, group_id).await?.contains(&owner.id) {
            return Ok(false);
        }
        let owners: Vec<Uuid> = self
            .ownership
            .account_owners(account_id)
            .await?
            .into_iter()
            .collect();
        if owners.is_empty() {
            return Ok(false);
        }
        Ok(!self
            .ownership
            .any_user_has_ownership_outside_group(&owners, account_id, group_id)
            .await?)
    }

    /// Owners among `removed` that would lose `Owner`, provided nobody
    /// else would keep it. Empty when the removal is safe.
    async fn ownership_losses(
        &self,
        account_id: Uuid,
        group_id: Uuid,
        removed: &[Uuid],
    ) -> CustosResult<Vec<Uuid>> {
        let Some(owner) = self.ownership.owner_role(account_id).await? else {
            return Ok(Vec::new());
        };
        if !self.role_ids(account_id, group_id).await?.contains(&owner.id) {
            return Ok(Vec::new());
        }

        let owners = self.ownership.account_owners(account_id).await?;
        let mut losing = Vec::new();
        for &user_id in removed.iter().filter(|u| owners.contains(u)) {
            if !self
                .ownership
                .has_ownership_outside_group(user_id, account_id, group_id)
                .await?
            {
                losing.push(user_id);
            }
        }

        let remaining = owners.len() - losing.len();
        if losing.is_empty() || remaining > 0 {
            return Ok(Vec::new());
        }
        Ok(losing)
    }
}

impl<R: Repositories> GroupProcessor for Groups<R> {
    #[instrument(skip_all, fields(name = %input.name))]
    async fn create(&self, ctx: &UserContextProvider, input: CreateGroup) -> CustosResult<Group> {
        let account_id = current_account(ctx)?;
        if self
            .repos
            .groups()
            .find_by_name(account_id, &input.name)
            .await?
            .is_some()
        {
            return Err(CustosError::already_exists("group", input.name));
        }
        let group = self.repos.groups().create(account_id, input).await?;
        info!(%account_id, group_id = %group.id, "group created");
        Ok(group)
    }

    #[instrument(skip_all, fields(%id))]
    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateGroup,
    ) -> CustosResult<Group> {
        let group = self.load(ctx, id).await?;
        if let Some(name) = &input.name {
            let clash = self.repos.groups().find_by_name(group.account_id, name).await?;
            if clash.is_some_and(|g| g.id != id) {
                return Err(CustosError::already_exists("group", name.clone()));
            }
        }
        self.repos.groups().update(group.account_id, id, input).await
    }

    /// Deleting a group that carries `Owner` is blocked when none of the
    /// account's owners keeps the role some other way.
    #[instrument(skip_all, fields(%id))]
    async fn delete(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        let group = self.load(ctx, id).await?;
        if self.strips_last_owners(group.account_id, id).await? {
            return Err(CustosError::GroupHasSoleOwners { group_id: id });
        }
        self.repos.groups().delete(group.account_id, id).await?;
        info!(account_id = %group.account_id, group_id = %id, "group deleted");
        Ok(())
    }

    #[instrument(skip_all, fields(%id, hydrate))]
    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<GroupDetails> {
        let group = self.load(ctx, id).await?;
        if !hydrate {
            return Ok(GroupDetails {
                group,
                users: None,
                roles: None,
            });
        }
        let account_id = group.account_id;
        Ok(GroupDetails {
            users: Some(self.repos.groups().get_members(account_id, id).await?),
            roles: Some(self.repos.roles().get_group_roles(account_id, id).await?),
            group,
        })
    }

    #[instrument(skip_all)]
    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Group>> {
        let account_id = current_account(ctx)?;
        self.repos.groups().list(account_id, query).await
    }

    /// Adds members of the ambient account to the group.
    #[instrument(skip_all, fields(%group_id, requested = user_ids.len()))]
    async fn add_users(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        let group = self.load(ctx, group_id).await?;

        let account_id = group.account_id;
        let members = self.member_ids(account_id, group_id).await?;
        let accounts = self.repos.accounts();
        let plan = plan_bulk(user_ids, |id| {
            let members = &members;
            async move {
                if members.contains(&id) {
                    return Ok(false);
                }
                accounts.is_member(account_id, id).await
            }
        })
        .await?;
        plan.ensure_any_valid("user")?;

        for &user_id in &plan.valid {
            self.repos
                .groups()
                .add_member(account_id, user_id, group_id)
                .await?;
        }
        Ok(plan.into_outcome())
    }

    /// Removes members from the group. The whole batch is blocked when it
    /// would strip the account of every owner.
    #[instrument(skip_all, fields(%group_id, requested = user_ids.len()))]
    async fn remove_users(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        user_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        let group = self.load(ctx, group_id).await?;

        let account_id = group.account_id;
        let members = self.member_ids(account_id, group_id).await?;
        let plan = plan_bulk(user_ids, |id| {
            let is_member = members.contains(&id);
            async move { Ok(is_member) }
        })
        .await?;
        plan.ensure_any_valid("user")?;

        let blocked = self
            .ownership_losses(account_id, group_id, &plan.valid)
            .await?;
        if !blocked.is_empty() {
            return Err(CustosError::UserIsSoleOwner {
                blocked_ids: blocked,
                invalid_ids: plan.invalid,
            });
        }

        for &user_id in &plan.valid {
            self.repos
                .groups()
                .remove_member(account_id, user_id, group_id)
                .await?;
        }
        Ok(plan.into_outcome())
    }

    /// Assigns roles of the ambient account to the group.
    #[instrument(skip_all, fields(%group_id, requested = role_ids.len()))]
    async fn add_roles(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        let group = self.load(ctx, group_id).await?;

        let account_id = group.account_id;
        let roles = self.repos.roles();
        let assigned = self.role_ids(account_id, group_id).await?;
        let plan = plan_bulk(role_ids, |id| {
            let assigned = &assigned;
            async move {
                if assigned.contains(&id) {
                    return Ok(false);
                }
                found(roles.get_by_id(account_id, id).await).map(|r| r.is_some())
            }
        })
        .await?;
        plan.ensure_any_valid("role")?;

        for &role_id in &plan.valid {
            roles.assign_to_group(account_id, group_id, role_id).await?;
        }
        Ok(plan.into_outcome())
    }

    /// Removes roles from the group. Dropping `Owner` is blocked when no
    /// owner keeps the role outside this group.
    #[instrument(skip_all, fields(%group_id, requested = role_ids.len()))]
    async fn remove_roles(
        &self,
        ctx: &UserContextProvider,
        group_id: Uuid,
        role_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        let group = self.load(ctx, group_id).await?;

        let account_id = group.account_id;
        let assigned = self.role_ids(account_id, group_id).await?;
        let plan = plan_bulk(role_ids, |id| {
            let held = assigned.contains(&id);
            async move { Ok(held) }
        })
        .await?;
        plan.ensure_any_valid("role")?;

        if let Some(owner) = self.ownership.owner_role(account_id).await? {
            if plan.valid.contains(&owner.id)
                && self.strips_last_owners(account_id, group_id).await?
            {
                return Err(CustosError::OwnerRoleRemovalBlocked {
                    blocked_ids: vec![owner.id],
                    invalid_ids: plan.invalid,
                });
            }
        }

        for &role_id in &plan.valid {
            self.repos
                .roles()
                .unassign_from_group(account_id, group_id, role_id)
                .await?;
        }
        Ok(plan.into_outcome())
    }
}
