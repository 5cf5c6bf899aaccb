//! Account processor: creation, seeding, membership and updates of the
//! ambient account.

use custos_core::context::UserContextProvider;
use custos_core::error::{CustosError, CustosResult};
use custos_core::models::account::{Account, AccountDetails, CreateAccount, UpdateAccount};
use custos_core::repository::{
    AccountRepository, GroupRepository, ListQuery, PaginatedResult, PermissionRepository,
    Repositories, RoleRepository,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{AccountProcessor, collect_all};
use crate::authorization::{current_account, current_user};
use crate::defaults::{self, SystemRoles};
use crate::ownership::OwnershipProcessor;

#[derive(Clone)]
pub struct Accounts<R> {
    repos: R,
    ownership: OwnershipProcessor<R>,
}

impl<R: Repositories> Accounts<R> {
    pub fn new(repos: R) -> Self {
        Self {
            ownership: OwnershipProcessor::new(repos.clone()),
            repos,
        }
    }

    /// Only the ambient account can be changed.
    fn ensure_ambient(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        if current_account(ctx)? != id {
            return Err(CustosError::not_found("account", id));
        }
        Ok(())
    }
}

impl<R: Repositories> AccountProcessor for Accounts<R> {
    #[instrument(skip_all, fields(%creator))]
    async fn create(&self, creator: Uuid, input: CreateAccount) -> CustosResult<Account> {
        let account = self.repos.accounts().create(input).await?;
        self.repos.accounts().add_user(account.id, creator).await?;
        info!(account_id = %account.id, "account created");
        Ok(account)
    }

    #[instrument(skip_all, fields(%account_id, %owner))]
    async fn seed_system_roles(
        &self,
        account_id: Uuid,
        owner: Uuid,
    ) -> CustosResult<SystemRoles> {
        let roles = defaults::seed_account(&self.repos, account_id).await?;
        self.repos
            .roles()
            .assign_to_user(account_id, owner, roles.owner.id)
            .await?;
        Ok(roles)
    }

    #[instrument(skip_all, fields(%id))]
    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateAccount,
    ) -> CustosResult<Account> {
        self.ensure_ambient(ctx, id)?;
        self.repos.accounts().update(id, input).await
    }

    #[instrument(skip_all, fields(%id))]
    async fn delete(&self, ctx: &UserContextProvider, id: Uuid) -> CustosResult<()> {
        self.ensure_ambient(ctx, id)?;
        self.repos.accounts().delete(id).await?;
        info!(account_id = %id, "account deleted");
        Ok(())
    }

    /// Accounts are visible to their members only.
    #[instrument(skip_all, fields(%id, hydrate))]
    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<AccountDetails> {
        let user_id = current_user(ctx)?;
        if !self.repos.accounts().is_member(id, user_id).await? {
            return Err(CustosError::not_found("account", id));
        }
        let account = self.repos.accounts().get_by_id(id).await?;
        if !hydrate {
            return Ok(AccountDetails {
                account,
                users: None,
                groups: None,
                roles: None,
                permissions: None,
            });
        }

        let repos = &self.repos;
        Ok(AccountDetails {
            account,
            users: Some(collect_all(move |q| repos.accounts().list_users(id, q)).await?),
            groups: Some(collect_all(move |q| repos.groups().list(id, q)).await?),
            roles: Some(collect_all(move |q| repos.roles().list(id, q)).await?),
            permissions: Some(collect_all(move |q| repos.permissions().list(id, q)).await?),
        })
    }

    #[instrument(skip_all)]
    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<Account>> {
        let user_id = current_user(ctx)?;
        self.repos.accounts().list_for_user(user_id, query).await
    }

    /// Blocked when the user is the account's last owner.
    #[instrument(skip_all, fields(%user_id))]
    async fn remove_user(&self, ctx: &UserContextProvider, user_id: Uuid) -> CustosResult<()> {
        let account_id = current_account(ctx)?;
        if !self.repos.accounts().is_member(account_id, user_id).await? {
            return Err(CustosError::not_found("user", user_id));
        }

        let standing = self
            .ownership
            .is_sole_owner_of_account(user_id, account_id)
            .await?;
        if standing.is_sole_owner {
            return Err(CustosError::UserIsSoleOwner {
                blocked_ids: vec![user_id],
                invalid_ids: Vec::new(),
            });
        }

        self.repos.accounts().remove_user(account_id, user_id).await?;
        info!(%account_id, %user_id, "user removed from account");
        Ok(())
    }
}
