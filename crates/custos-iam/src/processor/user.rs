//! User processor: sign-up records, account-scoped user management and
//! direct role assignments.

use std::collections::HashSet;

use custos_auth::password;
use custos_core::context::UserContextProvider;
use custos_core::error::{CustosError, CustosResult};
use custos_core::models::credential::BasicAuthCredential;
use custos_core::models::permission::{Action, ResourceType};
use custos_core::models::user::{NewUser, RegisterUser, UpdateUser, User, UserDetails};
use custos_core::outcome::BulkOutcome;
use custos_core::repository::{
    AccountRepository, CredentialRepository, GroupRepository, ListQuery, PaginatedResult,
    Repositories, RoleRepository, UserRepository,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{UserProcessor, found, plan_bulk};
use crate::authorization::{AuthorizationProvider, current_account, current_user};
use crate::ownership::OwnershipProcessor;

#[derive(Clone)]
pub struct Users<R> {
    repos: R,
    authz: AuthorizationProvider<R>,
    ownership: OwnershipProcessor<R>,
    pepper: Option<String>,
}

impl<R: Repositories> Users<R> {
    pub fn new(repos: R, pepper: Option<String>) -> Self {
        Self {
            authz: AuthorizationProvider::new(repos.clone()),
            ownership: OwnershipProcessor::new(repos.clone()),
            repos,
            pepper,
        }
    }

    /// Whether dropping the user's direct `Owner` assignment leaves the
    /// account with no owner.
    async fn would_orphan(&self, user_id: Uuid, account_id: Uuid) -> CustosResult<bool> {
        if self
            .ownership
            .has_ownership_via_groups(user_id, account_id)
            .await?
        {
            return Ok(false);
        }
        let standing = self
            .ownership
            .is_sole_owner_of_account(user_id, account_id)
            .await?;
        Ok(standing.is_sole_owner)
    }

    /// The ambient account, provided `user_id` is one of its members.
    async fn ensure_in_account(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
    ) -> CustosResult<Uuid> {
        let account_id = current_account(ctx)?;
        if !self.repos.accounts().is_member(account_id, user_id).await? {
            return Err(CustosError::not_found("user", user_id));
        }
        Ok(account_id)
    }

    /// A user record is shared by all of its accounts. Someone other than
    /// the user may only change it holding `Update` on the user in every
    /// one of them.
    async fn ensure_authority_over_all_accounts(
        &self,
        caller: Uuid,
        user_id: Uuid,
        ambient: Uuid,
    ) -> CustosResult<()> {
        for account in self.repos.accounts().get_user_accounts(user_id).await? {
            if account.id == ambient {
                continue;
            }
            let granted = self
                .authz
                .effective_permissions(account.id, caller)
                .await?
                .iter()
                .any(|p| p.grants(Action::Update, ResourceType::User, Some(user_id)));
            if !granted {
                return Err(CustosError::unauthorized(format!(
                    "user {user_id} also belongs to accounts you cannot manage"
                )));
            }
        }
        Ok(())
    }
}

impl<R: Repositories> UserProcessor for Users<R> {
    #[instrument(skip_all, fields(username = %input.username))]
    async fn create(&self, input: NewUser) -> CustosResult<User> {
        self.repos.users().create(input).await
    }

    #[instrument(skip_all, fields(%user_id))]
    async fn create_credential(
        &self,
        user_id: Uuid,
        password: &str,
    ) -> CustosResult<BasicAuthCredential> {
        let hash = password::hash_password(password, self.pepper.as_deref())?;
        self.repos.credentials().create(user_id, hash).await
    }

    #[instrument(skip_all, fields(username = %input.username))]
    async fn register_in_account(
        &self,
        ctx: &UserContextProvider,
        input: RegisterUser,
    ) -> CustosResult<User> {
        let account_id = current_account(ctx)?;
        let user = self.create(input.identity()).await?;
        self.create_credential(user.id, &input.password).await?;
        self.repos.accounts().add_user(account_id, user.id).await?;
        info!(%account_id, user_id = %user.id, "user registered into account");
        Ok(user)
    }

    /// Users may always update themselves. Anyone else reaches only users
    /// of the ambient account whose other accounts they also manage.
    #[instrument(skip_all, fields(%id))]
    async fn update(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        input: UpdateUser,
    ) -> CustosResult<User> {
        let caller = current_user(ctx)?;
        if caller != id {
            let account_id = self.ensure_in_account(ctx, id).await?;
            self.ensure_authority_over_all_accounts(caller, id, account_id)
                .await?;
        }
        self.repos.users().update(id, input).await
    }

    #[instrument(skip_all, fields(%id))]
    async fn delete(&self, id: Uuid) -> CustosResult<()> {
        for account in self.repos.accounts().get_user_accounts(id).await? {
            let standing = self
                .ownership
                .is_sole_owner_of_account(id, account.id)
                .await?;
            if standing.is_sole_owner {
                return Err(CustosError::UserIsSoleAccountOwner {
                    account_id: account.id,
                });
            }
        }
        self.repos.users().delete(id).await?;
        info!(user_id = %id, "user deleted");
        Ok(())
    }

    #[instrument(skip_all, fields(%id, hydrate))]
    async fn get(
        &self,
        ctx: &UserContextProvider,
        id: Uuid,
        hydrate: bool,
    ) -> CustosResult<UserDetails> {
        let account_id = self.ensure_in_account(ctx, id).await?;
        let user = self.repos.users().get_by_id(id).await?;
        if !hydrate {
            return Ok(UserDetails {
                user,
                accounts: None,
                groups: None,
                roles: None,
            });
        }

        // Only accounts the caller shares with the user are disclosed.
        let shared: HashSet<Uuid> = ctx.current().accounts.into_iter().collect();
        let accounts = self
            .repos
            .accounts()
            .get_user_accounts(id)
            .await?
            .into_iter()
            .filter(|a| shared.contains(&a.id))
            .collect();
        Ok(UserDetails {
            user,
            accounts: Some(accounts),
            groups: Some(self.repos.groups().get_user_groups(account_id, id).await?),
            roles: Some(self.repos.roles().get_user_roles(account_id, id).await?),
        })
    }

    #[instrument(skip_all)]
    async fn list(
        &self,
        ctx: &UserContextProvider,
        query: ListQuery,
    ) -> CustosResult<PaginatedResult<User>> {
        let account_id = current_account(ctx)?;
        self.repos.accounts().list_users(account_id, query).await
    }

    /// Assigns roles of the ambient account directly to the user. Unknown,
    /// foreign and already assigned roles are reported as invalid.
    #[instrument(skip_all, fields(%user_id, requested = role_ids.len()))]
    async fn assign_roles(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        let account_id = self.ensure_in_account(ctx, user_id).await?;

        let roles = self.repos.roles();
        let assigned: HashSet<Uuid> = roles
            .get_direct_user_roles(account_id, user_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
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
            roles.assign_to_user(account_id, user_id, role_id).await?;
        }
        Ok(plan.into_outcome())
    }

    /// Removes direct role assignments. Removing `Owner` is blocked when it
    /// would leave the account without an owner.
    #[instrument(skip_all, fields(%user_id, requested = role_ids.len()))]
    async fn remove_roles(
        &self,
        ctx: &UserContextProvider,
        user_id: Uuid,
        role_ids: &[Uuid],
    ) -> CustosResult<BulkOutcome> {
        let account_id = self.ensure_in_account(ctx, user_id).await?;

        let roles = self.repos.roles();
        let assigned: HashSet<Uuid> = roles
            .get_direct_user_roles(account_id, user_id)
            .await?
            .into_iter()
            .map(|r| r.id)
            .collect();
        let plan = plan_bulk(role_ids, |id| {
            let held = assigned.contains(&id);
            async move { Ok(held) }
        })
        .await?;
        plan.ensure_any_valid("role")?;

        if let Some(owner) = self.ownership.owner_role(account_id).await? {
            if plan.valid.contains(&owner.id) && self.would_orphan(user_id, account_id).await? {
                return Err(CustosError::OwnerRoleRemovalBlocked {
                    blocked_ids: vec![owner.id],
                    invalid_ids: plan.invalid,
                });
            }
        }

        for &role_id in &plan.valid {
            roles.unassign_from_user(account_id, user_id, role_id).await?;
        }
        Ok(plan.into_outcome())
    }
}
