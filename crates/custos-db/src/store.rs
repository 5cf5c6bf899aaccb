//! In-memory store handle and its configuration.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use custos_core::models::{
    account::Account, credential::BasicAuthCredential, group::Group, permission::Permission,
    role::Role, token::AuthToken, user::User,
};
use custos_core::repository::Repositories;
use parking_lot::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::repository::{
    MemAccountRepository, MemCredentialRepository, MemGroupRepository, MemPermissionRepository,
    MemRoleRepository, MemTokenRepository, MemUserRepository,
};
use crate::unit_of_work::{MemUnitOfWork, TransactionStats};

/// Configuration for the in-memory store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Page size used when a query asks for `limit = 0`.
    pub default_page_size: u64,
    /// Upper bound applied to every requested page size.
    pub max_page_size: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_page_size: 50,
            max_page_size: 500,
        }
    }
}

/// Every record and relationship edge. Edges are `(from, to)` tuples.
#[derive(Debug, Clone, Default)]
pub(crate) struct State {
    pub accounts: HashMap<Uuid, Account>,
    pub users: HashMap<Uuid, User>,
    pub credentials: HashMap<Uuid, BasicAuthCredential>,
    pub groups: HashMap<Uuid, Group>,
    pub roles: HashMap<Uuid, Role>,
    pub permissions: HashMap<Uuid, Permission>,
    pub tokens: HashMap<Uuid, AuthToken>,
    /// (account, user)
    pub belongs_to: BTreeSet<(Uuid, Uuid)>,
    /// (group, user)
    pub member_of: BTreeSet<(Uuid, Uuid)>,
    /// (user, role)
    pub user_roles: BTreeSet<(Uuid, Uuid)>,
    /// (group, role)
    pub group_roles: BTreeSet<(Uuid, Uuid)>,
    /// (role, permission)
    pub grants: BTreeSet<(Uuid, Uuid)>,
}

impl State {
    /// Drops every edge touching a role.
    pub fn detach_role(&mut self, role_id: Uuid) {
        self.user_roles.retain(|(_, r)| *r != role_id);
        self.group_roles.retain(|(_, r)| *r != role_id);
        self.grants.retain(|(r, _)| *r != role_id);
    }

    /// Drops every edge touching a group.
    pub fn detach_group(&mut self, group_id: Uuid) {
        self.member_of.retain(|(g, _)| *g != group_id);
        self.group_roles.retain(|(g, _)| *g != group_id);
    }

    /// Removes a user's group memberships and direct role assignments
    /// inside one account.
    pub fn detach_user_from_account(&mut self, account_id: Uuid, user_id: Uuid) {
        let groups = &self.groups;
        self.member_of.retain(|(g, u)| {
            *u != user_id || groups.get(g).is_none_or(|g| g.account_id != account_id)
        });
        let roles = &self.roles;
        self.user_roles.retain(|(u, r)| {
            *u != user_id || roles.get(r).is_none_or(|r| r.account_id != account_id)
        });
    }
}

/// Shared handle every repository clones.
#[derive(Debug, Clone)]
pub(crate) struct Shared {
    pub state: Arc<RwLock<State>>,
    pub config: StoreConfig,
}

/// In-memory implementation of the whole repository bundle.
///
/// Cloning is cheap; clones share the same data.
#[derive(Clone)]
pub struct MemStore {
    accounts: MemAccountRepository,
    users: MemUserRepository,
    credentials: MemCredentialRepository,
    groups: MemGroupRepository,
    roles: MemRoleRepository,
    permissions: MemPermissionRepository,
    tokens: MemTokenRepository,
    unit_of_work: MemUnitOfWork,
}

impl MemStore {
    pub fn new(config: StoreConfig) -> Self {
        info!(
            default_page_size = config.default_page_size,
            max_page_size = config.max_page_size,
            "Initializing in-memory store"
        );
        let shared = Shared {
            state: Arc::new(RwLock::new(State::default())),
            config,
        };
        Self {
            accounts: MemAccountRepository::new(shared.clone()),
            users: MemUserRepository::new(shared.clone()),
            credentials: MemCredentialRepository::new(shared.clone()),
            groups: MemGroupRepository::new(shared.clone()),
            roles: MemRoleRepository::new(shared.clone()),
            permissions: MemPermissionRepository::new(shared.clone()),
            tokens: MemTokenRepository::new(shared.clone()),
            unit_of_work: MemUnitOfWork::new(shared.state),
        }
    }

    /// Counters of begun, committed and rolled back transactions.
    pub fn transaction_stats(&self) -> TransactionStats {
        self.unit_of_work.stats()
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl Repositories for MemStore {
    type Accounts = MemAccountRepository;
    type Users = MemUserRepository;
    type Credentials = MemCredentialRepository;
    type Groups = MemGroupRepository;
    type Roles = MemRoleRepository;
    type Permissions = MemPermissionRepository;
    type Tokens = MemTokenRepository;
    type UnitOfWork = MemUnitOfWork;

    fn accounts(&self) -> &Self::Accounts {
        &self.accounts
    }

    fn users(&self) -> &Self::Users {
        &self.users
    }

    fn credentials(&self) -> &Self::Credentials {
        &self.credentials
    }

    fn groups(&self) -> &Self::Groups {
        &self.groups
    }

    fn roles(&self) -> &Self::Roles {
        &self.roles
    }

    fn permissions(&self) -> &Self::Permissions {
        &self.permissions
    }

    fn tokens(&self) -> &Self::Tokens {
        &self.tokens
    }

    fn unit_of_work(&self) -> &Self::UnitOfWork {
        &self.unit_of_work
    }
}
