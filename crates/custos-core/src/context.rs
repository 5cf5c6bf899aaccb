//! Ambient user context.
//!
//! A [`UserContextProvider`] is created per request (or per session) and
//! passed explicitly down the call chain. Authorization checks read it;
//! only [`UserContextSetter`] writes it, and only at session boundaries
//! (sign-in, sign-out, account switch, account or user deletion).

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Snapshot of the caller's identity.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserContext {
    pub user_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub device_id: Option<String>,
    /// Accounts the user belongs to.
    pub accounts: Vec<Uuid>,
}

impl UserContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn for_account(user_id: Uuid, account_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            account_id: Some(account_id),
            device_id: None,
            accounts: vec![account_id],
        }
    }
}

/// Request-scoped holder of the [`UserContext`] and the request's
/// cancellation signal.
#[derive(Debug, Default)]
pub struct UserContextProvider {
    context: RwLock<UserContext>,
    cancellation: CancellationToken,
}

impl UserContextProvider {
    pub fn new(context: UserContext) -> Self {
        Self {
            context: RwLock::new(context),
            cancellation: CancellationToken::new(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(UserContext::anonymous())
    }

    pub fn with_cancellation(context: UserContext, cancellation: CancellationToken) -> Self {
        Self {
            context: RwLock::new(context),
            cancellation,
        }
    }

    /// Copy of the current context.
    pub fn current(&self) -> UserContext {
        self.context.read().clone()
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.context.read().user_id
    }

    pub fn account_id(&self) -> Option<Uuid> {
        self.context.read().account_id
    }

    pub fn device_id(&self) -> Option<String> {
        self.context.read().device_id.clone()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// The only writer of a [`UserContextProvider`].
pub struct UserContextSetter<'a> {
    provider: &'a UserContextProvider,
}

impl<'a> UserContextSetter<'a> {
    pub fn new(provider: &'a UserContextProvider) -> Self {
        Self { provider }
    }

    /// Replaces the whole context (sign-in, session resume).
    pub fn set(&self, context: UserContext) {
        *self.provider.context.write() = context;
    }

    /// Selects another account the user already belongs to.
    pub fn switch_account(&self, account_id: Uuid, accounts: Vec<Uuid>) {
        let mut ctx = self.provider.context.write();
        ctx.account_id = Some(account_id);
        ctx.accounts = accounts;
    }

    /// Clears the context if it belongs to `user_id`.
    pub fn clear_for_user(&self, user_id: Uuid) {
        let mut ctx = self.provider.context.write();
        if ctx.user_id == Some(user_id) {
            *ctx = UserContext::anonymous();
        }
    }

    /// Deselects `account_id` if it is the current account and forgets it
    /// from the membership list. The user id is preserved.
    pub fn forget_account(&self, account_id: Uuid) {
        let mut ctx = self.provider.context.write();
        if ctx.account_id == Some(account_id) {
            ctx.account_id = None;
        }
        ctx.accounts.retain(|a| *a != account_id);
    }
}
