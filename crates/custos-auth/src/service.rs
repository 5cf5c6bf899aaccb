//! Authentication service: sign-in, sign-out and session handling.

use chrono::Utc;
use custos_core::context::{UserContext, UserContextProvider, UserContextSetter};
use custos_core::error::{CustosError, CustosResult};
use custos_core::models::token::{AuthToken, CreateAuthToken};
use custos_core::models::user::User;
use custos_core::repository::{
    AccountRepository, CredentialRepository, Repositories, TokenRepository, Transaction,
    UnitOfWork, UserRepository, finish,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::AuthConfig;
use crate::password;
use crate::token::{self, IssuedToken};

/// Input for the sign-in flow.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignIn {
    #[validate(length(min = 1, max = 255))]
    pub username: String,
    #[validate(length(min = 1, max = 1024))]
    pub password: String,
    /// Account to scope the token to. Defaults to the user's first account.
    pub account_id: Option<Uuid>,
    pub device_id: Option<String>,
}

/// Successful sign-in (or account switch) result.
#[derive(Debug, Clone, Serialize)]
pub struct SignInOutput {
    /// Signed JWT access token.
    #[serde(skip_serializing)]
    pub token: String,
    pub token_id: Uuid,
    pub user_id: Uuid,
    pub account_id: Option<Uuid>,
    pub expires_at: chrono::DateTime<Utc>,
}

/// Session boundary operations. Every method that succeeds rewrites the
/// ambient context through [`UserContextSetter`].
pub trait AuthenticationService: Send + Sync {
    fn sign_in(
        &self,
        ctx: &UserContextProvider,
        input: SignIn,
    ) -> impl Future<Output = CustosResult<SignInOutput>> + Send;

    /// Revokes one token of the current user and clears the context.
    fn sign_out(
        &self,
        ctx: &UserContextProvider,
        token_id: Uuid,
    ) -> impl Future<Output = CustosResult<()>> + Send;

    /// Revokes every outstanding token of the current user.
    fn sign_out_all(&self, ctx: &UserContextProvider)
    -> impl Future<Output = CustosResult<u64>> + Send;

    /// Selects another account the current user belongs to and issues a
    /// token scoped to it.
    fn switch_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
    ) -> impl Future<Output = CustosResult<SignInOutput>> + Send;

    /// Validates a bearer token and populates the context from it.
    fn resume_session(
        &self,
        ctx: &UserContextProvider,
        token: &str,
    ) -> impl Future<Output = CustosResult<UserContext>> + Send;
}

/// Authentication service.
///
/// Generic over the repository bundle so that the auth layer has no
/// dependency on the storage crate.
#[derive(Clone)]
pub struct AuthService<R: Repositories> {
    repos: R,
    config: AuthConfig,
}

impl<R: Repositories> AuthService<R> {
    pub fn new(repos: R, config: AuthConfig) -> Self {
        Self { repos, config }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    async fn account_ids(&self, user_id: Uuid) -> CustosResult<Vec<Uuid>> {
        Ok(self
            .repos
            .accounts()
            .get_user_accounts(user_id)
            .await?
            .into_iter()
            .map(|a| a.id)
            .collect())
    }

    /// Token record and account ids behind a decoded bearer token, after
    /// the revocation, expiry, hash and enabled-user checks.
    async fn verify_session(
        &self,
        raw_token: &str,
        token_id: Uuid,
        user_id: Uuid,
    ) -> CustosResult<(AuthToken, Vec<Uuid>)> {
        let record = self
            .repos
            .tokens()
            .get_by_id(token_id)
            .await
            .map_err(|e| match e {
                CustosError::NotFound { .. } => CustosError::TokenInvalid {
                    reason: "unknown token".into(),
                },
                other => other,
            })?;
        if record.revoked_at.is_some() {
            return Err(CustosError::TokenInvalid {
                reason: "token revoked".into(),
            });
        }
        if !record.is_active(Utc::now()) {
            return Err(CustosError::TokenExpired);
        }
        if record.user_id != user_id || record.token_hash != token::hash_token(raw_token) {
            return Err(CustosError::TokenInvalid {
                reason: "token does not match its record".into(),
            });
        }

        // The user must still be allowed in.
        let user = self.repos.users().get_by_id(user_id).await?;
        if !user.is_enabled {
            return Err(CustosError::UserDisabled { user_id });
        }
        let accounts = self.account_ids(user_id).await?;
        Ok((record, accounts))
    }

    /// Issues a JWT and records it server-side under its `jti`.
    async fn issue(
        &self,
        user: &User,
        account_id: Option<Uuid>,
        device_id: Option<String>,
    ) -> CustosResult<SignInOutput> {
        let IssuedToken {
            token,
            token_id,
            issued_at,
            expires_at,
        } = token::issue_access_token(user.id, account_id, &self.config)?;

        self.repos
            .tokens()
            .create(CreateAuthToken {
                id: token_id,
                user_id: user.id,
                account_id,
                device_id,
                token_hash: token::hash_token(&token),
                issued_at,
                expires_at,
            })
            .await?;

        Ok(SignInOutput {
            token,
            token_id,
            user_id: user.id,
            account_id,
            expires_at,
        })
    }

    fn current_user(ctx: &UserContextProvider) -> CustosResult<Uuid> {
        ctx.user_id()
            .ok_or_else(|| CustosError::unauthorized("no user signed in"))
    }

    /// Steps 1 to 5 of sign-in; runs inside the caller's transaction.
    async fn authenticate(&self, input: &SignIn) -> CustosResult<(SignInOutput, Vec<Uuid>)> {
        // 1. Look up user.
        let user = self.repos.users().get_by_username(&input.username).await?;

        // 2. Check status. Lockout only resets on a successful login.
        if !user.is_enabled {
            warn!(user_id = %user.id, "sign-in rejected: user disabled");
            return Err(CustosError::UserDisabled { user_id: user.id });
        }
        if user.failed_logins_since_last_success >= self.config.max_login_attempts {
            warn!(user_id = %user.id, "sign-in rejected: user locked");
            return Err(CustosError::UserLocked { user_id: user.id });
        }

        // 3. Verify password.
        let credential = self.repos.credentials().get_by_user(user.id).await?;
        let valid = password::verify_password(
            &input.password,
            &credential.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            let user = self.repos.users().record_login_failure(user.id).await?;
            warn!(
                user_id = %user.id,
                failed_since_last_success = user.failed_logins_since_last_success,
                "sign-in rejected: password mismatch"
            );
            return Err(CustosError::PasswordMismatch);
        }
        let user = self.repos.users().record_login_success(user.id).await?;

        // 4. Resolve the account the token is scoped to.
        let accounts = self.account_ids(user.id).await?;
        let account_id = match input.account_id {
            Some(id) if accounts.contains(&id) => Some(id),
            Some(id) => return Err(CustosError::not_found("account", id)),
            None => accounts.first().copied(),
        };

        // 5. Issue token.
        let output = self.issue(&user, account_id, input.device_id.clone()).await?;
        Ok((output, accounts))
    }
}

impl<R: Repositories> AuthenticationService for AuthService<R> {
    async fn sign_in(&self, ctx: &UserContextProvider, input: SignIn) -> CustosResult<SignInOutput> {
        input
            .validate()
            .map_err(|e| CustosError::Validation {
                message: e.to_string(),
            })?;

        let tx = self.repos.unit_of_work().begin(ctx.cancellation()).await?;
        let result = self.authenticate(&input).await;
        let (output, accounts) = match result {
            // The failure counters must survive the rejection.
            Err(CustosError::PasswordMismatch) => {
                tx.commit().await?;
                return Err(CustosError::PasswordMismatch);
            }
            other => finish(tx, other).await?,
        };

        // 6. Set the ambient context once the session is durable.
        UserContextSetter::new(ctx).set(UserContext {
            user_id: Some(output.user_id),
            account_id: output.account_id,
            device_id: input.device_id,
            accounts,
        });

        info!(user_id = %output.user_id, token_id = %output.token_id, "user signed in");
        Ok(output)
    }

    async fn sign_out(&self, ctx: &UserContextProvider, token_id: Uuid) -> CustosResult<()> {
        let user_id = Self::current_user(ctx)?;

        let tx = self.repos.unit_of_work().begin(ctx.cancellation()).await?;
        let result = async {
            let record = self.repos.tokens().get_by_id(token_id).await?;
            if record.user_id != user_id {
                return Err(CustosError::not_found("token", token_id));
            }
            self.repos.tokens().revoke(token_id).await
        }
        .await;
        finish(tx, result).await?;

        UserContextSetter::new(ctx).clear_for_user(user_id);
        info!(user_id = %user_id, token_id = %token_id, "user signed out");
        Ok(())
    }

    async fn sign_out_all(&self, ctx: &UserContextProvider) -> CustosResult<u64> {
        let user_id = Self::current_user(ctx)?;

        let tx = self.repos.unit_of_work().begin(ctx.cancellation()).await?;
        let result = self.repos.tokens().revoke_user_tokens(user_id).await;
        let revoked = finish(tx, result).await?;

        UserContextSetter::new(ctx).clear_for_user(user_id);
        info!(user_id = %user_id, revoked, "user signed out everywhere");
        Ok(revoked)
    }

    async fn switch_account(
        &self,
        ctx: &UserContextProvider,
        account_id: Uuid,
    ) -> CustosResult<SignInOutput> {
        let user_id = Self::current_user(ctx)?;

        let tx = self.repos.unit_of_work().begin(ctx.cancellation()).await?;
        let result = async {
            let user = self.repos.users().get_by_id(user_id).await?;
            if !self.repos.accounts().is_member(account_id, user_id).await? {
                return Err(CustosError::not_found("account", account_id));
            }
            let accounts = self.account_ids(user_id).await?;
            let output = self.issue(&user, Some(account_id), ctx.device_id()).await?;
            Ok((output, accounts))
        }
        .await;
        let (output, accounts) = finish(tx, result).await?;

        UserContextSetter::new(ctx).switch_account(account_id, accounts);

        info!(user_id = %user_id, account_id = %account_id, "account switched");
        Ok(output)
    }

    async fn resume_session(
        &self,
        ctx: &UserContextProvider,
        raw_token: &str,
    ) -> CustosResult<UserContext> {
        // 1. Stateless checks: signature, expiry, issuer, audience.
        let claims = token::decode_access_token(raw_token, &self.config)?;
        let token_id = claims.token_id()?;
        let user_id = claims.user_id()?;
        let account_id = claims.account()?;

        // 2. Stateful checks, inside one unit of work.
        let tx = self.repos.unit_of_work().begin(ctx.cancellation()).await?;
        let result = self.verify_session(raw_token, token_id, user_id).await;
        let (record, accounts) = finish(tx, result).await?;
        let account_id = account_id.filter(|a| accounts.contains(a));

        let context = UserContext {
            user_id: Some(user_id),
            account_id,
            device_id: record.device_id,
            accounts,
        };
        UserContextSetter::new(ctx).set(context.clone());
        Ok(context)
    }
}
