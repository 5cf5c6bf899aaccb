//! First-run provisioning of an initial user and account.

use custos_auth::{AuthenticationService, SignIn};
use custos_core::context::{UserContext, UserContextProvider};
use custos_core::error::CustosResult;
use custos_core::models::account::CreateAccount;
use custos_core::models::user::RegisterUser;
use custos_core::repository::Repositories;
use custos_iam::{IamStack, RegistrationService};
use tracing::info;

use crate::config::BootstrapConfig;

/// Registers the bootstrap user, then the bootstrap account owned by it.
/// With signing keys configured, also signs the user in to prove the
/// credential round-trips.
pub async fn run<R: Repositories>(
    stack: &IamStack<R>,
    config: &BootstrapConfig,
    sign_in: bool,
) -> CustosResult<()> {
    let anonymous = UserContextProvider::anonymous();
    let user = stack
        .registration
        .register_user(
            &anonymous,
            RegisterUser {
                username: config.username.clone(),
                email: config.email.clone(),
                password: config.password.clone(),
            },
        )
        .await?;
    info!(user_id = %user.id, username = %user.username, "bootstrap user created");

    let mut account_id = None;
    if let Some(name) = &config.account {
        let ctx = UserContextProvider::new(UserContext::for_user(user.id));
        let account = stack
            .registration
            .register_account(&ctx, CreateAccount { name: name.clone() })
            .await?;
        info!(account_id = %account.id, name = %account.name, "bootstrap account created");
        account_id = Some(account.id);
    }

    if sign_in {
        let session = stack
            .authentication
            .sign_in(
                &anonymous,
                SignIn {
                    username: config.username.clone(),
                    password: config.password.clone(),
                    account_id,
                    device_id: None,
                },
            )
            .await?;
        info!(
            token_id = %session.token_id,
            expires_at = %session.expires_at,
            "bootstrap sign-in succeeded"
        );
    }
    Ok(())
}
