//! Server configuration loaded from `CUSTOS_*` environment variables.
//!
//! Every variable is optional. Unset values fall back to the library
//! defaults; set but malformed values fail the startup.

use std::env;
use std::str::FromStr;

use custos_auth::AuthConfig;
use custos_db::StoreConfig;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {var}: {message}")]
    InvalidValue { var: String, message: String },
}

/// Initial user, and optionally an account it owns, created at startup.
#[derive(Clone)]
pub struct BootstrapConfig {
    pub username: String,
    pub email: String,
    pub password: String,
    pub account: Option<String>,
}

impl std::fmt::Debug for BootstrapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapConfig")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("account", &self.account)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub auth: AuthConfig,
    pub store: StoreConfig,
    pub bootstrap: Option<BootstrapConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = AuthConfig::default();

        let jwt_private_key_pem = lookup("CUSTOS_JWT_PRIVATE_KEY_PEM").unwrap_or_default();
        let jwt_public_key_pem = lookup("CUSTOS_JWT_PUBLIC_KEY_PEM").unwrap_or_default();
        for (var, pem) in [
            ("CUSTOS_JWT_PRIVATE_KEY_PEM", &jwt_private_key_pem),
            ("CUSTOS_JWT_PUBLIC_KEY_PEM", &jwt_public_key_pem),
        ] {
            if !pem.is_empty() && !pem.contains("-----BEGIN") {
                return Err(ConfigError::InvalidValue {
                    var: var.into(),
                    message: "Must be PEM format (should contain -----BEGIN)".into(),
                });
            }
        }

        let auth = AuthConfig {
            jwt_private_key_pem,
            jwt_public_key_pem,
            jwt_issuer: lookup("CUSTOS_JWT_ISSUER").unwrap_or(defaults.jwt_issuer),
            jwt_audience: lookup("CUSTOS_JWT_AUDIENCE").unwrap_or(defaults.jwt_audience),
            token_lifetime_secs: parsed(&lookup, "CUSTOS_TOKEN_LIFETIME_SECS")?
                .unwrap_or(defaults.token_lifetime_secs),
            pepper: lookup("CUSTOS_PASSWORD_PEPPER").filter(|p| !p.is_empty()),
            max_login_attempts: parsed(&lookup, "CUSTOS_MAX_LOGIN_ATTEMPTS")?
                .unwrap_or(defaults.max_login_attempts),
        };

        Ok(Self {
            auth,
            store: StoreConfig::default(),
            bootstrap: bootstrap(&lookup)?,
        })
    }

    /// Whether tokens can be signed and verified.
    pub fn has_signing_keys(&self) -> bool {
        !self.auth.jwt_private_key_pem.is_empty() && !self.auth.jwt_public_key_pem.is_empty()
    }
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|raw| {
            raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                var: var.into(),
                message: e.to_string(),
            })
        })
        .transpose()
}

/// Bootstrapping is enabled by `CUSTOS_BOOTSTRAP_USERNAME`; the email and
/// password become required once it is set.
fn bootstrap(
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<Option<BootstrapConfig>, ConfigError> {
    let Some(username) = lookup("CUSTOS_BOOTSTRAP_USERNAME") else {
        return Ok(None);
    };
    let required = |var: &str| lookup(var).ok_or_else(|| ConfigError::MissingVar(var.into()));
    Ok(Some(BootstrapConfig {
        username,
        email: required("CUSTOS_BOOTSTRAP_EMAIL")?,
        password: required("CUSTOS_BOOTSTRAP_PASSWORD")?,
        account: lookup("CUSTOS_BOOTSTRAP_ACCOUNT"),
    }))
}
