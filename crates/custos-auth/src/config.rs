//! Authentication configuration.

/// Configuration for credential verification and token issuance.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// JWT issuer (`iss` claim), the logical name of the issuing processor.
    pub jwt_issuer: String,
    /// JWT audience (`aud` claim), a fixed application identifier.
    pub jwt_audience: String,
    /// Token lifetime in seconds (default: 3600 = 1 hour).
    pub token_lifetime_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id hashing.
    pub pepper: Option<String>,
    /// Failed logins since the last success before the user is locked
    /// (default: 5). Only a successful login resets the streak.
    pub max_login_attempts: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            jwt_issuer: "custos-authentication".into(),
            jwt_audience: "custos".into(),
            token_lifetime_secs: 3600,
            pepper: None,
            max_login_attempts: 5,
        }
    }
}
