//! JWT access token issuance/verification.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;

/// JWT claims embedded in every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject: the user ID (UUID string).
    pub sub: String,
    /// Selected account ID, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp).
    pub exp: i64,
    /// Unique token ID (UUID string).
    pub jti: String,
}

impl AccessTokenClaims {
    pub fn user_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.sub).map_err(|e| AuthError::TokenInvalid(format!("bad sub: {e}")))
    }

    pub fn token_id(&self) -> Result<Uuid, AuthError> {
        Uuid::parse_str(&self.jti).map_err(|e| AuthError::TokenInvalid(format!("bad jti: {e}")))
    }

    pub fn account(&self) -> Result<Option<Uuid>, AuthError> {
        self.account_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| AuthError::TokenInvalid(format!("bad account_id: {e}")))
    }
}

/// A freshly signed token and the identifiers it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Issue a signed EdDSA (Ed25519) JWT access token.
pub fn issue_access_token(
    user_id: Uuid,
    account_id: Option<Uuid>,
    config: &AuthConfig,
) -> Result<IssuedToken, AuthError> {
    let issued_at = Utc::now();
    let expires_at = i64::try_from(config.token_lifetime_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)
        .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
        .ok_or_else(|| {
            AuthError::Crypto(format!(
                "token lifetime of {}s is out of range",
                config.token_lifetime_secs
            ))
        })?;
    let token_id = Uuid::new_v4();
    let claims = AccessTokenClaims {
        sub: user_id.to_string(),
        account_id: account_id.map(|a| a.to_string()),
        iss: config.jwt_issuer.clone(),
        aud: config.jwt_audience.clone(),
        iat: issued_at.timestamp(),
        exp: expires_at.timestamp(),
        jti: token_id.to_string(),
    };

    let key = EncodingKey::from_ed_pem(config.jwt_private_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad private key: {e}")))?;

    let header = Header::new(Algorithm::EdDSA);
    let token = jsonwebtoken::encode(&header, &claims, &key)
        .map_err(|e| AuthError::Crypto(format!("JWT encode: {e}")))?;

    Ok(IssuedToken {
        token,
        token_id,
        issued_at,
        expires_at,
    })
}

/// Decode and verify an EdDSA JWT access token (signature, expiry,
/// issuer, audience). Purely stateless: revocation is checked by the
/// caller against the token store.
pub fn decode_access_token(
    token: &str,
    config: &AuthConfig,
) -> Result<AccessTokenClaims, AuthError> {
    let key = DecodingKey::from_ed_pem(config.jwt_public_key_pem.as_bytes())
        .map_err(|e| AuthError::Crypto(format!("bad public key: {e}")))?;

    let mut validation = Validation::new(Algorithm::EdDSA);
    validation.set_issuer(&[&config.jwt_issuer]);
    validation.set_audience(&[&config.jwt_audience]);
    validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

    jsonwebtoken::decode::<AccessTokenClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::TokenInvalid(e.to_string()),
        })
}

/// SHA-256 hash of an encoded token, hex-encoded.
///
/// This is the value stored server-side as `AuthToken::token_hash`.
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}
