//! Credential and token error types.

use custos_core::error::CustosError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token has expired")]
    TokenExpired,

    #[error("invalid token: {0}")]
    TokenInvalid(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl From<AuthError> for CustosError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExpired => CustosError::TokenExpired,
            AuthError::TokenInvalid(reason) => CustosError::TokenInvalid { reason },
            AuthError::Crypto(msg) => CustosError::Crypto(msg),
        }
    }
}
