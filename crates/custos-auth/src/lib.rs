//! Custos Auth: password hashing, JWT issuance/validation and the
//! authentication service.

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use error::AuthError;
pub use service::{AuthService, AuthenticationService, SignIn, SignInOutput};
pub use token::AccessTokenClaims;
