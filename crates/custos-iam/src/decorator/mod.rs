//! Cross-cutting wrappers for services and processors.
//!
//! Each wrapper owns its inner component and implements the same traits,
//! so a stack composes as `Authorized<Logged<S>, R>`. A denied
//! authorization check returns `Unauthorized` without calling inward.

mod authorization;
mod logging;
mod processors;

pub use authorization::Authorized;
pub use logging::Logged;
