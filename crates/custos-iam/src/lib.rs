//! Custos IAM: authorization, the ownership invariant, domain processors
//! and the decorated orchestration services.

pub mod authorization;
pub mod decorator;
pub mod defaults;
pub mod ownership;
pub mod processor;
pub mod service;
mod stack;

pub use authorization::AuthorizationProvider;
pub use decorator::{Authorized, Logged};
pub use ownership::{OwnershipProcessor, SoleOwnership};
pub use service::{
    DeregistrationService, ModificationService, RegistrationService, RetrievalService,
};
pub use stack::{IamStack, Layered, layer};
