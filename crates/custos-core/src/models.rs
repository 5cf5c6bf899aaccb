//! Domain models for Custos.
//!
//! These are the core types shared across all crates. Every entity except
//! [`user::User`] and [`account::Account`] is scoped to exactly one account.

pub mod account;
pub mod credential;
pub mod group;
pub mod permission;
pub mod role;
pub mod token;
pub mod user;
