//! Custos DB: in-memory implementation of the repository and
//! unit-of-work traits.
//!
//! This crate provides:
//! - The store handle ([`MemStore`], [`StoreConfig`]) implementing
//!   [`custos_core::repository::Repositories`]
//! - Snapshot transactions ([`MemUnitOfWork`], [`MemTransaction`])
//! - Error types ([`DbError`])

mod error;
pub mod repository;
mod store;
mod unit_of_work;

pub use error::DbError;
pub use store::{MemStore, StoreConfig};
pub use unit_of_work::{MemTransaction, MemUnitOfWork, TransactionStats};
