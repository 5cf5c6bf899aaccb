//! Custos Core: domain models, error taxonomy, repository traits and the
//! ambient user context shared by every other crate.

pub mod context;
pub mod error;
pub mod models;
pub mod outcome;
pub mod repository;

pub use context::{UserContext, UserContextProvider, UserContextSetter};
pub use error::{CustosError, CustosResult};
pub use outcome::{BulkOutcome, BulkStatus};
