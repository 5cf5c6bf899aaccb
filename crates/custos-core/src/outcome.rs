//! Bulk assignment outcomes.
//!
//! Assign-many and remove-many operations validate every id on its own.
//! Valid ids are applied, invalid ones (unknown, foreign to the account,
//! already assigned, not assigned) are reported back. An operation where
//! no id was valid fails with [`CustosError::NoValidIds`] instead.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CustosError, CustosResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BulkStatus {
    Success,
    PartialSuccess,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkOutcome {
    pub status: BulkStatus,
    /// Number of ids applied.
    pub applied: usize,
    pub invalid_ids: Vec<Uuid>,
}

/// Splits requested ids into the ones to apply and the rejected ones.
#[derive(Debug, Default)]
pub struct BulkPlan {
    pub valid: Vec<Uuid>,
    pub invalid: Vec<Uuid>,
}

impl BulkPlan {
    pub fn accept(&mut self, id: Uuid) {
        self.valid.push(id);
    }

    pub fn reject(&mut self, id: Uuid) {
        self.invalid.push(id);
    }

    /// Fails with `NoValidIds` when ids were supplied but none is valid.
    pub fn ensure_any_valid(&self, entity: &str) -> CustosResult<()> {
        if self.valid.is_empty() && !self.invalid.is_empty() {
            return Err(CustosError::NoValidIds {
                entity: entity.into(),
                invalid_ids: self.invalid.clone(),
            });
        }
        Ok(())
    }

    /// Outcome after every valid id has been applied.
    pub fn into_outcome(self) -> BulkOutcome {
        let status = if self.invalid.is_empty() {
            BulkStatus::Success
        } else {
            BulkStatus::PartialSuccess
        };
        BulkOutcome {
            status,
            applied: self.valid.len(),
            invalid_ids: self.invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_success_reports_invalid_ids() {
        let (v1, v2, bad) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let mut plan = BulkPlan::default();
        plan.accept(v1);
        plan.accept(v2);
        plan.reject(bad);
        assert!(plan.ensure_any_valid("role").is_ok());

        let outcome = plan.into_outcome();
        assert_eq!(outcome.status, BulkStatus::PartialSuccess);
        assert_eq!(outcome.applied, 2);
        assert_eq!(outcome.invalid_ids, vec![bad]);
    }

    #[test]
    fn all_invalid_is_an_error() {
        let bad = Uuid::new_v4();
        let mut plan = BulkPlan::default();
        plan.reject(bad);
        let err = plan.ensure_any_valid("user").unwrap_err();
        assert_eq!(
            err,
            CustosError::NoValidIds {
                entity: "user".into(),
                invalid_ids: vec![bad],
            }
        );
    }

    #[test]
    fn empty_request_succeeds_with_nothing_applied() {
        let plan = BulkPlan::default();
        assert!(plan.ensure_any_valid("group").is_ok());
        let outcome = plan.into_outcome();
        assert_eq!(outcome.status, BulkStatus::Success);
        assert_eq!(outcome.applied, 0);
    }
}
