//! Revision tokens for optimistic concurrency.

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};

/// An entity whose stored form carries a revision token.
///
/// The revision starts at 1 when the record is first stored and is incremented
/// by exactly one on every successful mutation.
pub trait Versioned: Entity {
    fn revision(&self) -> u64;
}

/// Optimistic concurrency expectation for a stored record.
///
/// A writer reads revision `R`, computes the new state and commits only if the
/// stored revision is still `R`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ExpectedRevision(u64);

impl ExpectedRevision {
    pub fn exact(revision: u64) -> Self {
        Self(revision)
    }

    /// Expect the revision `record` was read at.
    pub fn of<T: Versioned>(record: &T) -> Self {
        Self(record.revision())
    }

    pub fn value(self) -> u64 {
        self.0
    }

    pub fn matches(self, actual: u64) -> bool {
        self.0 == actual
    }

    pub fn check(self, actual: u64) -> DomainResult<()> {
        if self.matches(actual) {
            Ok(())
        } else {
            Err(DomainError::conflict(format!(
                "optimistic concurrency check failed (expected: {}, actual: {actual})",
                self.0
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_reports_conflict_on_mismatch() {
        assert!(ExpectedRevision::exact(3).check(3).is_ok());
        assert!(matches!(
            ExpectedRevision::exact(3).check(4),
            Err(DomainError::Conflict(_))
        ));
    }
}
