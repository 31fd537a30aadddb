//! Error surface of the reservation engine.
//!
//! Every failure maps to a stable [`ErrorKind`] plus a human-readable message.
//! Storage detail (revision numbers, lock state) never reaches the message.

use thiserror::Error;

use stockhold_core::DomainError;

use crate::store::StoreError;

pub type ReservationResult<T> = Result<T, ReservationError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReservationError {
    /// Unknown item code or reservation id.
    #[error("{0} not found")]
    NotFound(String),

    /// Non-positive quantity or malformed input.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u64, available: u64 },

    /// The reservation is not in the state the operation requires.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Optimistic concurrency retries were exhausted; retry the whole operation.
    #[error("concurrent modification detected, please retry")]
    Conflict,

    /// Anything else. The detail is for logs only.
    #[error("unexpected error occurred")]
    Unexpected(String),
}

/// Stable machine-readable error code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Validation,
    InsufficientStock,
    InvalidState,
    Conflict,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Validation => "validation_error",
            ErrorKind::InsufficientStock => "insufficient_stock",
            ErrorKind::InvalidState => "invalid_state",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl ReservationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReservationError::NotFound(_) => ErrorKind::NotFound,
            ReservationError::Validation(_) => ErrorKind::Validation,
            ReservationError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            ReservationError::InvalidState(_) => ErrorKind::InvalidState,
            ReservationError::Conflict => ErrorKind::Conflict,
            ReservationError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    pub fn item_not_found(code: impl core::fmt::Display) -> Self {
        Self::NotFound(format!("item {code}"))
    }

    pub fn reservation_not_found(id: impl core::fmt::Display) -> Self {
        Self::NotFound(format!("reservation {id}"))
    }

    pub fn unexpected(detail: impl Into<String>) -> Self {
        Self::Unexpected(detail.into())
    }
}

impl From<DomainError> for ReservationError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::Validation(msg),
            DomainError::NotFound => Self::NotFound("record".to_string()),
            DomainError::InsufficientStock {
                requested,
                available,
            } => Self::InsufficientStock {
                requested,
                available,
            },
            DomainError::InvalidState(msg) => Self::InvalidState(msg),
            DomainError::Conflict(_) => Self::Conflict,
        }
    }
}

impl From<StoreError> for ReservationError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict { .. } => Self::Conflict,
            StoreError::InsufficientStock {
                requested,
                available,
            } => Self::InsufficientStock {
                requested,
                available,
            },
            StoreError::NotFound => Self::NotFound("record".to_string()),
            other => Self::Unexpected(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_conflicts_hide_revisions() {
        let err = ReservationError::from(StoreError::Conflict {
            expected: 4,
            actual: 5,
        });
        assert_eq!(err, ReservationError::Conflict);
        assert!(!err.to_string().contains('4'));
    }

    #[test]
    fn unexpected_message_is_opaque() {
        let err = ReservationError::from(StoreError::Unavailable("lock poisoned".into()));
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert_eq!(err.to_string(), "unexpected error occurred");
    }

    #[test]
    fn domain_kinds_are_preserved() {
        let err = ReservationError::from(DomainError::insufficient_stock(5, 3));
        assert_eq!(err.kind().as_str(), "insufficient_stock");

        let err = ReservationError::from(DomainError::invalid_state("already confirmed"));
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }
}
