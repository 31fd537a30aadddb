use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use stockhold_core::{ExpectedRevision, Versioned};
use stockhold_inventory::{Reservation, StockItem};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The stored revision moved on since the writer read it.
    #[error("revision conflict (expected {expected}, found {actual})")]
    Conflict { expected: u64, actual: u64 },

    /// A stock adjustment would drive available stock below zero.
    #[error("insufficient stock (requested {requested}, available {available})")]
    InsufficientStock { requested: u64, available: u64 },

    #[error("record not found")]
    NotFound,

    #[error("record already exists")]
    Duplicate,

    /// The write does not advance the revision by exactly one.
    #[error("invalid write: {0}")]
    InvalidWrite(String),

    /// The backing storage cannot be used (e.g. a poisoned lock).
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed storage of revisioned records.
pub trait VersionedStore<T: Versioned>: Send + Sync {
    fn get(&self, id: &T::Id) -> Result<Option<T>, StoreError>;

    /// Store a new record. Fails with [`StoreError::Duplicate`] if the id is taken.
    fn insert(&self, record: T) -> Result<T, StoreError>;

    /// Replace the stored record with `next` iff its revision equals `expected`.
    ///
    /// `next` must carry revision `expected + 1`.
    fn compare_and_swap(&self, next: T, expected: ExpectedRevision) -> Result<T, StoreError>;
}

/// Stock records keyed by item code.
pub trait StockStore: VersionedStore<StockItem> {}

impl<S> StockStore for S where S: VersionedStore<StockItem> + ?Sized {}

/// Reservation records keyed by reservation id, with a pending-by-expiry index.
pub trait ReservationStore: VersionedStore<Reservation> {
    /// All `PENDING` reservations with `expires_at < now`, earliest expiry first.
    fn pending_expiring_before(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>, StoreError>;
}

impl<T, S> VersionedStore<T> for Arc<S>
where
    T: Versioned,
    S: VersionedStore<T> + ?Sized,
{
    fn get(&self, id: &T::Id) -> Result<Option<T>, StoreError> {
        (**self).get(id)
    }

    fn insert(&self, record: T) -> Result<T, StoreError> {
        (**self).insert(record)
    }

    fn compare_and_swap(&self, next: T, expected: ExpectedRevision) -> Result<T, StoreError> {
        (**self).compare_and_swap(next, expected)
    }
}

impl<S> ReservationStore for Arc<S>
where
    S: ReservationStore + ?Sized,
{
    fn pending_expiring_before(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>, StoreError> {
        (**self).pending_expiring_before(now)
    }
}
