//! Optimistic concurrency controller.
//!
//! [`adjust_stock`] is the sole mutation path for an item's available stock.
//! [`retry_on_conflict`] wraps a read-compute-commit step and re-runs it when
//! the commit loses a revision race. [`retry_until_settled`] does the same
//! without a budget, for writes that must not be abandoned.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use stockhold_core::{DomainError, ExpectedRevision, ItemCode, Versioned};
use stockhold_inventory::StockItem;

use crate::error::{ReservationError, ReservationResult};
use crate::store::{StockStore, StoreError};

/// Apply `delta` to the item's available stock if its revision is still `expected`.
///
/// Fails with [`StoreError::Conflict`] when another writer got there first and
/// with [`StoreError::InsufficientStock`] when a negative delta would take the
/// stock below zero. A successful call bumps the revision by exactly one.
pub fn adjust_stock<S>(
    store: &S,
    code: &ItemCode,
    delta: i64,
    expected: ExpectedRevision,
    now: DateTime<Utc>,
) -> Result<StockItem, StoreError>
where
    S: StockStore + ?Sized,
{
    let current = store.get(code)?.ok_or(StoreError::NotFound)?;
    if !expected.matches(current.revision()) {
        return Err(StoreError::Conflict {
            expected: expected.value(),
            actual: current.revision(),
        });
    }

    let next = current.adjusted(delta, now).map_err(|e| match e {
        DomainError::InsufficientStock {
            requested,
            available,
        } => StoreError::InsufficientStock {
            requested,
            available,
        },
        other => StoreError::InvalidWrite(other.to_string()),
    })?;

    store.compare_and_swap(next, expected)
}

/// Run `step` until it succeeds, fails with a non-conflict error, or
/// `max_attempts` conflicts have been seen.
///
/// There is no delay between attempts; critical sections are short.
pub fn retry_on_conflict<T>(
    operation: &'static str,
    max_attempts: u32,
    mut step: impl FnMut(u32) -> ReservationResult<T>,
) -> ReservationResult<T> {
    let max_attempts = max_attempts.max(1);
    for attempt in 1..=max_attempts {
        match step(attempt) {
            Err(ReservationError::Conflict) => {
                debug!(operation, attempt, "optimistic concurrency conflict");
            }
            other => return other,
        }
    }

    warn!(operation, attempts = max_attempts, "conflict retry budget exhausted");
    Err(ReservationError::Conflict)
}

/// Run `step` until it succeeds or fails with a non-conflict error.
///
/// Only for steps whose conflicts are always transient, such as returning
/// stock (a positive delta can never be refused). The thread yields between
/// attempts so the competing writer can finish.
pub fn retry_until_settled<T>(
    operation: &'static str,
    mut step: impl FnMut(u32) -> ReservationResult<T>,
) -> ReservationResult<T> {
    let mut attempt: u32 = 1;
    loop {
        match step(attempt) {
            Err(ReservationError::Conflict) => {
                debug!(operation, attempt, "optimistic concurrency conflict");
                if attempt % 64 == 0 {
                    warn!(operation, attempts = attempt, "write still contended");
                }
                std::thread::yield_now();
                attempt = attempt.saturating_add(1);
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStockStore, VersionedStore};

    fn code() -> ItemCode {
        ItemCode::new("SKU1").unwrap()
    }

    fn seeded(stock: u64) -> InMemoryStockStore {
        let store = InMemoryStockStore::new();
        store
            .insert(StockItem::new(code(), "Widget", stock, Utc::now()))
            .unwrap();
        store
    }

    #[test]
    fn adjust_with_current_revision_succeeds() {
        let store = seeded(10);
        let item =
            adjust_stock(&store, &code(), -4, ExpectedRevision::exact(1), Utc::now()).unwrap();
        assert_eq!(item.available_stock(), 6);
        assert_eq!(item.revision(), 2);
    }

    #[test]
    fn adjust_with_stale_revision_conflicts() {
        let store = seeded(10);
        adjust_stock(&store, &code(), -1, ExpectedRevision::exact(1), Utc::now()).unwrap();

        let err =
            adjust_stock(&store, &code(), -1, ExpectedRevision::exact(1), Utc::now()).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.get(&code()).unwrap().unwrap().available_stock(), 9);
    }

    #[test]
    fn adjust_below_zero_is_insufficient_stock() {
        let store = seeded(3);
        let err =
            adjust_stock(&store, &code(), -5, ExpectedRevision::exact(1), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            StoreError::InsufficientStock {
                requested: 5,
                available: 3
            }
        );
        let item = store.get(&code()).unwrap().unwrap();
        assert_eq!(item.available_stock(), 3);
        assert_eq!(item.revision(), 1);
    }

    #[test]
    fn adjust_unknown_item_is_not_found() {
        let store = InMemoryStockStore::new();
        let err =
            adjust_stock(&store, &code(), 1, ExpectedRevision::exact(1), Utc::now()).unwrap_err();
        assert_eq!(err, StoreError::NotFound);
    }

    #[test]
    fn retry_stops_after_budget() {
        let mut calls = 0;
        let result: ReservationResult<()> = retry_on_conflict("test", 3, |_| {
            calls += 1;
            Err(ReservationError::Conflict)
        });
        assert_eq!(result, Err(ReservationError::Conflict));
        assert_eq!(calls, 3);
    }

    #[test]
    fn retry_returns_first_non_conflict_outcome() {
        let result = retry_on_conflict("test", 5, |attempt| {
            if attempt < 3 {
                Err(ReservationError::Conflict)
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result, Ok(3));

        let result: ReservationResult<()> =
            retry_on_conflict("test", 5, |_| Err(ReservationError::Validation("bad".into())));
        assert!(matches!(result, Err(ReservationError::Validation(_))));
    }

    #[test]
    fn settled_retry_outlasts_any_budget() {
        let result = retry_until_settled("test", |attempt| {
            if attempt < 500 {
                Err(ReservationError::Conflict)
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result, Ok(500));

        let result: ReservationResult<()> =
            retry_until_settled("test", |_| Err(ReservationError::item_not_found("SKU1")));
        assert!(matches!(result, Err(ReservationError::NotFound(_))));
    }
}
