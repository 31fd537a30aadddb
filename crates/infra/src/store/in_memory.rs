use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use stockhold_core::{ExpectedRevision, ReservationId, Versioned};
use stockhold_inventory::{Reservation, StockItem};

use super::r#trait::{ReservationStore, StoreError, VersionedStore};

/// In-memory stock records.
pub type InMemoryStockStore = InMemoryStore<StockItem>;

/// Validate a compare-and-swap against the currently stored record.
fn check_swap<T: Versioned>(
    current: Option<&T>,
    next: &T,
    expected: ExpectedRevision,
) -> Result<(), StoreError> {
    let current = current.ok_or(StoreError::NotFound)?;
    if !expected.matches(current.revision()) {
        return Err(StoreError::Conflict {
            expected: expected.value(),
            actual: current.revision(),
        });
    }
    if next.revision() != expected.value() + 1 {
        return Err(StoreError::InvalidWrite(format!(
            "revision must advance from {} to {}, got {}",
            expected.value(),
            expected.value() + 1,
            next.revision()
        )));
    }
    Ok(())
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// In-memory keyed store for any revisioned record.
///
/// Intended for tests/dev and single-process deployments.
#[derive(Debug)]
pub struct InMemoryStore<T: Versioned> {
    records: RwLock<HashMap<T::Id, T>>,
}

impl<T: Versioned> InMemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<T: Versioned> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> VersionedStore<T> for InMemoryStore<T>
where
    T: Versioned + Clone + Send + Sync,
    T::Id: Send + Sync,
{
    fn get(&self, id: &T::Id) -> Result<Option<T>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(id).cloned())
    }

    fn insert(&self, record: T) -> Result<T, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        if records.contains_key(record.id()) {
            return Err(StoreError::Duplicate);
        }
        records.insert(record.id().clone(), record.clone());
        Ok(record)
    }

    fn compare_and_swap(&self, next: T, expected: ExpectedRevision) -> Result<T, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        check_swap(records.get(next.id()), &next, expected)?;
        records.insert(next.id().clone(), next.clone());
        Ok(next)
    }
}

#[derive(Debug, Default)]
struct ReservationTable {
    records: HashMap<ReservationId, Reservation>,
    /// `(expires_at, id)` of every reservation still `PENDING`.
    pending_by_expiry: BTreeSet<(DateTime<Utc>, ReservationId)>,
}

/// In-memory reservation records with a pending-by-expiry index.
///
/// Records are never deleted; terminal reservations stay as an audit trail.
#[derive(Debug, Default)]
pub struct InMemoryReservationStore {
    inner: RwLock<ReservationTable>,
}

impl InMemoryReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reservations, in any state.
    pub fn len(&self) -> Result<usize, StoreError> {
        let table = self.inner.read().map_err(|_| poisoned())?;
        Ok(table.records.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Snapshot of every stored reservation.
    pub fn all(&self) -> Result<Vec<Reservation>, StoreError> {
        let table = self.inner.read().map_err(|_| poisoned())?;
        Ok(table.records.values().cloned().collect())
    }
}

impl VersionedStore<Reservation> for InMemoryReservationStore {
    fn get(&self, id: &ReservationId) -> Result<Option<Reservation>, StoreError> {
        let table = self.inner.read().map_err(|_| poisoned())?;
        Ok(table.records.get(id).cloned())
    }

    fn insert(&self, record: Reservation) -> Result<Reservation, StoreError> {
        let mut table = self.inner.write().map_err(|_| poisoned())?;
        let id = record.reservation_id();
        if table.records.contains_key(&id) {
            return Err(StoreError::Duplicate);
        }
        if record.is_pending() {
            table.pending_by_expiry.insert((record.expires_at(), id));
        }
        table.records.insert(id, record.clone());
        Ok(record)
    }

    fn compare_and_swap(
        &self,
        next: Reservation,
        expected: ExpectedRevision,
    ) -> Result<Reservation, StoreError> {
        let mut table = self.inner.write().map_err(|_| poisoned())?;
        let id = next.reservation_id();
        check_swap(table.records.get(&id), &next, expected)?;

        let previous_key = table.records.get(&id).map(|p| (p.expires_at(), id));
        if let Some(key) = previous_key {
            table.pending_by_expiry.remove(&key);
        }
        if next.is_pending() {
            table.pending_by_expiry.insert((next.expires_at(), id));
        }
        table.records.insert(id, next.clone());
        Ok(next)
    }
}

impl ReservationStore for InMemoryReservationStore {
    fn pending_expiring_before(&self, now: DateTime<Utc>) -> Result<Vec<Reservation>, StoreError> {
        let table = self.inner.read().map_err(|_| poisoned())?;
        Ok(table
            .pending_by_expiry
            .iter()
            .take_while(|(expires_at, _)| *expires_at < now)
            .filter_map(|(_, id)| table.records.get(id))
            .filter(|r| r.is_sweepable(now))
            .cloned()
            .collect())
    }
}
