//! Record storage with optimistic concurrency.
//!
//! Every stored record carries a revision token. The only write primitives are
//! `insert` (new records) and `compare_and_swap` (commit a new state only if the
//! stored revision still equals the revision the writer read). The check and
//! the write happen under one lock acquisition, so they are indivisible per
//! record; the lock is never held across a caller's read-compute window.

pub mod in_memory;
pub mod r#trait;

pub use in_memory::{InMemoryReservationStore, InMemoryStockStore, InMemoryStore};
pub use r#trait::{ReservationStore, StockStore, StoreError, VersionedStore};
