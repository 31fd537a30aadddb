//! Reservation engine (application-level orchestration).
//!
//! The engine drives every reservation through its state machine and pairs
//! each transition with exactly one stock-ledger operation:
//!
//! ```text
//! create             PENDING    withhold quantity   (adjust_stock -q)
//! confirm (in time)  CONFIRMED  nothing             (already withheld)
//! confirm (lapsed)   EXPIRED    release quantity    (adjust_stock +q)
//! sweep              EXPIRED    release quantity    (adjust_stock +q)
//! ```
//!
//! All writes go through the optimistic concurrency controller. Conflicts are
//! retried locally up to `max_attempts`; only exhaustion reaches the caller.
//! Stock releases are the exception: they retry until they land.
//!
//! When a reservation leaves PENDING, its own compare-and-swap is committed
//! before the paired stock release. Only the writer that wins that swap
//! releases, so a confirm racing the sweeper can never release twice.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use stockhold_core::{Clock, ExpectedRevision, ItemCode, ReservationId, SystemClock, Versioned};
use stockhold_inventory::{Reservation, ReservationStatus, StockItem};

use crate::config::EngineConfig;
use crate::controller::{adjust_stock, retry_on_conflict, retry_until_settled};
use crate::error::{ReservationError, ReservationResult};
use crate::store::{
    InMemoryReservationStore, InMemoryStockStore, ReservationStore, StockStore, StoreError,
};

/// Engine over the in-memory stores and the wall clock.
pub type InMemoryEngine = ReservationEngine<InMemoryStockStore, InMemoryReservationStore>;

/// Result of a confirm call.
///
/// `reservation.status()` is `Confirmed`, or `Expired` if the hold lapsed
/// before the confirm arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOutcome {
    pub reservation: Reservation,
    pub remaining_stock: u64,
}

/// Result of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Reservations this sweep moved to EXPIRED.
    pub expired: usize,
    /// Reservations whose expiry failed; they stay PENDING for the next sweep
    /// unless their status was already flipped.
    pub failed: usize,
}

/// Something that can run one expiry sweep "now".
pub trait Sweep: Send + Sync {
    fn sweep_now(&self) -> ReservationResult<SweepReport>;
}

#[derive(Debug)]
pub struct ReservationEngine<S, R, C = SystemClock> {
    stock: S,
    reservations: R,
    clock: C,
    ttl: Duration,
    max_attempts: u32,
}

impl<S, R> ReservationEngine<S, R, SystemClock>
where
    S: StockStore,
    R: ReservationStore,
{
    pub fn new(stock: S, reservations: R, config: &EngineConfig) -> Self {
        Self::with_clock(stock, reservations, SystemClock, config)
    }
}

impl InMemoryEngine {
    pub fn in_memory(config: &EngineConfig) -> Self {
        Self::new(
            InMemoryStockStore::new(),
            InMemoryReservationStore::new(),
            config,
        )
    }
}

impl<S, R, C> ReservationEngine<S, R, C>
where
    S: StockStore,
    R: ReservationStore,
    C: Clock,
{
    pub fn with_clock(stock: S, reservations: R, clock: C, config: &EngineConfig) -> Self {
        // Config validation caps the ttl far below chrono's range.
        let ttl = Duration::from_std(config.reservation_ttl).unwrap_or(Duration::MAX);
        Self {
            stock,
            reservations,
            clock,
            ttl,
            max_attempts: config.max_attempts.max(1),
        }
    }

    pub fn stock_store(&self) -> &S {
        &self.stock
    }

    pub fn reservation_store(&self) -> &R {
        &self.reservations
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Create a PENDING reservation, withholding `quantity` from the item.
    ///
    /// The stock check and the withhold commit as one compare-and-swap on the
    /// item; a lost race re-reads and re-checks.
    pub fn create_reservation(
        &self,
        code: &ItemCode,
        quantity: u64,
    ) -> ReservationResult<Reservation> {
        let now = self.clock.now();
        let opened =
            Reservation::open(ReservationId::new(), code.clone(), quantity, now, self.ttl)?;
        let delta = opened.effect.delta();

        let item = retry_on_conflict("create_reservation", self.max_attempts, |attempt| {
            let item = self.load_item(code)?;
            if item.available_stock() < quantity {
                return Err(ReservationError::InsufficientStock {
                    requested: quantity,
                    available: item.available_stock(),
                });
            }
            debug!(sku = %code, attempt, revision = item.revision(), "withholding stock");
            adjust_stock(&self.stock, code, delta, ExpectedRevision::of(&item), now)
                .map_err(|e| self.stock_error(code, e))
        })?;

        let reservation = match self.reservations.insert(opened.reservation) {
            Ok(r) => r,
            Err(e) => {
                error!(
                    sku = %code,
                    quantity,
                    error = %e,
                    "failed to persist reservation; returning withheld stock"
                );
                self.release_stock(code, quantity, now)?;
                return Err(ReservationError::unexpected(format!(
                    "persist reservation: {e}"
                )));
            }
        };

        info!(
            reservation_id = %reservation.reservation_id(),
            sku = %code,
            quantity,
            remaining_stock = item.available_stock(),
            status = %reservation.status(),
            "created reservation"
        );
        Ok(reservation)
    }

    /// Confirm a PENDING reservation.
    ///
    /// A reservation whose hold has lapsed (`now >= expires_at`) is expired
    /// instead and its quantity released; the EXPIRED record is returned.
    pub fn confirm_reservation(&self, id: ReservationId) -> ReservationResult<ConfirmOutcome> {
        let reservation = retry_on_conflict("confirm_reservation", self.max_attempts, |_| {
            let current = self.load_reservation(id)?;
            let now = self.clock.now();

            if current.is_pending() && current.has_lapsed(now) {
                let expired =
                    self.commit_transition(&current, current.expire(now)?.reservation)?;
                info!(
                    reservation_id = %id,
                    sku = %current.item_code(),
                    "reservation already expired when confirming"
                );
                return Ok(expired);
            }

            let next = current.confirm(now)?.reservation;
            self.commit_transition(&current, next)
        })?;

        if reservation.status() == ReservationStatus::Expired {
            let item = self.release_stock(
                reservation.item_code(),
                reservation.quantity(),
                self.clock.now(),
            )?;
            return Ok(ConfirmOutcome {
                reservation,
                remaining_stock: item.available_stock(),
            });
        }

        let remaining_stock = self.available_stock(reservation.item_code())?;
        info!(
            reservation_id = %id,
            sku = %reservation.item_code(),
            quantity = reservation.quantity(),
            remaining_stock,
            "confirmed reservation"
        );
        Ok(ConfirmOutcome {
            reservation,
            remaining_stock,
        })
    }

    /// Expire every PENDING reservation with `expires_at < now` and release
    /// its stock.
    ///
    /// Each reservation is handled on its own: a failure is logged and counted
    /// and the sweep moves on. Reservations already reconciled by someone else
    /// are skipped, so re-running a sweep is harmless.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> ReservationResult<SweepReport> {
        let due = self.reservations.pending_expiring_before(now)?;
        let mut report = SweepReport::default();

        for reservation in due {
            match self.expire_if_pending(reservation.reservation_id(), now) {
                Ok(Some(expired)) => {
                    report.expired += 1;
                    info!(
                        reservation_id = %expired.reservation_id(),
                        sku = %expired.item_code(),
                        quantity = expired.quantity(),
                        "expired reservation; stock restored"
                    );
                }
                Ok(None) => {}
                Err(e) => {
                    report.failed += 1;
                    warn!(
                        reservation_id = %reservation.reservation_id(),
                        sku = %reservation.item_code(),
                        error = %e,
                        "failed to expire reservation"
                    );
                }
            }
        }

        Ok(report)
    }

    /// Current sellable quantity of an item.
    pub fn available_stock(&self, code: &ItemCode) -> ReservationResult<u64> {
        Ok(self.load_item(code)?.available_stock())
    }

    pub fn get_item(&self, code: &ItemCode) -> ReservationResult<StockItem> {
        self.load_item(code)
    }

    /// Look up a reservation in any state.
    pub fn get_reservation(&self, id: ReservationId) -> ReservationResult<Reservation> {
        self.load_reservation(id)
    }

    /// Catalog maintenance: create the item, or rename it and move its stock
    /// to `available_stock`.
    ///
    /// Stock changes on an existing item go through [`adjust_stock`] like every
    /// other stock mutation.
    pub fn upsert_item(
        &self,
        code: &ItemCode,
        name: &str,
        available_stock: i64,
    ) -> ReservationResult<StockItem> {
        if available_stock < 0 {
            return Err(ReservationError::Validation(
                "available stock cannot be negative".to_string(),
            ));
        }
        let target = available_stock as u64;
        let name = name.trim();

        let item = retry_on_conflict("upsert_item", self.max_attempts, |_| {
            let now = self.clock.now();
            let Some(mut item) = self.stock.get(code)? else {
                return match self.stock.insert(StockItem::new(code.clone(), name, target, now)) {
                    Ok(item) => Ok(item),
                    // Someone else created it first; retry as an update.
                    Err(StoreError::Duplicate) => Err(ReservationError::Conflict),
                    Err(e) => Err(e.into()),
                };
            };

            if !name.is_empty() && item.name() != name {
                item = self
                    .stock
                    .compare_and_swap(item.renamed(name, now), ExpectedRevision::of(&item))?;
            }

            let delta = target as i128 - item.available_stock() as i128;
            if delta == 0 {
                return Ok(item);
            }
            let delta = i64::try_from(delta).map_err(|_| {
                ReservationError::Validation("stock change is too large".to_string())
            })?;
            Ok(adjust_stock(&self.stock, code, delta, ExpectedRevision::of(&item), now)?)
        })?;

        info!(sku = %code, available_stock = item.available_stock(), "upserted item");
        Ok(item)
    }

    /// PENDING -> EXPIRED for the sweep, then release the stock.
    ///
    /// Returns `None` if the reservation is no longer PENDING (confirmed or
    /// expired elsewhere).
    fn expire_if_pending(
        &self,
        id: ReservationId,
        now: DateTime<Utc>,
    ) -> ReservationResult<Option<Reservation>> {
        let expired = retry_on_conflict("expire_reservation", self.max_attempts, |_| {
            let current = self.load_reservation(id)?;
            if !current.is_sweepable(now) {
                return Ok(None);
            }
            let next = current.expire(now)?.reservation;
            self.commit_transition(&current, next).map(Some)
        })?;

        match expired {
            Some(reservation) => {
                self.release_stock(reservation.item_code(), reservation.quantity(), now)?;
                Ok(Some(reservation))
            }
            None => Ok(None),
        }
    }

    /// Return `quantity` to the item's sellable stock.
    ///
    /// Runs after the reservation has already left PENDING, so nobody else
    /// will ever return this quantity. Conflicts are retried until the write
    /// lands; only a non-conflict store failure gives up.
    fn release_stock(
        &self,
        code: &ItemCode,
        quantity: u64,
        now: DateTime<Utc>,
    ) -> ReservationResult<StockItem> {
        let delta = i64::try_from(quantity)
            .map_err(|_| ReservationError::unexpected("release quantity out of range"))?;

        retry_until_settled("release_stock", |_| {
            let item = self.load_item(code)?;
            adjust_stock(&self.stock, code, delta, ExpectedRevision::of(&item), now)
                .map_err(|e| self.stock_error(code, e))
        })
        .inspect_err(|e| {
            error!(sku = %code, quantity, error = %e, "withheld stock was not returned");
        })
    }

    fn commit_transition(
        &self,
        current: &Reservation,
        next: Reservation,
    ) -> ReservationResult<Reservation> {
        self.reservations
            .compare_and_swap(next, ExpectedRevision::of(current))
            .map_err(|e| match e {
                StoreError::NotFound => {
                    ReservationError::reservation_not_found(current.reservation_id())
                }
                other => other.into(),
            })
    }

    fn load_item(&self, code: &ItemCode) -> ReservationResult<StockItem> {
        self.stock
            .get(code)?
            .ok_or_else(|| ReservationError::item_not_found(code))
    }

    fn load_reservation(&self, id: ReservationId) -> ReservationResult<Reservation> {
        self.reservations
            .get(&id)?
            .ok_or_else(|| ReservationError::reservation_not_found(id))
    }

    fn stock_error(&self, code: &ItemCode, e: StoreError) -> ReservationError {
        match e {
            StoreError::NotFound => ReservationError::item_not_found(code),
            other => other.into(),
        }
    }
}

impl<S, R, C> Sweep for ReservationEngine<S, R, C>
where
    S: StockStore,
    R: ReservationStore,
    C: Clock,
{
    fn sweep_now(&self) -> ReservationResult<SweepReport> {
        self.sweep_expired(self.clock.now())
    }
}
