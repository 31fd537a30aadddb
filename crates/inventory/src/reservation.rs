use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use stockhold_core::{DomainError, DomainResult, Entity, ItemCode, ReservationId, Versioned};

/// Lifecycle state of a reservation.
///
/// `Pending` is the only non-terminal state. No transition ever returns to it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Expired,
}

impl ReservationStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ReservationStatus::Pending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Expired => "EXPIRED",
        }
    }
}

impl core::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stock-ledger operation paired with a reservation transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockEffect {
    /// Remove the quantity from sellable stock (create).
    Withhold(u64),
    /// Stock already withheld; nothing to do (confirm).
    Keep,
    /// Return the withheld quantity to sellable stock (expire).
    Release(u64),
}

impl StockEffect {
    /// Signed delta to apply to the item's available stock.
    pub fn delta(self) -> i64 {
        match self {
            StockEffect::Withhold(q) => -(q as i64),
            StockEffect::Keep => 0,
            StockEffect::Release(q) => q as i64,
        }
    }
}

/// Result of a state transition: the next record plus its paired stock effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub reservation: Reservation,
    pub effect: StockEffect,
}

/// A time-bounded claim on `quantity` units of one item.
///
/// While `Pending`, the quantity is already withheld from the item's sellable
/// stock. Once the reservation leaves `Pending` it is immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    id: ReservationId,
    item_code: ItemCode,
    quantity: u64,
    status: ReservationStatus,
    created_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revision: u64,
}

impl Reservation {
    /// Open a new pending reservation expiring `ttl` after `now`.
    ///
    /// The returned transition carries the withhold that must be applied to the
    /// item's stock before the reservation is stored.
    pub fn open(
        id: ReservationId,
        item_code: ItemCode,
        quantity: u64,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> DomainResult<Transition> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        if quantity > i64::MAX as u64 {
            return Err(DomainError::validation("quantity is too large"));
        }
        if ttl <= Duration::zero() {
            return Err(DomainError::validation("reservation ttl must be positive"));
        }
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| DomainError::validation("reservation ttl is too large"))?;

        let reservation = Self {
            id,
            item_code,
            quantity,
            status: ReservationStatus::Pending,
            created_at: now,
            last_updated_at: now,
            expires_at,
            revision: 1,
        };

        Ok(Transition {
            reservation,
            effect: StockEffect::Withhold(quantity),
        })
    }

    /// Copy of the id; `Entity::id` hands out a reference.
    pub fn reservation_id(&self) -> ReservationId {
        self.id
    }

    pub fn item_code(&self) -> &ItemCode {
        &self.item_code
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn status(&self) -> ReservationStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_updated_at(&self) -> DateTime<Utc> {
        self.last_updated_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReservationStatus::Pending
    }

    /// True once the hold can no longer be confirmed (`now >= expires_at`).
    pub fn has_lapsed(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Sweep predicate: still pending and strictly past its expiry.
    pub fn is_sweepable(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.expires_at < now
    }

    /// PENDING -> CONFIRMED. The stock was withheld at creation, so the
    /// effect is [`StockEffect::Keep`].
    pub fn confirm(&self, now: DateTime<Utc>) -> DomainResult<Transition> {
        self.ensure_pending("confirmed")?;
        if self.has_lapsed(now) {
            return Err(DomainError::invalid_state("reservation has lapsed"));
        }
        Ok(Transition {
            reservation: self.advance(ReservationStatus::Confirmed, now),
            effect: StockEffect::Keep,
        })
    }

    /// PENDING -> EXPIRED, releasing the held quantity.
    pub fn expire(&self, now: DateTime<Utc>) -> DomainResult<Transition> {
        self.ensure_pending("expired")?;
        Ok(Transition {
            reservation: self.advance(ReservationStatus::Expired, now),
            effect: StockEffect::Release(self.quantity),
        })
    }

    fn ensure_pending(&self, verb: &str) -> DomainResult<()> {
        if self.is_pending() {
            Ok(())
        } else {
            Err(DomainError::invalid_state(format!(
                "only PENDING reservations can be {verb} (current: {})",
                self.status
            )))
        }
    }

    fn advance(&self, status: ReservationStatus, now: DateTime<Utc>) -> Self {
        Self {
            status,
            last_updated_at: now,
            revision: self.revision + 1,
            ..self.clone()
        }
    }
}

impl Entity for Reservation {
    type Id = ReservationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Versioned for Reservation {
    fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_code() -> ItemCode {
        ItemCode::new("SKU1").unwrap()
    }

    fn test_ttl() -> Duration {
        Duration::minutes(5)
    }

    fn open(quantity: u64, now: DateTime<Utc>) -> Reservation {
        Reservation::open(ReservationId::new(), test_code(), quantity, now, test_ttl())
            .unwrap()
            .reservation
    }

    #[test]
    fn open_emits_pending_with_withhold() {
        let now = Utc::now();
        let t = Reservation::open(ReservationId::new(), test_code(), 7, now, test_ttl()).unwrap();

        assert_eq!(t.effect, StockEffect::Withhold(7));
        assert_eq!(t.effect.delta(), -7);
        assert_eq!(t.reservation.status(), ReservationStatus::Pending);
        assert_eq!(t.reservation.expires_at(), now + test_ttl());
        assert_eq!(t.reservation.revision(), 1);
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let err = Reservation::open(ReservationId::new(), test_code(), 0, Utc::now(), test_ttl())
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn confirm_keeps_stock_untouched() {
        let now = Utc::now();
        let r = open(3, now);
        let t = r.confirm(now + Duration::seconds(10)).unwrap();

        assert_eq!(t.effect, StockEffect::Keep);
        assert_eq!(t.effect.delta(), 0);
        assert_eq!(t.reservation.status(), ReservationStatus::Confirmed);
        assert_eq!(t.reservation.revision(), 2);
    }

    #[test]
    fn confirm_at_exact_expiry_is_lapsed() {
        let now = Utc::now();
        let r = open(3, now);
        let err = r.confirm(r.expires_at()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn expire_releases_quantity() {
        let now = Utc::now();
        let r = open(4, now);
        let t = r.expire(now + Duration::minutes(6)).unwrap();
        assert_eq!(t.effect, StockEffect::Release(4));
        assert_eq!(t.reservation.status(), ReservationStatus::Expired);
    }

    #[test]
    fn terminal_reservations_reject_every_transition() {
        let now = Utc::now();
        let confirmed = open(1, now).confirm(now).unwrap().reservation;
        let expired = open(1, now).expire(now).unwrap().reservation;

        for r in [confirmed, expired] {
            assert!(matches!(r.confirm(now), Err(DomainError::InvalidState(_))));
            assert!(matches!(r.expire(now), Err(DomainError::InvalidState(_))));
        }
    }

    #[test]
    fn sweep_predicate_is_strict() {
        let now = Utc::now();
        let r = open(1, now);
        assert!(!r.is_sweepable(r.expires_at()));
        assert!(r.is_sweepable(r.expires_at() + Duration::milliseconds(1)));
        assert!(r.has_lapsed(r.expires_at()));
    }

    #[test]
    fn status_serializes_upper_case() {
        let json = serde_json::to_string(&ReservationStatus::Confirmed).unwrap();
        assert_eq!(json, "\"CONFIRMED\"");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Open(u64),
        Confirm(usize),
        Expire(usize),
        Advance(i64),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u64..8).prop_map(Op::Open),
            (0usize..16).prop_map(Op::Confirm),
            (0usize..16).prop_map(Op::Expire),
            (1i64..400).prop_map(Op::Advance),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: applying every transition's stock effect keeps
        /// `available + pending + confirmed == initial`, and no reservation
        /// ever leaves a terminal state.
        #[test]
        fn stock_effects_conserve_quantity(
            initial in 0u64..40,
            ops in prop::collection::vec(op_strategy(), 1..60)
        ) {
            let mut now = Utc::now();
            let mut available = initial as i64;
            let mut reservations: Vec<Reservation> = Vec::new();

            for op in ops {
                match op {
                    Op::Open(q) => {
                        let id = ReservationId::new();
                        let t = Reservation::open(id, test_code(), q, now, test_ttl()).unwrap();
                        if available + t.effect.delta() >= 0 {
                            available += t.effect.delta();
                            reservations.push(t.reservation);
                        }
                    }
                    Op::Confirm(_) | Op::Expire(_) if reservations.is_empty() => {}
                    Op::Confirm(i) => {
                        let idx = i % reservations.len();
                        let before = reservations[idx].status();
                        match reservations[idx].confirm(now) {
                            Ok(t) => {
                                prop_assert_eq!(before, ReservationStatus::Pending);
                                available += t.effect.delta();
                                reservations[idx] = t.reservation;
                            }
                            Err(e) => prop_assert!(matches!(e, DomainError::InvalidState(_))),
                        }
                    }
                    Op::Expire(i) => {
                        let idx = i % reservations.len();
                        let before = reservations[idx].status();
                        match reservations[idx].expire(now) {
                            Ok(t) => {
                                prop_assert_eq!(before, ReservationStatus::Pending);
                                available += t.effect.delta();
                                reservations[idx] = t.reservation;
                            }
                            Err(e) => {
                                prop_assert!(before.is_terminal());
                                prop_assert!(matches!(e, DomainError::InvalidState(_)));
                            }
                        }
                    }
                    Op::Advance(secs) => now += Duration::seconds(secs),
                }

                let held: i64 = reservations
                    .iter()
                    .filter(|r| r.status() != ReservationStatus::Expired)
                    .map(|r| r.quantity() as i64)
                    .sum();
                prop_assert!(available >= 0);
                prop_assert_eq!(available + held, initial as i64);
            }
        }
    }
}
