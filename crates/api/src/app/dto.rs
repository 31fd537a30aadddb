use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockhold_infra::ConfirmOutcome;
use stockhold_inventory::{Reservation, ReservationStatus, StockItem};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct UpsertProductRequest {
    pub sku: String,
    #[serde(default)]
    pub name: String,
    pub available_stock: i64,
}

/// `quantity` is signed so a negative value is a validation error rather than
/// a body rejection.
#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub sku: String,
    pub quantity: i64,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    pub sku: String,
    pub name: String,
    pub available_stock: u64,
    pub updated_at: DateTime<Utc>,
}

impl From<&StockItem> for ProductResponse {
    fn from(item: &StockItem) -> Self {
        Self {
            sku: item.code().to_string(),
            name: item.name().to_string(),
            available_stock: item.available_stock(),
            updated_at: item.updated_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StockResponse {
    pub sku: String,
    pub available_stock: u64,
}

#[derive(Debug, Serialize)]
pub struct ReservationResponse {
    pub reservation_id: String,
    pub sku: String,
    pub quantity: u64,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Reservation> for ReservationResponse {
    fn from(r: &Reservation) -> Self {
        Self {
            reservation_id: r.reservation_id().to_string(),
            sku: r.item_code().to_string(),
            quantity: r.quantity(),
            status: r.status(),
            created_at: r.created_at(),
            last_updated_at: r.last_updated_at(),
            expires_at: r.expires_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub reservation_id: String,
    pub status: ReservationStatus,
    pub remaining_stock: u64,
}

impl From<&ConfirmOutcome> for ConfirmResponse {
    fn from(outcome: &ConfirmOutcome) -> Self {
        Self {
            reservation_id: outcome.reservation.reservation_id().to_string(),
            status: outcome.reservation.status(),
            remaining_stock: outcome.remaining_stock,
        }
    }
}
