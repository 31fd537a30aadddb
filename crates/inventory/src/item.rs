use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockhold_core::{DomainError, DomainResult, Entity, ItemCode, Versioned};

/// Stock record: the sellable quantity of one item.
///
/// `available_stock` is the quantity currently sellable and not under any
/// active hold. It is unsigned, so it can never go negative; every change goes
/// through [`StockItem::adjusted`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockItem {
    code: ItemCode,
    name: String,
    available_stock: u64,
    revision: u64,
    updated_at: DateTime<Utc>,
}

impl StockItem {
    /// A freshly catalogued item at revision 1.
    pub fn new(
        code: ItemCode,
        name: impl Into<String>,
        available_stock: u64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            code,
            name: name.into(),
            available_stock,
            revision: 1,
            updated_at: now,
        }
    }

    pub fn code(&self) -> &ItemCode {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn available_stock(&self) -> u64 {
        self.available_stock
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Compute the record after applying `delta` to the available stock.
    ///
    /// The result carries the next revision. A negative delta larger than the
    /// available stock fails with [`DomainError::InsufficientStock`].
    pub fn adjusted(&self, delta: i64, now: DateTime<Utc>) -> DomainResult<Self> {
        let available_stock = if delta < 0 {
            let requested = delta.unsigned_abs();
            self.available_stock
                .checked_sub(requested)
                .ok_or_else(|| DomainError::insufficient_stock(requested, self.available_stock))?
        } else {
            self.available_stock
                .checked_add(delta as u64)
                .ok_or_else(|| DomainError::validation("stock overflow"))?
        };

        Ok(Self {
            available_stock,
            revision: self.revision + 1,
            updated_at: now,
            ..self.clone()
        })
    }

    /// Same record with a new display name and the next revision.
    pub fn renamed(&self, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            revision: self.revision + 1,
            updated_at: now,
            ..self.clone()
        }
    }
}

impl Entity for StockItem {
    type Id = ItemCode;

    fn id(&self) -> &Self::Id {
        &self.code
    }
}

impl Versioned for StockItem {
    fn revision(&self) -> u64 {
        self.revision
    }
}
