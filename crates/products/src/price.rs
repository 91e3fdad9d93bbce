use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockledger_core::{DomainError, DomainResult};

/// Unit price of a product.
///
/// Fixed-point decimal, never negative. Serialized as a decimal string so it
/// survives JSON and delimited files without binary float drift.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    pub fn new(amount: Decimal) -> DomainResult<Self> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::invalid_argument("price cannot be negative"));
        }
        Ok(Self(amount.normalize()))
    }

    pub fn parse(raw: &str) -> DomainResult<Self> {
        let amount = Decimal::from_str(raw.trim())
            .map_err(|e| DomainError::invalid_argument(format!("price {raw:?}: {e}")))?;
        Self::new(amount)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Exact cost of `units` at this price.
    pub fn times(&self, units: i64) -> DomainResult<Decimal> {
        self.0
            .checked_mul(Decimal::from(units))
            .ok_or_else(|| DomainError::invalid_argument("total cost out of range"))
    }
}

impl core::fmt::Display for Price {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self {
        value.0
    }
}

/// Priced result of a purchase, before any write happens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseQuote {
    pub quantity_purchased: i64,
    pub price_per_unit: Price,
    pub total_cost: Decimal,
}

impl PurchaseQuote {
    pub fn for_units(price: Price, units: i64) -> DomainResult<Self> {
        if units <= 0 {
            return Err(DomainError::invalid_argument(
                "purchase quantity must be positive",
            ));
        }
        Ok(Self {
            quantity_purchased: units,
            price_per_unit: price,
            total_cost: price.times(units)?,
        })
    }
}
