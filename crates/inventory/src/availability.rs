use serde::{Deserialize, Serialize};

/// Stock level at or below which a low-stock alert fires.
///
/// Fixed policy, not configurable per product.
pub const LOW_STOCK_THRESHOLD: i64 = 10;

pub fn is_low_stock(total: i64) -> bool {
    total <= LOW_STOCK_THRESHOLD
}

/// Customer-facing availability bucket for a stock level.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    #[serde(rename = "Out of Stock")]
    OutOfStock,
    #[serde(rename = "Low Stock")]
    LowStock,
    #[serde(rename = "In Stock")]
    InStock,
}

impl Availability {
    pub fn classify(total: i64) -> Self {
        if total <= 0 {
            Availability::OutOfStock
        } else if total <= LOW_STOCK_THRESHOLD {
            Availability::LowStock
        } else {
            Availability::InStock
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Availability::OutOfStock => "Out of Stock",
            Availability::LowStock => "Low Stock",
            Availability::InStock => "In Stock",
        }
    }
}
