//! Inventory domain module (ledger-derived stock levels).
//!
//! Business rules for stock movements, implemented as deterministic domain
//! logic (no IO, no storage). The infrastructure layer loads ledger entries,
//! rehydrates a [`StockLevel`], asks it to decide, and persists the result.

pub mod availability;
pub mod stock;

pub use availability::{is_low_stock, Availability, LOW_STOCK_THRESHOLD};
pub use stock::{
    AdjustStock, CorrectStock, MovementKind, RecordPurchase, SeedStock, StockCommand, StockLevel,
    StockMovement,
};
