//! Products domain module (catalog records).
//!
//! Business rules for the product catalog, implemented purely as deterministic
//! domain logic (no IO, no storage). Stock quantities are owned by the ledger;
//! the `quantity` carried here is the cached value.

pub mod price;
pub mod product;
pub mod query;

pub use price::{Price, PurchaseQuote};
pub use product::Product;
pub use query::{select_extremum, Extrema, SpecializedQuery};
