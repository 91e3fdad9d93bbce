//! Application boundary: explicit service wiring and the tagged `Outcome`
//! every externally-facing call returns.

pub mod cli;
pub mod outcome;
pub mod services;

pub use outcome::{ErrorCategory, Outcome};
pub use services::AppServices;
