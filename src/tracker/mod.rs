//! Price tracking
//!
//! Last-known price per symbol and the percent change of each new tick
//! against the immediately preceding price.

mod price;

pub use price::{ChangeDirection, PriceState, PriceTracker};
