//! Price source implementations.
//!
//! | Adapter | Use |
//! |---------|-----|
//! | [`SchwabAdapter`] | Live Schwab market-data `pricehistory` endpoint |
//! | [`FixturePriceSource`] | Offline series from memory or a JSON file |

mod fixture;
mod schwab;

pub use fixture::FixturePriceSource;
pub use schwab::{parse_price_history, SchwabAdapter, SCHWAB_PRICE_HISTORY_URL};
