//! Ingestion sanity check for incoming price observations
//!
//! Out-of-range amounts are never an error: they are logged and replaced
//! with `0`. Rows whose USD amount is missing are dropped before they reach
//! the store, since every derived rate is quoted against USD.

use crate::currency::{Currency, FiatPrices, MISSING_PRICE};
use serde::{Deserialize, Serialize};

/// How a non-USD missing sentinel is stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPolicy {
    /// Store `-1` as-is; it passes the `[-1, MAX]` bound check
    #[default]
    Preserve,
    /// Store `-1` as `0` ("no data")
    Zero,
}

impl MissingPolicy {
    /// Parse from config text (`preserve` or `zero`)
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "preserve" => Some(MissingPolicy::Preserve),
            "zero" => Some(MissingPolicy::Zero),
            _ => None,
        }
    }
}

/// Whether an amount lies within `[-1, MAX]` for its currency
pub fn is_within_bounds(currency: Currency, amount: i64) -> bool {
    (MISSING_PRICE..=currency.max_price()).contains(&amount)
}

/// Sanitize an observation for storage
///
/// Returns `None` when the USD amount is missing and the row must be
/// skipped.
pub fn sanitize_prices(prices: &FiatPrices, policy: MissingPolicy) -> Option<FiatPrices> {
    if prices.is_usd_missing() {
        return None;
    }

    let mut clean = *prices;
    for (currency, amount) in prices.iter() {
        if !is_within_bounds(currency, amount) {
            log::info!("Ignore BTC{} price of {}", currency, amount);
            clean.set(currency, 0);
        } else if amount == MISSING_PRICE && policy == MissingPolicy::Zero {
            clean.set(currency, 0);
        }
    }
    Some(clean)
}
