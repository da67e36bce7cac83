//! Seam to the task that fetches prices from external providers

use crate::currency::FiatPrices;

/// Supplier of the fallback returned when no observation is stored yet
pub trait PriceUpdater: Send + Sync {
    /// Prices to report when the store holds no rows
    fn empty_prices(&self) -> FiatPrices;
}

/// Updater stand-in reporting all-zero prices
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroPriceUpdater;

impl PriceUpdater for ZeroPriceUpdater {
    fn empty_prices(&self) -> FiatPrices {
        FiatPrices::zero()
    }
}
