//! # rusty_prices
//!
//! Historical BTC fiat price storage with derived fiat exchange rates.
//!
//! Observations are sanitized on the way in (out-of-range amounts become
//! `0`, rows without a USD price are dropped) and stored one row per
//! timestamp in SQLite. Reads return the raw series or a [`rates::Conversion`]
//! envelope whose USD-quoted exchange rates are derived from the latest row.
//!
//! ## Example
//!
//! ```rust
//! use rusty_prices::prelude::*;
//!
//! let store = PriceStore::open_in_memory().unwrap();
//! let prices = FiatPrices {
//!     usd: 50_000,
//!     eur: 45_000,
//!     gbp: 40_000,
//!     cad: 60_000,
//!     chf: 48_000,
//!     aud: 70_000,
//!     jpy: 5_000_000,
//! };
//! store.save(1_700_000_000, &prices).unwrap();
//!
//! let conversion = store.nearest_prior_observation(Some(1_700_000_001)).unwrap();
//! assert_eq!(conversion.prices.len(), 1);
//! assert_eq!(conversion.exchange_rates.usdeur, 0.9);
//! ```

pub mod config;
pub mod currency;
pub mod error;
pub mod import;
pub mod observation;
pub mod rates;
pub mod sanitize;
pub mod store;
pub mod updater;

pub mod prelude {
    //! Commonly used types and traits
    pub use crate::config::StoreConfig;
    pub use crate::currency::{Currency, FiatPrices, MISSING_PRICE};
    pub use crate::error::{PriceStoreError, Result};
    pub use crate::observation::{ObservationTimeAndId, PriceObservation};
    pub use crate::rates::{derive_exchange_rates, Conversion, ExchangeRates};
    pub use crate::sanitize::MissingPolicy;
    pub use crate::store::PriceStore;
    pub use crate::updater::{PriceUpdater, ZeroPriceUpdater};
}
