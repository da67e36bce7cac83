//! Stored price observation rows

use crate::currency::FiatPrices;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored row: BTC fiat prices at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Auto-increment row id
    pub id: i64,
    /// Unix timestamp (seconds)
    pub time: i64,
    #[serde(flatten)]
    pub prices: FiatPrices,
}

impl PriceObservation {
    /// Observation time as a UTC datetime, if representable
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.time, 0)
    }
}

/// Time, id and USD amount of a stored row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationTimeAndId {
    pub time: i64,
    pub id: i64,
    #[serde(rename = "USD")]
    pub usd: i64,
}
