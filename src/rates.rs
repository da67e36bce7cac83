//! Fiat-to-fiat exchange rates derived from BTC prices
//!
//! Every rate is quoted against USD: `USDEUR` is how many EUR one USD buys,
//! obtained as the ratio of the BTC/EUR and BTC/USD prices of a single
//! reference row, rounded to two decimals.

use crate::currency::{Currency, FiatPrices};
use crate::observation::PriceObservation;
use serde::{Deserialize, Deserializer, Serialize};

/// USD-quoted exchange rates
///
/// A rate is `NaN` when it could not be derived (reference USD price of
/// zero). `NaN` serializes to JSON `null` and reads back from it. Two
/// `NaN` rates compare equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct ExchangeRates {
    #[serde(deserialize_with = "rate_or_nan")]
    pub usdeur: f64,
    #[serde(deserialize_with = "rate_or_nan")]
    pub usdgbp: f64,
    #[serde(deserialize_with = "rate_or_nan")]
    pub usdcad: f64,
    #[serde(deserialize_with = "rate_or_nan")]
    pub usdchf: f64,
    #[serde(deserialize_with = "rate_or_nan")]
    pub usdaud: f64,
    #[serde(deserialize_with = "rate_or_nan")]
    pub usdjpy: f64,
}

fn rate_or_nan<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl PartialEq for ExchangeRates {
    fn eq(&self, other: &Self) -> bool {
        Currency::FOREIGN.iter().all(|c| {
            let (a, b) = (self.rate(*c), other.rate(*c));
            a == b || (a.is_nan() && b.is_nan())
        })
    }
}

impl ExchangeRates {
    /// Rates that could not be derived: every value is `NaN`
    pub fn undefined() -> Self {
        Self {
            usdeur: f64::NAN,
            usdgbp: f64::NAN,
            usdcad: f64::NAN,
            usdchf: f64::NAN,
            usdaud: f64::NAN,
            usdjpy: f64::NAN,
        }
    }

    /// Rate from USD to `quote`; USD to USD is 1
    pub fn rate(&self, quote: Currency) -> f64 {
        match quote {
            Currency::USD => 1.0,
            Currency::EUR => self.usdeur,
            Currency::GBP => self.usdgbp,
            Currency::CAD => self.usdcad,
            Currency::CHF => self.usdchf,
            Currency::AUD => self.usdaud,
            Currency::JPY => self.usdjpy,
        }
    }

    /// Whether every rate is a finite number
    pub fn is_defined(&self) -> bool {
        Currency::FOREIGN.iter().all(|c| self.rate(*c).is_finite())
    }
}

/// Rows returned by a read together with the rates in effect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversion {
    pub prices: Vec<PriceObservation>,
    pub exchange_rates: ExchangeRates,
}

/// Round to two decimals, halves toward positive infinity
fn round_cents(value: f64) -> f64 {
    (value * 100.0 + 0.5).floor() / 100.0
}

/// Derive USD-quoted exchange rates from one reference row
///
/// A zero USD amount yields [`ExchangeRates::undefined`].
pub fn derive_exchange_rates(reference: &FiatPrices) -> ExchangeRates {
    if reference.usd == 0 {
        return ExchangeRates::undefined();
    }

    let usd = reference.usd as f64;
    let quote = |c: Currency| round_cents(reference.get(c) as f64 / usd);

    ExchangeRates {
        usdeur: quote(Currency::EUR),
        usdgbp: quote(Currency::GBP),
        usdcad: quote(Currency::CAD),
        usdchf: quote(Currency::CHF),
        usdaud: quote(Currency::AUD),
        usdjpy: quote(Currency::JPY),
    }
}
