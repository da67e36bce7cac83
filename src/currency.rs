//! Fiat currencies tracked against BTC and their per-row amounts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Amount marking "no data available" for a currency at ingestion time
pub const MISSING_PRICE: i64 = -1;

/// Fiat currency enumeration (ISO 4217 codes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound Sterling
    GBP,
    /// Canadian Dollar
    CAD,
    /// Swiss Franc
    CHF,
    /// Australian Dollar
    AUD,
    /// Japanese Yen
    JPY,
}

impl Currency {
    /// Every tracked currency, in column order
    pub const ALL: [Currency; 7] = [
        Currency::USD,
        Currency::EUR,
        Currency::GBP,
        Currency::CAD,
        Currency::CHF,
        Currency::AUD,
        Currency::JPY,
    ];

    /// Currencies quoted against USD in derived exchange rates
    pub const FOREIGN: [Currency; 6] = [
        Currency::EUR,
        Currency::GBP,
        Currency::CAD,
        Currency::CHF,
        Currency::AUD,
        Currency::JPY,
    ];

    /// Get ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
            Currency::CAD => "CAD",
            Currency::CHF => "CHF",
            Currency::AUD => "AUD",
            Currency::JPY => "JPY",
        }
    }

    /// Get currency symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::CAD => "C$",
            Currency::CHF => "CHF",
            Currency::AUD => "A$",
            Currency::JPY => "¥",
        }
    }

    /// Largest BTC price accepted at ingestion for this currency
    pub const fn max_price(&self) -> i64 {
        match self {
            Currency::USD
            | Currency::EUR
            | Currency::GBP
            | Currency::CAD
            | Currency::CHF
            | Currency::AUD => 100_000_000,
            Currency::JPY => 10_000_000_000,
        }
    }

    /// Parse from ISO code
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_uppercase().as_str() {
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            "CAD" => Some(Currency::CAD),
            "CHF" => Some(Currency::CHF),
            "AUD" => Some(Currency::AUD),
            "JPY" => Some(Currency::JPY),
            _ => None,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// BTC price in each tracked fiat currency
///
/// Amounts are whole fiat units per BTC. `-1` marks a missing value on
/// input; `0` means "no data" once stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub struct FiatPrices {
    pub usd: i64,
    pub eur: i64,
    pub gbp: i64,
    pub cad: i64,
    pub chf: i64,
    pub aud: i64,
    pub jpy: i64,
}

impl FiatPrices {
    /// All amounts set to zero
    pub fn zero() -> Self {
        Self::default()
    }

    /// All amounts marked missing
    pub fn missing() -> Self {
        Self::splat(MISSING_PRICE)
    }

    fn splat(amount: i64) -> Self {
        Self {
            usd: amount,
            eur: amount,
            gbp: amount,
            cad: amount,
            chf: amount,
            aud: amount,
            jpy: amount,
        }
    }

    /// Amount for a currency
    pub fn get(&self, currency: Currency) -> i64 {
        match currency {
            Currency::USD => self.usd,
            Currency::EUR => self.eur,
            Currency::GBP => self.gbp,
            Currency::CAD => self.cad,
            Currency::CHF => self.chf,
            Currency::AUD => self.aud,
            Currency::JPY => self.jpy,
        }
    }

    /// Replace the amount for a currency
    pub fn set(&mut self, currency: Currency, amount: i64) {
        let slot = match currency {
            Currency::USD => &mut self.usd,
            Currency::EUR => &mut self.eur,
            Currency::GBP => &mut self.gbp,
            Currency::CAD => &mut self.cad,
            Currency::CHF => &mut self.chf,
            Currency::AUD => &mut self.aud,
            Currency::JPY => &mut self.jpy,
        };
        *slot = amount;
    }

    /// Builder-style variant of [`FiatPrices::set`]
    pub fn with(mut self, currency: Currency, amount: i64) -> Self {
        self.set(currency, amount);
        self
    }

    /// `(currency, amount)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (Currency, i64)> + '_ {
        Currency::ALL.iter().map(move |c| (*c, self.get(*c)))
    }

    /// Whether the USD amount is the missing sentinel
    pub fn is_usd_missing(&self) -> bool {
        self.usd == MISSING_PRICE
    }
}
