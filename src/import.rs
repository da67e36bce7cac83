//! Historical price import from CSV
//!
//! Expected header: `time,USD,EUR,GBP,CAD,CHF,AUD,JPY`. Column names are
//! matched case-insensitively and currency columns may be omitted (treated
//! as missing). `time` is unix seconds or a `YYYY-MM-DD` date at midnight
//! UTC. Each record goes through [`PriceStore::save`] on its own.

use crate::currency::{Currency, FiatPrices};
use crate::error::{PriceStoreError, Result};
use crate::store::PriceStore;
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use serde::Serialize;
use std::io::Read;
use std::path::Path;

/// Outcome of an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Rows written
    pub stored: usize,
    /// Rows dropped for a missing USD price
    pub skipped: usize,
}

/// Import a CSV file into `store`
pub fn import_csv(store: &PriceStore, path: &Path) -> Result<ImportSummary> {
    let file = std::fs::File::open(path).map_err(|e| {
        PriceStoreError::Import(format!("Failed to open {}: {}", path.display(), e))
    })?;
    import_reader(store, file)
}

/// Import CSV data from any reader into `store`
pub fn import_reader<R: Read>(store: &PriceStore, reader: R) -> Result<ImportSummary> {
    let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| PriceStoreError::Import(format!("Failed to read headers: {}", e)))?
        .clone();

    let time_idx = find_column(&headers, "time")
        .ok_or_else(|| PriceStoreError::Import("Column 'time' not found".to_string()))?;
    let currency_idx: Vec<(Currency, Option<usize>)> = Currency::ALL
        .iter()
        .map(|c| (*c, find_column(&headers, c.code())))
        .collect();

    let mut summary = ImportSummary::default();
    for (i, result) in rdr.records().enumerate() {
        // Header is line 1
        let line = i + 2;
        let record = result
            .map_err(|e| PriceStoreError::Import(format!("Failed to read line {}: {}", line, e)))?;

        let time = parse_time(record.get(time_idx).unwrap_or(""))
            .ok_or_else(|| PriceStoreError::Import(format!("Invalid time on line {}", line)))?;

        let mut prices = FiatPrices::missing();
        for (currency, idx) in &currency_idx {
            let Some(value) = idx.and_then(|idx| record.get(idx)) else {
                continue;
            };
            if value.is_empty() {
                continue;
            }
            let amount: i64 = value.parse().map_err(|_| {
                PriceStoreError::Import(format!(
                    "Invalid {} price '{}' on line {}",
                    currency, value, line
                ))
            })?;
            prices.set(*currency, amount);
        }

        if store.save(time, &prices)? {
            summary.stored += 1;
        } else {
            summary.skipped += 1;
        }
    }

    log::info!(
        "Imported {} price rows ({} skipped without USD)",
        summary.stored,
        summary.skipped
    );
    Ok(summary)
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.eq_ignore_ascii_case(name))
}

/// Parse unix seconds or a `YYYY-MM-DD` date
pub fn parse_time(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<i64>() {
        return Some(seconds);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
}
