//! Price observation storage with SQLite

use super::pool::{open_memory_pool, open_pool, DbPool};
use crate::config::StoreConfig;
use crate::currency::FiatPrices;
use crate::error::{PriceStoreError, Result};
use crate::observation::{ObservationTimeAndId, PriceObservation};
use crate::rates::{derive_exchange_rates, Conversion};
use crate::sanitize::{sanitize_prices, MissingPolicy};
use crate::updater::{PriceUpdater, ZeroPriceUpdater};
use rusqlite::{params, OptionalExtension, Row};
use std::fs;
use std::sync::Arc;

/// `time` column as unix seconds
const UNIX_TIME: &str = "CAST(strftime('%s', time) AS INTEGER)";

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS prices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    time TEXT NOT NULL UNIQUE,
    USD INTEGER NOT NULL DEFAULT -1,
    EUR INTEGER NOT NULL DEFAULT -1,
    GBP INTEGER NOT NULL DEFAULT -1,
    CAD INTEGER NOT NULL DEFAULT -1,
    CHF INTEGER NOT NULL DEFAULT -1,
    AUD INTEGER NOT NULL DEFAULT -1,
    JPY INTEGER NOT NULL DEFAULT -1
)";

/// BTC fiat price history backed by a `prices` table
///
/// Every operation checks a connection out of the pool for the duration of
/// its own queries; the store keeps no other state.
#[derive(Clone)]
pub struct PriceStore {
    pool: DbPool,
    updater: Arc<dyn PriceUpdater>,
    missing_policy: MissingPolicy,
}

impl std::fmt::Debug for PriceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceStore")
            .field("pool_size", &self.pool.max_size())
            .field("missing_policy", &self.missing_policy)
            .finish_non_exhaustive()
    }
}

impl PriceStore {
    /// Wrap an existing pool. Tables are not created.
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            updater: Arc::new(ZeroPriceUpdater),
            missing_policy: MissingPolicy::default(),
        }
    }

    /// Open the database named by `config`, creating it and its tables if
    /// needed
    pub fn open(config: &StoreConfig) -> Result<Self> {
        if let Some(parent) = config.database_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let pool = open_pool(&config.database_path, config.pool_size)?;
        let store = Self::new(pool).with_missing_policy(config.missing_policy);
        store.create_tables()?;
        Ok(store)
    }

    /// Create in-memory store (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let store = Self::new(open_memory_pool()?);
        store.create_tables()?;
        Ok(store)
    }

    /// Use `updater` for the empty-table fallback of [`PriceStore::latest_rates`]
    pub fn with_updater(mut self, updater: Arc<dyn PriceUpdater>) -> Self {
        self.updater = updater;
        self
    }

    pub fn with_missing_policy(mut self, policy: MissingPolicy) -> Self {
        self.missing_policy = policy;
        self
    }

    pub fn missing_policy(&self) -> MissingPolicy {
        self.missing_policy
    }

    /// Create the `prices` table if it does not exist
    pub fn create_tables(&self) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(SCHEMA, []).map_err(|e| {
            PriceStoreError::Persistence(format!("Failed to create prices table: {}", e))
        })?;
        Ok(())
    }

    /// Sanitize and store one observation.
    ///
    /// Returns `false` without writing when the USD price is missing.
    pub fn save(&self, time: i64, prices: &FiatPrices) -> Result<bool> {
        let Some(clean) = sanitize_prices(prices, self.missing_policy) else {
            log::debug!("Skip prices at {} without a USD value", time);
            return Ok(false);
        };

        self.insert(time, &clean).map_err(|e| {
            log::error!("Cannot save exchange rate into db. Reason: {}", e);
            e
        })?;
        Ok(true)
    }

    fn insert(&self, time: i64, prices: &FiatPrices) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO prices (time, USD, EUR, GBP, CAD, CHF, AUD, JPY)
             VALUES (datetime(?1, 'unixepoch'), ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                time,
                prices.usd,
                prices.eur,
                prices.gbp,
                prices.cad,
                prices.chf,
                prices.aud,
                prices.jpy,
            ],
        )?;
        Ok(())
    }

    /// Earliest time with a USD price, or 0
    pub fn oldest_observation_time(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        let time = conn
            .query_row(
                &format!("SELECT {UNIX_TIME} FROM prices WHERE USD != 0 ORDER BY time LIMIT 1"),
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(time.unwrap_or(0))
    }

    /// Id of the latest row with a USD price
    pub fn latest_observation_id(&self) -> Result<Option<i64>> {
        let conn = self.pool.get()?;
        let id = conn
            .query_row(
                "SELECT id FROM prices WHERE USD != 0 ORDER BY time DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    /// Latest time with a USD price, or 0
    pub fn latest_observation_time(&self) -> Result<i64> {
        let conn = self.pool.get()?;
        let time = conn
            .query_row(
                &format!("SELECT {UNIX_TIME} FROM prices WHERE USD != 0 ORDER BY time DESC LIMIT 1"),
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(time.unwrap_or(0))
    }

    /// Times of all rows with a USD price, oldest first
    pub fn observation_times(&self) -> Result<Vec<i64>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {UNIX_TIME} FROM prices WHERE USD != 0 ORDER BY time"
        ))?;
        let times = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(times)
    }

    /// Time, id and USD price of every row, oldest first.
    ///
    /// Unlike [`PriceStore::observation_times`], rows without a USD price are
    /// included.
    pub fn observation_times_and_ids(&self) -> Result<Vec<ObservationTimeAndId>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {UNIX_TIME}, id, USD FROM prices ORDER BY time"
        ))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ObservationTimeAndId {
                    time: row.get(0)?,
                    id: row.get(1)?,
                    usd: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Prices of the latest row, or the updater's empty prices without rows
    pub fn latest_rates(&self) -> Result<FiatPrices> {
        let conn = self.pool.get()?;
        let latest = conn
            .query_row(
                "SELECT USD, EUR, GBP, CAD, CHF, AUD, JPY FROM prices ORDER BY time DESC LIMIT 1",
                [],
                |row| Self::prices_from_row(row, 0),
            )
            .optional()?;
        Ok(latest.unwrap_or_else(|| self.updater.empty_prices()))
    }

    /// The last observation strictly before `timestamp`, with the current
    /// exchange rates.
    ///
    /// The rates come from the latest stored row, not the returned one.
    /// `None` for `timestamp` matches no row. Failures are logged and
    /// reported as `None`.
    pub fn nearest_prior_observation(&self, timestamp: Option<i64>) -> Option<Conversion> {
        match self.try_nearest_prior_observation(timestamp) {
            Ok(conversion) => Some(conversion),
            Err(e) => {
                log::error!("Cannot fetch single historical prices from the db. Reason {}", e);
                None
            }
        }
    }

    fn try_nearest_prior_observation(&self, timestamp: Option<i64>) -> Result<Conversion> {
        let prices = {
            let conn = self.pool.get()?;
            let mut stmt = conn.prepare(&format!(
                "SELECT id, {UNIX_TIME}, USD, EUR, GBP, CAD, CHF, AUD, JPY
                 FROM prices
                 WHERE {UNIX_TIME} < ?1
                 ORDER BY time DESC
                 LIMIT 1"
            ))?;
            let rows = stmt
                .query_map(params![timestamp], Self::observation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        let latest = self.latest_rates()?;
        Ok(Conversion {
            prices,
            exchange_rates: derive_exchange_rates(&latest),
        })
    }

    /// Every observation, newest first, with rates from the newest row.
    ///
    /// An empty table has no reference row and, like any failure, is logged
    /// and reported as `None`.
    pub fn historical_observations(&self) -> Option<Conversion> {
        match self.try_historical_observations() {
            Ok(conversion) => Some(conversion),
            Err(e) => {
                log::error!("Cannot fetch historical prices from the db. Reason {}", e);
                None
            }
        }
    }

    fn try_historical_observations(&self) -> Result<Conversion> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, {UNIX_TIME}, USD, EUR, GBP, CAD, CHF, AUD, JPY
             FROM prices
             ORDER BY time DESC"
        ))?;
        let prices = stmt
            .query_map([], Self::observation_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let latest = prices.first().ok_or_else(|| {
            PriceStoreError::Derivation("no stored prices to derive exchange rates from".to_string())
        })?;
        let exchange_rates = derive_exchange_rates(&latest.prices);
        log::debug!("Loaded {} historical observations", prices.len());

        Ok(Conversion {
            prices,
            exchange_rates,
        })
    }

    /// Number of stored rows
    pub fn count(&self) -> Result<usize> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM prices", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn prices_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<FiatPrices> {
        Ok(FiatPrices {
            usd: row.get(offset)?,
            eur: row.get(offset + 1)?,
            gbp: row.get(offset + 2)?,
            cad: row.get(offset + 3)?,
            chf: row.get(offset + 4)?,
            aud: row.get(offset + 5)?,
            jpy: row.get(offset + 6)?,
        })
    }

    /// Map `id, time, USD..JPY`
    fn observation_from_row(row: &Row<'_>) -> rusqlite::Result<PriceObservation> {
        Ok(PriceObservation {
            id: row.get(0)?,
            time: row.get(1)?,
            prices: Self::prices_from_row(row, 2)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::{Currency, MISSING_PRICE};

    fn prices(usd: i64) -> FiatPrices {
        FiatPrices {
            usd,
            eur: 45_000,
            gbp: 40_000,
            cad: 60_000,
            chf: 48_000,
            aud: 70_000,
            jpy: 5_000_000,
        }
    }

    #[test]
    fn test_store_creation() {
        let store = PriceStore::open_in_memory().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        // Idempotent
        store.create_tables().unwrap();
    }

    #[test]
    fn test_save_and_read_back() {
        let store = PriceStore::open_in_memory().unwrap();
        assert!(store.save(1_600_000_000, &prices(50_000)).unwrap());

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.latest_rates().unwrap(), prices(50_000));
        assert_eq!(store.latest_observation_time().unwrap(), 1_600_000_000);
        assert_eq!(store.oldest_observation_time().unwrap(), 1_600_000_000);
        assert_eq!(store.latest_observation_id().unwrap(), Some(1));
    }

    #[test]
    fn test_missing_usd_is_not_stored() {
        let store = PriceStore::open_in_memory().unwrap();
        assert!(!store.save(1_600_000_000, &prices(MISSING_PRICE)).unwrap());
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_out_of_range_stored_as_zero() {
        let store = PriceStore::open_in_memory().unwrap();
        let input = prices(50_000).with(Currency::EUR, 200_000_000);
        store.save(1_600_000_000, &input).unwrap();
        assert_eq!(store.latest_rates().unwrap().eur, 0);
    }

    #[test]
    fn test_missing_policy_applies_on_save() {
        let input = prices(50_000).with(Currency::AUD, MISSING_PRICE);

        let store = PriceStore::open_in_memory().unwrap();
        store.save(1, &input).unwrap();
        assert_eq!(store.latest_rates().unwrap().aud, MISSING_PRICE);

        let store = PriceStore::open_in_memory()
            .unwrap()
            .with_missing_policy(MissingPolicy::Zero);
        store.save(1, &input).unwrap();
        assert_eq!(store.latest_rates().unwrap().aud, 0);
    }

    #[test]
    fn test_duplicate_time_is_persistence_error() {
        let store = PriceStore::open_in_memory().unwrap();
        store.save(1_600_000_000, &prices(50_000)).unwrap();
        let err = store.save(1_600_000_000, &prices(51_000)).unwrap_err();
        assert!(matches!(err, PriceStoreError::Persistence(_)));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_empty_reads() {
        let store = PriceStore::open_in_memory().unwrap();
        assert_eq!(store.oldest_observation_time().unwrap(), 0);
        assert_eq!(store.latest_observation_time().unwrap(), 0);
        assert_eq!(store.latest_observation_id().unwrap(), None);
        assert!(store.observation_times().unwrap().is_empty());
        assert!(store.observation_times_and_ids().unwrap().is_empty());
        assert_eq!(store.latest_rates().unwrap(), FiatPrices::zero());
        assert!(store.historical_observations().is_none());
    }

    #[test]
    fn test_zero_usd_rows_filtered_from_times() {
        let store = PriceStore::open_in_memory().unwrap();
        store.save(100, &prices(50_000)).unwrap();
        store.save(200, &prices(0)).unwrap();
        store.save(300, &prices(52_000)).unwrap();

        assert_eq!(store.observation_times().unwrap(), vec![100, 300]);
        let with_ids = store.observation_times_and_ids().unwrap();
        assert_eq!(
            with_ids.iter().map(|r| r.time).collect::<Vec<_>>(),
            vec![100, 200, 300]
        );
        assert_eq!(with_ids[1].usd, 0);
    }

    #[test]
    fn test_latest_by_time_not_insertion_order() {
        let store = PriceStore::open_in_memory().unwrap();
        store.save(300, &prices(52_000)).unwrap();
        store.save(100, &prices(50_000)).unwrap();

        assert_eq!(store.latest_observation_id().unwrap(), Some(1));
        assert_eq!(store.latest_observation_time().unwrap(), 300);
        assert_eq!(store.oldest_observation_time().unwrap(), 100);
        assert_eq!(store.latest_rates().unwrap().usd, 52_000);
    }

    #[test]
    fn test_latest_rates_do_not_filter_zero_usd() {
        let store = PriceStore::open_in_memory().unwrap();
        store.save(100, &prices(50_000)).unwrap();
        store.save(200, &prices(0)).unwrap();

        assert_eq!(store.latest_rates().unwrap().usd, 0);
        assert_eq!(store.latest_observation_time().unwrap(), 100);
    }
}
