//! Integration tests for the price store
//!
//! Exercises a file-backed store through the public API the way the price
//! updater and API handlers use it.

use approx::assert_relative_eq;
use rusty_prices::prelude::*;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn prices(usd: i64, eur: i64) -> FiatPrices {
    FiatPrices {
        usd,
        eur,
        gbp: 40_000,
        cad: 60_000,
        chf: 48_000,
        aud: 70_000,
        jpy: 5_000_000,
    }
}

fn file_store(dir: &TempDir) -> PriceStore {
    let config = StoreConfig {
        database_path: dir.path().join("nested").join("prices.db"),
        pool_size: 4,
        missing_policy: MissingPolicy::Preserve,
    };
    PriceStore::open(&config).unwrap()
}

/// Rows at t=1000 (USD 40k), t=2000 (USD 0), t=3000 (USD 50k)
fn seeded_store(dir: &TempDir) -> PriceStore {
    let store = file_store(dir);
    store.save(1_000, &prices(40_000, 36_000)).unwrap();
    store.save(2_000, &prices(0, 0)).unwrap();
    store.save(3_000, &prices(50_000, 45_000)).unwrap();
    store
}

#[test]
fn test_reopen_keeps_rows() {
    let dir = TempDir::new().unwrap();
    {
        let store = file_store(&dir);
        store.save(1_000, &prices(40_000, 36_000)).unwrap();
    }
    let store = file_store(&dir);
    assert_eq!(store.count().unwrap(), 1);
    assert_eq!(store.latest_observation_time().unwrap(), 1_000);
}

#[test]
fn test_nearest_prior_is_strictly_before() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let conversion = store.nearest_prior_observation(Some(3_000)).unwrap();
    assert_eq!(conversion.prices.len(), 1);
    assert_eq!(conversion.prices[0].time, 2_000);

    let conversion = store.nearest_prior_observation(Some(2_500)).unwrap();
    assert_eq!(conversion.prices[0].time, 2_000);

    let conversion = store.nearest_prior_observation(Some(1_001)).unwrap();
    assert_eq!(conversion.prices[0].time, 1_000);
    assert_eq!(conversion.prices[0].prices.usd, 40_000);
}

#[test]
fn test_nearest_prior_uses_latest_row_for_rates() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    // Returned row is t=1000 (EUR/USD 0.9); rates come from t=3000
    let conversion = store.nearest_prior_observation(Some(1_500)).unwrap();
    assert_eq!(conversion.prices[0].time, 1_000);
    assert_relative_eq!(conversion.exchange_rates.usdeur, 0.90);
    assert_relative_eq!(conversion.exchange_rates.usdgbp, 0.80);
    assert_relative_eq!(conversion.exchange_rates.usdjpy, 100.0);
}

#[test]
fn test_nearest_prior_before_all_rows_is_empty() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let conversion = store.nearest_prior_observation(Some(500)).unwrap();
    assert!(conversion.prices.is_empty());
    assert!(conversion.exchange_rates.is_defined());
}

#[test]
fn test_nearest_prior_without_timestamp_matches_nothing() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let conversion = store.nearest_prior_observation(None).unwrap();
    assert!(conversion.prices.is_empty());
}

#[test]
fn test_nearest_prior_on_empty_store() {
    let store = PriceStore::open_in_memory().unwrap();
    let conversion = store.nearest_prior_observation(Some(1_000)).unwrap();
    assert!(conversion.prices.is_empty());
    // Fallback prices carry no USD value to divide by
    assert!(!conversion.exchange_rates.is_defined());
}

#[test]
fn test_nearest_prior_with_zero_usd_latest_row() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    store.save(1_000, &prices(40_000, 36_000)).unwrap();
    store.save(2_000, &prices(0, 0)).unwrap();

    let conversion = store.nearest_prior_observation(Some(5_000)).unwrap();
    assert_eq!(conversion.prices[0].time, 2_000);
    assert!(conversion.exchange_rates.usdeur.is_nan());
}

#[test]
fn test_historical_observations_newest_first() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let conversion = store.historical_observations().unwrap();
    let times: Vec<i64> = conversion.prices.iter().map(|p| p.time).collect();
    assert_eq!(times, vec![3_000, 2_000, 1_000]);
    assert_relative_eq!(conversion.exchange_rates.usdeur, 0.90);
    assert_relative_eq!(conversion.exchange_rates.usdcad, 1.20);
    assert_relative_eq!(conversion.exchange_rates.usdchf, 0.96);
    assert_relative_eq!(conversion.exchange_rates.usdaud, 1.40);
}

#[test]
fn test_historical_with_zero_usd_latest_row() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    store.save(1_000, &prices(40_000, 36_000)).unwrap();
    store.save(2_000, &prices(0, 0)).unwrap();

    let conversion = store.historical_observations().unwrap();
    assert_eq!(conversion.prices.len(), 2);
    assert!(!conversion.exchange_rates.is_defined());
}

#[test]
fn test_filter_asymmetry() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    assert_eq!(store.observation_times().unwrap(), vec![1_000, 3_000]);

    let all = store.observation_times_and_ids().unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(
        all[1],
        ObservationTimeAndId {
            time: 2_000,
            id: 2,
            usd: 0
        }
    );
}

#[test]
fn test_latest_id_skips_zero_usd() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    store.save(1_000, &prices(40_000, 36_000)).unwrap();
    store.save(2_000, &prices(0, 0)).unwrap();

    assert_eq!(store.latest_observation_id().unwrap(), Some(1));
    assert_eq!(store.latest_observation_time().unwrap(), 1_000);
}

#[test]
fn test_only_zero_usd_rows_report_no_times() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    store.save(1_000, &prices(0, 0)).unwrap();

    assert_eq!(store.oldest_observation_time().unwrap(), 0);
    assert_eq!(store.latest_observation_time().unwrap(), 0);
    assert_eq!(store.latest_observation_id().unwrap(), None);
    assert_eq!(store.observation_times_and_ids().unwrap().len(), 1);
}

#[test]
fn test_reads_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    assert_eq!(
        store.oldest_observation_time().unwrap(),
        store.oldest_observation_time().unwrap()
    );
    assert_eq!(
        store.latest_observation_id().unwrap(),
        store.latest_observation_id().unwrap()
    );
    assert_eq!(store.observation_times().unwrap(), store.observation_times().unwrap());
    assert_eq!(
        store.observation_times_and_ids().unwrap(),
        store.observation_times_and_ids().unwrap()
    );
    assert_eq!(store.latest_rates().unwrap(), store.latest_rates().unwrap());
    assert_eq!(
        store.nearest_prior_observation(Some(2_500)),
        store.nearest_prior_observation(Some(2_500))
    );
    assert_eq!(store.historical_observations(), store.historical_observations());
}

#[test]
fn test_undefined_rates_reads_are_idempotent() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    store.save(1_000, &FiatPrices::zero()).unwrap();

    let first = store.historical_observations().unwrap();
    assert!(!first.exchange_rates.is_defined());
    assert_eq!(Some(first), store.historical_observations());
    assert_eq!(
        store.nearest_prior_observation(Some(2_000)),
        store.nearest_prior_observation(Some(2_000))
    );
}

#[test]
fn test_save_failure_propagates() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let err = store.save(1_000, &prices(41_000, 37_000)).unwrap_err();
    assert!(matches!(err, PriceStoreError::Persistence(_)));
    assert_eq!(store.count().unwrap(), 3);
}

#[test]
fn test_derived_reads_fail_soft_without_table() {
    let pool = rusty_prices::store::open_memory_pool().unwrap();
    let store = PriceStore::new(pool);

    assert!(store.nearest_prior_observation(Some(1_000)).is_none());
    assert!(store.historical_observations().is_none());
    // Plain reads propagate
    assert!(matches!(
        store.latest_observation_time(),
        Err(PriceStoreError::Persistence(_))
    ));
    assert!(store.save(1_000, &prices(40_000, 36_000)).is_err());
}

struct SentinelUpdater;

impl PriceUpdater for SentinelUpdater {
    fn empty_prices(&self) -> FiatPrices {
        FiatPrices::missing()
    }
}

#[test]
fn test_latest_rates_fallback_comes_from_updater() {
    let store = PriceStore::open_in_memory()
        .unwrap()
        .with_updater(Arc::new(SentinelUpdater));
    assert_eq!(store.latest_rates().unwrap(), FiatPrices::missing());

    store.save(1_000, &prices(40_000, 36_000)).unwrap();
    assert_eq!(store.latest_rates().unwrap(), prices(40_000, 36_000));
}

#[test]
fn test_non_usd_sentinel_quirk_is_stored() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);
    store
        .save(1_000, &prices(40_000, MISSING_PRICE))
        .unwrap();

    let latest = store.latest_rates().unwrap();
    assert_eq!(latest.eur, MISSING_PRICE);
    // -1 / 40000 rounds to zero
    assert_eq!(derive_exchange_rates(&latest).usdeur, 0.0);
}

#[test]
fn test_concurrent_savers_share_pool() {
    let dir = TempDir::new().unwrap();
    let store = file_store(&dir);

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    let time = 10_000 + worker * 100 + i;
                    store.save(time, &prices(40_000 + i, 36_000)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(store.count().unwrap(), 40);
    let times = store.observation_times().unwrap();
    assert!(times.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_conversion_json_shape() {
    let dir = TempDir::new().unwrap();
    let store = seeded_store(&dir);

    let conversion = store.nearest_prior_observation(Some(1_500)).unwrap();
    let json = serde_json::to_value(&conversion).unwrap();
    assert_eq!(json["prices"][0]["time"], 1_000);
    assert_eq!(json["prices"][0]["USD"], 40_000);
    assert_eq!(json["exchangeRates"]["USDEUR"], 0.9);
}
