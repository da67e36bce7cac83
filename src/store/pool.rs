//! SQLite connection pools

use crate::error::{PriceStoreError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;

pub type DbPool = Pool<SqliteConnectionManager>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create a read-write connection pool for the given database file.
///
/// The file is created if it does not exist; its parent directory must.
pub fn open_pool(path: &Path, max_size: u32) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|conn| conn.busy_timeout(BUSY_TIMEOUT));
    Pool::builder()
        .max_size(max_size)
        .build(manager)
        .map_err(|e| {
            log::error!("Failed to create DB pool for {}: {}", path.display(), e);
            PriceStoreError::Pool(format!("{}: {}", path.display(), e))
        })
}

/// Create a single-connection pool over a private in-memory database.
///
/// Every in-memory connection is its own database, so the pool never
/// holds more than one.
pub fn open_memory_pool() -> Result<DbPool> {
    let manager = SqliteConnectionManager::memory();
    Ok(Pool::builder().max_size(1).build(manager)?)
}
