//! Persistent price history
//!
//! # Components
//!
//! - **pool**: SQLite connection pools (`r2d2`)
//! - **prices**: the `prices` table and every query against it

pub mod pool;
pub mod prices;

pub use pool::{open_memory_pool, open_pool, DbPool};
pub use prices::PriceStore;
