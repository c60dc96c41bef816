//! Persistent storage.

pub mod sqlite;

pub use sqlite::{SqliteStore, StockInfo, StoreStats};
