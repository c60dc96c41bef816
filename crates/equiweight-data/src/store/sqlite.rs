//! SQLite storage for prices, compositions and performance.

use crate::error::Result;
use chrono::NaiveDate;
use equiweight_index::{
    CompositionEntry, IndexStore, PerformanceEntry, PriceIndex, PriceRecord,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// SQLite store for the index tables.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

/// Per-symbol metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockInfo {
    /// Ticker symbol
    pub symbol: String,
    /// Company name
    pub company_name: String,
    /// GICS sector name
    pub sector: String,
    /// Latest market capitalization
    pub market_cap: f64,
    /// Date of the latest price
    pub last_updated: NaiveDate,
}

impl SqliteStore {
    /// Open or create a store at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        info!(path = %path.display(), "opened index database");
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS stocks (
                symbol TEXT PRIMARY KEY,
                company_name TEXT,
                sector TEXT,
                market_cap REAL,
                last_updated TEXT
            );

            CREATE TABLE IF NOT EXISTS daily_prices (
                symbol TEXT NOT NULL,
                date TEXT NOT NULL,
                open_price REAL,
                high_price REAL,
                low_price REAL,
                close_price REAL,
                volume INTEGER NOT NULL DEFAULT 0,
                market_cap REAL NOT NULL,
                shares_outstanding REAL NOT NULL,
                PRIMARY KEY (symbol, date)
            );

            CREATE INDEX IF NOT EXISTS idx_daily_prices_date ON daily_prices(date);

            CREATE TABLE IF NOT EXISTS index_composition (
                date TEXT NOT NULL,
                symbol TEXT NOT NULL,
                rank_by_market_cap INTEGER NOT NULL,
                market_cap REAL NOT NULL,
                weight REAL NOT NULL,
                PRIMARY KEY (date, symbol)
            );

            CREATE TABLE IF NOT EXISTS index_performance (
                date TEXT PRIMARY KEY,
                index_value REAL NOT NULL,
                daily_return REAL NOT NULL,
                cumulative_return REAL NOT NULL,
                num_constituents INTEGER NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Insert or replace symbol metadata.
    pub fn put_stocks(&self, stocks: &[StockInfo]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        for stock in stocks {
            tx.execute(
                "INSERT OR REPLACE INTO stocks
                 (symbol, company_name, sector, market_cap, last_updated)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    stock.symbol,
                    stock.company_name,
                    stock.sector,
                    stock.market_cap,
                    stock.last_updated
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Insert or replace daily prices; returns the number of rows written.
    pub fn put_prices(&self, records: &[PriceRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO daily_prices
                 (symbol, date, open_price, high_price, low_price, close_price,
                  volume, market_cap, shares_outstanding)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for record in records {
                stmt.execute(params![
                    record.symbol,
                    record.date,
                    record.open,
                    record.high,
                    record.low,
                    record.close,
                    record.volume as i64,
                    record.market_cap,
                    record.shares_outstanding
                ])?;
            }
        }
        tx.commit()?;
        debug!(rows = records.len(), "stored daily prices");
        Ok(records.len())
    }

    /// Load every price within `[start, end]` into memory.
    pub fn load_prices(&self, start: NaiveDate, end: NaiveDate) -> Result<PriceIndex> {
        let mut stmt = self.conn.prepare(
            "SELECT symbol, date, open_price, high_price, low_price, close_price,
                    volume, market_cap, shares_outstanding
             FROM daily_prices
             WHERE date >= ?1 AND date <= ?2
             ORDER BY date, symbol",
        )?;
        let rows = stmt.query_map(params![start, end], |row| {
            Ok(PriceRecord {
                symbol: row.get(0)?,
                date: row.get(1)?,
                open: row.get(2)?,
                high: row.get(3)?,
                low: row.get(4)?,
                close: row.get(5)?,
                volume: row.get::<_, i64>(6)?.max(0) as u64,
                market_cap: row.get::<_, Option<f64>>(7)?.unwrap_or(0.0),
                shares_outstanding: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
            })
        })?;

        let index = rows.collect::<rusqlite::Result<PriceIndex>>()?;
        debug!(%start, %end, records = index.len(), "loaded price index");
        Ok(index)
    }

    /// First and last date with stored prices.
    pub fn price_date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let range = self.conn.query_row(
            "SELECT MIN(date), MAX(date) FROM daily_prices",
            [],
            |row| {
                Ok((
                    row.get::<_, Option<NaiveDate>>(0)?,
                    row.get::<_, Option<NaiveDate>>(1)?,
                ))
            },
        )?;
        Ok(match range {
            (Some(first), Some(last)) => Some((first, last)),
            _ => None,
        })
    }

    /// First and last date with a stored performance entry.
    pub fn performance_date_range(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        let range = self.conn.query_row(
            "SELECT MIN(date), MAX(date) FROM index_performance",
            [],
            |row| {
                Ok((
                    row.get::<_, Option<NaiveDate>>(0)?,
                    row.get::<_, Option<NaiveDate>>(1)?,
                ))
            },
        )?;
        Ok(match range {
            (Some(first), Some(last)) => Some((first, last)),
            _ => None,
        })
    }

    /// Delete every composition and performance row.
    pub fn clear_index(&self) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM index_composition", [])?;
        tx.execute("DELETE FROM index_performance", [])?;
        tx.commit()?;
        Ok(())
    }

    /// Delete all stored data.
    pub fn clear_all(&self) -> Result<()> {
        self.clear_index()?;
        self.conn.execute("DELETE FROM daily_prices", [])?;
        self.conn.execute("DELETE FROM stocks", [])?;
        Ok(())
    }

    /// Row counts of every table.
    pub fn get_stats(&self) -> Result<StoreStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        Ok(StoreStats {
            price_rows: count("SELECT COUNT(*) FROM daily_prices")?,
            unique_symbols: count("SELECT COUNT(DISTINCT symbol) FROM daily_prices")?,
            stocks: count("SELECT COUNT(*) FROM stocks")?,
            composition_rows: count("SELECT COUNT(*) FROM index_composition")?,
            performance_rows: count("SELECT COUNT(*) FROM index_performance")?,
        })
    }

    fn read_composition(&self, date: NaiveDate) -> Result<Vec<CompositionEntry>> {
        let mut stmt = self.conn.prepare_cached(
            "SELECT date, symbol, rank_by_market_cap, market_cap, weight
             FROM index_composition WHERE date = ?1
             ORDER BY rank_by_market_cap",
        )?;
        let rows = stmt.query_map(params![date], composition_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn read_performance(&self, date: NaiveDate) -> Result<Option<PerformanceEntry>> {
        Ok(self
            .conn
            .query_row(
                "SELECT date, index_value, daily_return, cumulative_return, num_constituents
                 FROM index_performance WHERE date = ?1",
                params![date],
                performance_row,
            )
            .optional()?)
    }

    fn read_latest_performance_before(&self, date: NaiveDate) -> Result<Option<PerformanceEntry>> {
        Ok(self
            .conn
            .query_row(
                "SELECT date, index_value, daily_return, cumulative_return, num_constituents
                 FROM index_performance WHERE date < ?1
                 ORDER BY date DESC LIMIT 1",
                params![date],
                performance_row,
            )
            .optional()?)
    }

    fn write_day(
        &mut self,
        date: NaiveDate,
        composition: &[CompositionEntry],
        performance: &PerformanceEntry,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM index_composition WHERE date = ?1",
            params![date],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO index_composition
                 (date, symbol, rank_by_market_cap, market_cap, weight)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for entry in composition {
                stmt.execute(params![
                    date,
                    entry.symbol,
                    entry.rank,
                    entry.market_cap,
                    entry.weight
                ])?;
            }
        }
        tx.execute(
            "DELETE FROM index_performance WHERE date = ?1",
            params![date],
        )?;
        tx.execute(
            "INSERT INTO index_performance
             (date, index_value, daily_return, cumulative_return, num_constituents)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                date,
                performance.index_value,
                performance.daily_return,
                performance.cumulative_return,
                performance.num_constituents
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn delete_day(&mut self, date: NaiveDate) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM index_composition WHERE date = ?1",
            params![date],
        )?;
        tx.execute(
            "DELETE FROM index_performance WHERE date = ?1",
            params![date],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn read_performance_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PerformanceEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, index_value, daily_return, cumulative_return, num_constituents
             FROM index_performance WHERE date >= ?1 AND date <= ?2
             ORDER BY date",
        )?;
        let rows = stmt.query_map(params![start, end], performance_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn read_compositions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<(NaiveDate, Vec<CompositionEntry>)>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, symbol, rank_by_market_cap, market_cap, weight
             FROM index_composition WHERE date >= ?1 AND date <= ?2
             ORDER BY date, rank_by_market_cap",
        )?;
        let rows = stmt.query_map(params![start, end], composition_row)?;

        let mut grouped: Vec<(NaiveDate, Vec<CompositionEntry>)> = Vec::new();
        for row in rows {
            let entry = row?;
            match grouped.last_mut() {
                Some((date, entries)) if *date == entry.date => entries.push(entry),
                _ => grouped.push((entry.date, vec![entry])),
            }
        }
        Ok(grouped)
    }
}

fn composition_row(row: &Row<'_>) -> rusqlite::Result<CompositionEntry> {
    Ok(CompositionEntry {
        date: row.get(0)?,
        symbol: row.get(1)?,
        rank: row.get(2)?,
        market_cap: row.get(3)?,
        weight: row.get(4)?,
    })
}

fn performance_row(row: &Row<'_>) -> rusqlite::Result<PerformanceEntry> {
    Ok(PerformanceEntry {
        date: row.get(0)?,
        index_value: row.get(1)?,
        daily_return: row.get(2)?,
        cumulative_return: row.get(3)?,
        num_constituents: row.get(4)?,
    })
}

impl IndexStore for SqliteStore {
    fn composition(&self, date: NaiveDate) -> equiweight_index::Result<Vec<CompositionEntry>> {
        Ok(self.read_composition(date)?)
    }

    fn performance(&self, date: NaiveDate) -> equiweight_index::Result<Option<PerformanceEntry>> {
        Ok(self.read_performance(date)?)
    }

    fn latest_performance_before(
        &self,
        date: NaiveDate,
    ) -> equiweight_index::Result<Option<PerformanceEntry>> {
        Ok(self.read_latest_performance_before(date)?)
    }

    fn replace_day(
        &mut self,
        date: NaiveDate,
        composition: &[CompositionEntry],
        performance: &PerformanceEntry,
    ) -> equiweight_index::Result<()> {
        Ok(self.write_day(date, composition, performance)?)
    }

    fn clear_day(&mut self, date: NaiveDate) -> equiweight_index::Result<()> {
        Ok(self.delete_day(date)?)
    }

    fn performance_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> equiweight_index::Result<Vec<PerformanceEntry>> {
        Ok(self.read_performance_between(start, end)?)
    }

    fn compositions_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> equiweight_index::Result<Vec<(NaiveDate, Vec<CompositionEntry>)>> {
        Ok(self.read_compositions_between(start, end)?)
    }
}

/// Store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of daily price rows
    pub price_rows: usize,
    /// Number of distinct symbols with prices
    pub unique_symbols: usize,
    /// Number of symbol metadata rows
    pub stocks: usize,
    /// Number of composition rows
    pub composition_rows: usize,
    /// Number of performance rows
    pub performance_rows: usize,
}
