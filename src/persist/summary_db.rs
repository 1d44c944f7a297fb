//! SQLite store for per-round book summaries.
//!
//! One row per detector tick that produced output. The connection is owned by
//! the persistor thread; inserts run inside an explicit transaction and a
//! failed insert is the caller's problem to log and skip, never to crash on.

use crate::models::BookSummary;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OpenFlags};
use std::path::Path;
use tracing::info;

const SUMMARY_SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;

CREATE TABLE IF NOT EXISTS OrderBook (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER,
    topAsk REAL,
    topAskQty REAL,
    topBid REAL,
    topBidQty REAL,
    midPrice REAL,
    spread REAL,
    imbalance REAL
);
"#;

pub struct SummaryDb {
    conn: Connection,
}

impl SummaryDb {
    /// Open or create the summary database, creating parent directories.
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }

        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(db_path, flags)
            .with_context(|| format!("failed to open summary database {}", db_path.display()))?;
        conn.execute_batch(SUMMARY_SCHEMA)
            .context("failed to initialize summary schema")?;

        info!(path = %db_path.display(), "summary database opened");

        Ok(Self { conn })
    }

    /// In-memory database (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SUMMARY_SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert one summary row inside a transaction.
    pub fn insert(&mut self, summary: &BookSummary) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .context("failed to begin summary transaction")?;
        tx.execute(
            r#"
            INSERT INTO OrderBook (
                timestamp, topAsk, topAskQty, topBid, topBidQty,
                midPrice, spread, imbalance
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                summary.timestamp_us,
                summary.top_ask,
                summary.top_ask_qty,
                summary.top_bid,
                summary.top_bid_qty,
                summary.mid_price,
                summary.spread,
                summary.imbalance,
            ],
        )
        .context("failed to insert summary row")?;
        tx.commit().context("failed to commit summary row")
    }

    /// Number of stored rows (diagnostics and tests).
    pub fn row_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM OrderBook", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::L2Book;

    fn sample_summary(timestamp_us: i64) -> BookSummary {
        let mut book = L2Book::new();
        book.set_asks(&[(101.0, 2.0)]);
        book.set_bids(&[(99.0, 6.0)]);
        BookSummary::from_book(&book, timestamp_us)
    }

    #[test]
    fn insert_and_count() {
        let mut db = SummaryDb::open_memory().unwrap();
        assert_eq!(db.row_count().unwrap(), 0);

        db.insert(&sample_summary(1)).unwrap();
        db.insert(&sample_summary(2)).unwrap();
        assert_eq!(db.row_count().unwrap(), 2);
    }

    #[test]
    fn row_preserves_summary_fields() {
        let mut db = SummaryDb::open_memory().unwrap();
        let summary = sample_summary(123_456);
        db.insert(&summary).unwrap();

        let (ts, top_ask, top_bid, mid, spread, imbalance): (i64, f64, f64, f64, f64, f64) = db
            .conn
            .query_row(
                "SELECT timestamp, topAsk, topBid, midPrice, spread, imbalance FROM OrderBook",
                [],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                    ))
                },
            )
            .unwrap();

        assert_eq!(ts, 123_456);
        assert_eq!(top_ask, 101.0);
        assert_eq!(top_bid, 99.0);
        assert_eq!(mid, 100.0);
        assert_eq!(spread, 2.0);
        assert!((imbalance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("summary.db");
        let mut db = SummaryDb::open(&path).unwrap();
        db.insert(&sample_summary(7)).unwrap();
        assert!(path.exists());
    }
}
