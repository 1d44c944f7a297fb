//! Core data types shared across the pipeline.
//!
//! `L2Book` is a fixed-capacity, `Copy` snapshot of one venue's book: the
//! ingest adapters overwrite it in place and the detector copies it out
//! bitwise, so it must stay a plain-old-data struct with no heap parts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::OnceLock;
use std::time::Instant;

/// Maximum number of price levels kept per book side.
pub const MAX_LEVELS: usize = 50;

/// Guard against division by zero when one book side is empty.
const IMBALANCE_EPSILON: f64 = 1e-9;

/// Process-relative monotonic nanosecond timestamp
#[inline(always)]
pub fn mono_now_ns() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_nanos() as u64
}

/// Level-2 orderbook snapshot for a single venue.
///
/// Asks are sorted ascending by price, bids descending; quantities are
/// strictly positive up to the respective size. Entries beyond `ask_size` /
/// `bid_size` are stale garbage and must not be read.
#[derive(Debug, Clone, Copy)]
#[repr(C, align(64))]
pub struct L2Book {
    /// Ask prices sorted in ascending order
    pub ask_price: [f64; MAX_LEVELS],
    /// Quantities available at ask prices
    pub ask_qty: [f64; MAX_LEVELS],
    /// Bid prices sorted in descending order
    pub bid_price: [f64; MAX_LEVELS],
    /// Quantities available at bid prices
    pub bid_qty: [f64; MAX_LEVELS],
    /// Number of valid ask levels
    pub ask_size: usize,
    /// Number of valid bid levels
    pub bid_size: usize,
    /// Monotonic timestamp stamped at message arrival, before parsing
    pub captured_at_ns: u64,
}

impl L2Book {
    pub const fn new() -> Self {
        Self {
            ask_price: [0.0; MAX_LEVELS],
            ask_qty: [0.0; MAX_LEVELS],
            bid_price: [0.0; MAX_LEVELS],
            bid_qty: [0.0; MAX_LEVELS],
            ask_size: 0,
            bid_size: 0,
            captured_at_ns: 0,
        }
    }

    /// Overwrite the ask side from `(price, qty)` levels, ascending by price.
    pub fn set_asks(&mut self, levels: &[(f64, f64)]) {
        let n = levels.len().min(MAX_LEVELS);
        for (i, &(price, qty)) in levels.iter().take(n).enumerate() {
            self.ask_price[i] = price;
            self.ask_qty[i] = qty;
        }
        self.ask_size = n;
    }

    /// Overwrite the bid side from `(price, qty)` levels, descending by price.
    pub fn set_bids(&mut self, levels: &[(f64, f64)]) {
        let n = levels.len().min(MAX_LEVELS);
        for (i, &(price, qty)) in levels.iter().take(n).enumerate() {
            self.bid_price[i] = price;
            self.bid_qty[i] = qty;
        }
        self.bid_size = n;
    }
}

impl Default for L2Book {
    fn default() -> Self {
        Self::new()
    }
}

/// A single cross-venue arbitrage opportunity.
///
/// One record per sweep tranche: the sweep emits at every cumulative depth
/// where the fee-adjusted VWAP spread clears the profit threshold, so a deep
/// book can produce several records from one detection round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Opportunity {
    /// Index of the venue to buy on (ask side)
    pub buy_venue: usize,
    /// Index of the venue to sell on (bid side)
    pub sell_venue: usize,
    /// Number of ask levels consumed, 1-based
    pub buy_levels: usize,
    /// Number of bid levels consumed, 1-based
    pub sell_levels: usize,
    /// Volume-weighted average buy price (quote per base)
    pub buy_vwap: f64,
    /// Volume-weighted average sell price (quote per base)
    pub sell_vwap: f64,
    /// Net profit percentage after both venues' fees
    pub net_profit_pct: f64,
    /// Executable size in base currency at this tranche
    pub order_size: f64,
    /// Microseconds from message arrival to emission
    pub detection_latency_us: f64,
    pub detected_at: DateTime<Utc>,
}

/// Top-of-book summary derived from the book that triggered a detection round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BookSummary {
    pub timestamp_us: i64,
    pub top_ask: f64,
    pub top_ask_qty: f64,
    pub top_bid: f64,
    pub top_bid_qty: f64,
    pub mid_price: f64,
    pub spread: f64,
    pub imbalance: f64,
}

impl BookSummary {
    /// Compute summary statistics; an empty side contributes zeros.
    pub fn from_book(book: &L2Book, timestamp_us: i64) -> Self {
        let (top_ask, top_ask_qty) = if book.ask_size > 0 {
            (book.ask_price[0], book.ask_qty[0])
        } else {
            (0.0, 0.0)
        };
        let (top_bid, top_bid_qty) = if book.bid_size > 0 {
            (book.bid_price[0], book.bid_qty[0])
        } else {
            (0.0, 0.0)
        };

        Self {
            timestamp_us,
            top_ask,
            top_ask_qty,
            top_bid,
            top_bid_qty,
            mid_price: (top_ask + top_bid) / 2.0,
            spread: top_ask - top_bid,
            imbalance: (top_bid_qty - top_ask_qty) / (top_bid_qty + top_ask_qty + IMBALANCE_EPSILON),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_sides_truncates_to_capacity() {
        let mut book = L2Book::new();
        let levels: Vec<(f64, f64)> = (0..60).map(|i| (100.0 + i as f64, 1.0)).collect();
        book.set_asks(&levels);
        assert_eq!(book.ask_size, MAX_LEVELS);
        assert_eq!(book.ask_price[MAX_LEVELS - 1], 149.0);
    }

    #[test]
    fn summary_from_two_sided_book() {
        let mut book = L2Book::new();
        book.set_asks(&[(101.0, 2.0), (102.0, 5.0)]);
        book.set_bids(&[(99.0, 6.0), (98.0, 1.0)]);

        let s = BookSummary::from_book(&book, 1_000);
        assert_eq!(s.timestamp_us, 1_000);
        assert_eq!(s.top_ask, 101.0);
        assert_eq!(s.top_bid, 99.0);
        assert!((s.mid_price - 100.0).abs() < 1e-12);
        assert!((s.spread - 2.0).abs() < 1e-12);
        // (6 - 2) / (6 + 2) = 0.5
        assert!((s.imbalance - 0.5).abs() < 1e-6);
    }

    #[test]
    fn summary_empty_sides_do_not_divide_by_zero() {
        let book = L2Book::new();
        let s = BookSummary::from_book(&book, 0);
        assert_eq!(s.top_ask, 0.0);
        assert_eq!(s.top_bid, 0.0);
        assert!(s.imbalance.abs() < 1e-6);
        assert!(s.imbalance.is_finite());
    }

    #[test]
    fn mono_clock_is_monotonic() {
        let a = mono_now_ns();
        let b = mono_now_ns();
        assert!(b >= a);
    }
}
