//! The detection round and the detector thread.
//!
//! Per acquired ingest signal the detector takes the first fresh slot in
//! venue-index order as the trigger, rebuilds the capped cumulative tables
//! for every enabled venue from last-known books, and runs a merge-style
//! two-pointer sweep over every (buy, sell) venue pair. The sweep emits one
//! opportunity per cumulative depth at which the fee-adjusted VWAP spread
//! clears the configured absolute profit threshold, so downstream can tell a
//! marginally profitable sliver from a deeply profitable block.
//!
//! The hot path allocates nothing in steady state: books, tables and the
//! output batch are all reused, and the round hand-off swaps vectors instead
//! of cloning them.

use crate::arbitrage::cumulative::SideTable;
use crate::book::SlotReader;
use crate::config::{Config, Venue};
use crate::metrics::PipelineMetrics;
use crate::models::{mono_now_ns, L2Book, Opportunity};
use crate::signal::CountingSignal;
use chrono::Utc;
use parking_lot::Mutex;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Run one detection round over the given last-known books.
///
/// `trigger` is the venue whose publication woke this round; `now_ns` is the
/// monotonic instant used for latency attribution, injected so tests can pin
/// it. Emitted opportunities are appended to `out` (cleared first), and
/// `opportunities_found` / latency metrics are bumped per emission.
#[allow(clippy::too_many_arguments)]
pub fn run_round(
    books: &[L2Book],
    trigger: usize,
    cfg: &Config,
    now_ns: u64,
    buy_tables: &mut [SideTable],
    sell_tables: &mut [SideTable],
    out: &mut Vec<Opportunity>,
    metrics: &PipelineMetrics,
) {
    out.clear();

    for venue in 0..books.len() {
        if cfg.venues[venue] {
            buy_tables[venue].rebuild_from_asks(&books[venue], cfg.max_order_size);
            sell_tables[venue].rebuild_from_bids(&books[venue], cfg.max_order_size);
        } else {
            buy_tables[venue].len = 0;
            sell_tables[venue].len = 0;
        }
    }

    let latency_us = now_ns.saturating_sub(books[trigger].captured_at_ns) as f64 / 1000.0;

    // All ordered pairs, same-venue included: (i, i) only survives the
    // threshold on a crossed book with near-zero fees.
    for buy_venue in 0..books.len() {
        let buy = &buy_tables[buy_venue];
        if buy.len == 0 {
            continue;
        }
        for sell_venue in 0..books.len() {
            let sell = &sell_tables[sell_venue];
            if sell.len == 0 {
                continue;
            }
            let fee_pct = cfg.fees[buy_venue] + cfg.fees[sell_venue];

            let mut bi = 0;
            let mut si = 0;
            while bi < buy.len && si < sell.len {
                let common_qty = buy.qty[bi].min(sell.qty[si]);
                let buy_vwap = buy.vwap(bi);
                let sell_vwap = sell.vwap(si);
                let gross_pct = (sell_vwap - buy_vwap) / buy_vwap * 100.0;
                let net_pct = gross_pct - fee_pct;
                let net_profit_quote = net_pct * common_qty * buy_vwap / 100.0;

                if net_profit_quote >= cfg.min_profit {
                    out.push(Opportunity {
                        buy_venue,
                        sell_venue,
                        buy_levels: bi + 1,
                        sell_levels: si + 1,
                        buy_vwap,
                        sell_vwap,
                        net_profit_pct: net_pct,
                        order_size: common_qty,
                        detection_latency_us: latency_us,
                        detected_at: Utc::now(),
                    });
                    metrics.increment_opportunities();
                    metrics.record_latency(latency_us as u64);
                }

                // Advance the shallower side; ties advance the sell pointer.
                if buy.qty[bi] < sell.qty[si] {
                    bi += 1;
                } else {
                    si += 1;
                }
            }
        }
    }
}

/// Hand-off cell between detector and persistor: the opportunity batch of the
/// last emission round plus the book that triggered it.
///
/// Single writer (detector) and single reader (persistor), serialized by the
/// round signal, so the lock is uncontended; it exists to make the hand-off
/// safe under signal saturation, where the detector may replace the batch
/// wholesale before the persistor wakes.
pub struct RoundCell {
    inner: Mutex<RoundData>,
}

struct RoundData {
    batch: Vec<Opportunity>,
    book: L2Book,
}

impl RoundCell {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RoundData {
                batch: Vec::new(),
                book: L2Book::new(),
            }),
        }
    }

    /// Publish a finished round. Swaps vectors so neither side allocates.
    pub fn publish(&self, batch: &mut Vec<Opportunity>, book: &L2Book) {
        let mut data = self.inner.lock();
        mem::swap(&mut data.batch, batch);
        data.book = *book;
    }

    /// Copy the current round out for persistence.
    pub fn take(&self, batch: &mut Vec<Opportunity>, book: &mut L2Book) {
        let data = self.inner.lock();
        batch.clear();
        batch.extend_from_slice(&data.batch);
        *book = data.book;
    }
}

impl Default for RoundCell {
    fn default() -> Self {
        Self::new()
    }
}

/// The detector thread: drains the ingest signal, snapshots slots, sweeps,
/// and raises the round signal for the persistor.
pub struct Detector {
    readers: Vec<SlotReader>,
    cfg: Arc<Config>,
    cell: Arc<RoundCell>,
    book_signal: Arc<CountingSignal>,
    round_signal: Arc<CountingSignal>,
    metrics: Arc<PipelineMetrics>,
    shutdown: Arc<AtomicBool>,
}

impl Detector {
    pub fn new(
        readers: Vec<SlotReader>,
        cfg: Arc<Config>,
        cell: Arc<RoundCell>,
        book_signal: Arc<CountingSignal>,
        round_signal: Arc<CountingSignal>,
        metrics: Arc<PipelineMetrics>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            readers,
            cfg,
            cell,
            book_signal,
            round_signal,
            metrics,
            shutdown,
        }
    }

    /// Spawn the detector on its own OS thread.
    pub fn spawn(self) -> std::thread::JoinHandle<()> {
        std::thread::Builder::new()
            .name("detector".into())
            .spawn(move || self.run())
            .expect("failed to spawn detector thread")
    }

    fn run(mut self) {
        let venues = self.readers.len();
        let mut local_books = vec![L2Book::new(); venues];
        let mut buy_tables = vec![SideTable::new(); venues];
        let mut sell_tables = vec![SideTable::new(); venues];
        let mut batch: Vec<Opportunity> = Vec::with_capacity(64);

        info!(venues, "detector started");

        while self.book_signal.acquire() {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            // Snapshot phase: only the first fresh slot in index order is the
            // trigger. One release corresponds to one publish; scanning
            // further would mix transport ticks into one round and skew the
            // latency attribution.
            let mut trigger = None;
            for (venue, reader) in self.readers.iter_mut().enumerate() {
                if reader.try_take(&mut local_books[venue]) {
                    trigger = Some(venue);
                    break;
                }
            }

            if let Some(trigger) = trigger {
                run_round(
                    &local_books,
                    trigger,
                    &self.cfg,
                    mono_now_ns(),
                    &mut buy_tables,
                    &mut sell_tables,
                    &mut batch,
                    &self.metrics,
                );
                if !batch.is_empty() {
                    debug!(
                        venue = Venue::from_index(trigger).map(|v| v.as_str()).unwrap_or("?"),
                        tranches = batch.len(),
                        "emission round"
                    );
                }
                self.cell.publish(&mut batch, &local_books[trigger]);
                self.round_signal.release();
            }
            // A saturated-signal collapse can wake us with nothing fresh;
            // that still counts as a processed update.
            self.metrics.increment_updates();
        }

        info!("detector stopped");
    }
}
