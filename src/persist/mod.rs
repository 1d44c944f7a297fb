//! The persistor thread: durable sinks for detector output.
//!
//! Per acquired round signal it copies the opportunity batch and the
//! triggering book out of the hand-off cell, appends the batch to the text
//! log, and writes one summary row to SQLite. Sink failures never stop the
//! pipeline: a failed DB insert is logged and skipped, a failed log write
//! goes to stderr. The log is flushed once more on the way out.

pub mod oplog;
pub mod summary_db;

use crate::arbitrage::RoundCell;
use crate::config::Config;
use crate::models::{BookSummary, L2Book, Opportunity};
use crate::signal::CountingSignal;
use chrono::Utc;
use oplog::OpportunityLog;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use summary_db::SummaryDb;
use tracing::{info, warn};

pub struct Persistor {
    cell: Arc<RoundCell>,
    round_signal: Arc<CountingSignal>,
    oplog: OpportunityLog,
    db: SummaryDb,
    cfg: Arc<Config>,
    shutdown: Arc<AtomicBool>,
}

impl Persistor {
    pub fn new(
        cell: Arc<RoundCell>,
        round_signal: Arc<CountingSignal>,
        oplog: OpportunityLog,
        db: SummaryDb,
        cfg: Arc<Config>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            cell,
            round_signal,
            oplog,
            db,
            cfg,
            shutdown,
        }
    }

    /// Spawn the persistor on its own OS thread.
    pub fn spawn(self) -> std::thread::JoinHandle<()> {
        std::thread::Builder::new()
            .name("persistor".into())
            .spawn(move || self.run())
            .expect("failed to spawn persistor thread")
    }

    fn run(mut self) {
        let mut batch: Vec<Opportunity> = Vec::new();
        let mut book = L2Book::new();

        info!("persistor started");

        while self.round_signal.acquire() {
            if self.shutdown.load(Ordering::Relaxed) {
                break;
            }

            self.cell.take(&mut batch, &mut book);

            if let Err(e) = self.oplog.append_batch(&batch, &self.cfg) {
                // Keep the pipeline alive; the log channel itself may be the
                // thing that is broken, so report on stderr.
                eprintln!("opportunity log write failed: {e:#}");
            }

            let summary = BookSummary::from_book(&book, Utc::now().timestamp_micros());
            if let Err(e) = self.db.insert(&summary) {
                warn!(error = %e, "summary insert failed, skipping row");
            }
        }

        if let Err(e) = self.oplog.flush() {
            eprintln!("opportunity log flush on shutdown failed: {e:#}");
        }
        info!("persistor stopped");
    }
}
