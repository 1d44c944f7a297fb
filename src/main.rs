//! arbwatch entry point: validate configuration, wire the pipeline, run the
//! operator console, and shut everything down cooperatively on quit.

use anyhow::{Context, Result};
use arbwatch::arbitrage::{Detector, RoundCell};
use arbwatch::book::{book_slot, SlotReader, SlotWriter};
use arbwatch::config::{Config, Venue};
use arbwatch::console::Console;
use arbwatch::feeds::VenueFeed;
use arbwatch::metrics::PipelineMetrics;
use arbwatch::persist::oplog::{LogPager, OpportunityLog};
use arbwatch::persist::summary_db::SummaryDb;
use arbwatch::persist::Persistor;
use arbwatch::signal::CountingSignal;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "arbwatch", about = "Cross-venue L2 orderbook arbitrage monitor")]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "config/config.json")]
    config: PathBuf,

    /// Path to the append-only opportunity log
    #[arg(long, default_value = "storage/opportunities.txt")]
    log_path: PathBuf,

    /// Path to the SQLite book-summary database
    #[arg(long, default_value = "storage/orderbook_summary.db")]
    db_path: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    // Configuration problems are fatal before any thread starts.
    let cfg = Arc::new(Config::load(&args.config)?);
    info!(
        pair = cfg.pair.as_str(),
        venues = cfg.enabled_venues().count(),
        min_profit = cfg.min_profit,
        max_order_size = cfg.max_order_size,
        "configuration loaded"
    );

    let metrics = Arc::new(PipelineMetrics::new());
    let book_signal = Arc::new(CountingSignal::new());
    let round_signal = Arc::new(CountingSignal::new());
    let cell = Arc::new(RoundCell::new());
    let shutdown = Arc::new(AtomicBool::new(false));

    // One slot per venue, split into its writer/reader handles at startup.
    let mut writers: Vec<Option<SlotWriter>> = Vec::with_capacity(Venue::COUNT);
    let mut readers: Vec<SlotReader> = Vec::with_capacity(Venue::COUNT);
    for _ in 0..Venue::COUNT {
        let (writer, reader) = book_slot();
        writers.push(Some(writer));
        readers.push(reader);
    }

    let oplog = OpportunityLog::open(&args.log_path)?;
    let db = SummaryDb::open(&args.db_path)?;

    let detector_handle = Detector::new(
        readers,
        Arc::clone(&cfg),
        Arc::clone(&cell),
        Arc::clone(&book_signal),
        Arc::clone(&round_signal),
        Arc::clone(&metrics),
        Arc::clone(&shutdown),
    )
    .spawn();

    let persistor_handle = Persistor::new(
        Arc::clone(&cell),
        Arc::clone(&round_signal),
        oplog,
        db,
        Arc::clone(&cfg),
        Arc::clone(&shutdown),
    )
    .spawn();

    // Feeds run on a tokio runtime owned here; the core only ever sees their
    // non-blocking publish + release calls.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build feed runtime")?;
    for venue in cfg.enabled_venues() {
        let writer = writers[venue.index()]
            .take()
            .expect("one feed per venue slot");
        let feed = VenueFeed::new(
            venue,
            cfg.pair,
            writer,
            Arc::clone(&book_signal),
            Arc::clone(&metrics),
            Arc::clone(&shutdown),
        );
        runtime.spawn(feed.run());
    }

    // The console owns the foreground until the operator quits.
    let mut console = Console::new(
        Arc::clone(&cfg),
        Arc::clone(&metrics),
        LogPager::new(&args.log_path),
    );
    console.run();

    info!("shutting down");
    shutdown.store(true, Ordering::Relaxed);
    book_signal.close();
    round_signal.close();

    let _ = detector_handle.join();
    let _ = persistor_handle.join();
    runtime.shutdown_timeout(Duration::from_secs(1));

    info!("shutdown complete");
    Ok(())
}
