//! arbwatch - cross-venue L2 orderbook arbitrage monitor.
//!
//! Pipeline: per-venue WebSocket feeds publish book snapshots into
//! single-writer slots and raise a counting signal; a detector thread drains
//! the signal, sweeps fee-adjusted VWAP cumulatives across all venue pairs,
//! and hands each emission round to a persistor thread that appends
//! opportunities to a text log and book summaries to SQLite. An operator
//! console exposes metrics and a tail of the opportunity log.

pub mod arbitrage;
pub mod book;
pub mod config;
pub mod console;
pub mod feeds;
pub mod metrics;
pub mod models;
pub mod persist;
pub mod signal;

pub use config::{Config, Pair, Venue};
pub use metrics::PipelineMetrics;
pub use models::{BookSummary, L2Book, Opportunity, MAX_LEVELS};
pub use signal::CountingSignal;
