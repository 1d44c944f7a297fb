//! Cross-venue arbitrage detection.
//!
//! `cumulative` builds the per-side capped VWAP tables; `detector` runs the
//! two-pointer pair sweep over them and owns the detector thread.

pub mod cumulative;
pub mod detector;

pub use cumulative::SideTable;
pub use detector::{run_round, Detector, RoundCell};
