//! Venue and pair tables plus the immutable run configuration.
//!
//! The configuration file is validated in full before any pipeline thread
//! starts; every reject here is fatal at startup and impossible afterwards.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Supported trading venue, indexed 0..COUNT across the whole pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Venue {
    Okx = 0,
    Deribit = 1,
    Bybit = 2,
}

impl Venue {
    pub const COUNT: usize = 3;
    pub const ALL: [Venue; Venue::COUNT] = [Venue::Okx, Venue::Deribit, Venue::Bybit];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "okx" => Some(Self::Okx),
            "deribit" => Some(Self::Deribit),
            "bybit" => Some(Self::Bybit),
            _ => None,
        }
    }

    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Okx => "okx",
            Self::Deribit => "deribit",
            Self::Bybit => "bybit",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Okx => "OKX",
            Self::Deribit => "Deribit",
            Self::Bybit => "Bybit",
        }
    }

    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Whether this venue encodes prices and quantities as JSON strings.
    pub fn numbers_as_strings(&self) -> bool {
        match self {
            Self::Okx => true,
            Self::Deribit => false,
            Self::Bybit => true,
        }
    }

    /// L2 stream endpoint for this venue and pair.
    ///
    /// Each venue spells the instrument differently on the gateway.
    pub fn ws_url(&self, pair: Pair) -> String {
        const BASE: &str = "wss://ws.gomarket-cpp.goquant.io/ws/l2-orderbook";
        let (base, quote) = (pair.base(), pair.quote());
        match self {
            Self::Okx => format!("{}/okx/{}-{}", BASE, base, quote),
            Self::Deribit => format!("{}/deribit/{}_{}", BASE, base, quote),
            Self::Bybit => format!("{}/bybit/{}{}/spot", BASE, base, quote),
        }
    }
}

/// Supported trading pair. Exactly one pair is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pair {
    BtcUsdt,
    EthUsdt,
    SolUsdt,
}

impl Pair {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "BTC/USDT" => Some(Self::BtcUsdt),
            "ETH/USDT" => Some(Self::EthUsdt),
            "SOL/USDT" => Some(Self::SolUsdt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BtcUsdt => "BTC/USDT",
            Self::EthUsdt => "ETH/USDT",
            Self::SolUsdt => "SOL/USDT",
        }
    }

    pub fn base(&self) -> &'static str {
        match self {
            Self::BtcUsdt => "BTC",
            Self::EthUsdt => "ETH",
            Self::SolUsdt => "SOL",
        }
    }

    pub fn quote(&self) -> &'static str {
        "USDT"
    }
}

/// On-disk configuration file shape.
#[derive(Debug, Deserialize)]
struct RawConfig {
    exchanges: Vec<String>,
    pairs: Vec<String>,
    #[serde(default)]
    fees: HashMap<String, f64>,
    min_profit: f64,
    max_order_size: f64,
    #[serde(default)]
    latency_ms: f64,
}

/// Validated run configuration, immutable after load.
#[derive(Debug, Clone)]
pub struct Config {
    /// Enabled-venue flags, indexed by `Venue::index()`
    pub venues: [bool; Venue::COUNT],
    /// Per-venue taker fee, percent
    pub fees: [f64; Venue::COUNT],
    /// The single active trading pair
    pub pair: Pair,
    /// Minimum net profit per tranche, in absolute quote currency (USDT)
    pub min_profit: f64,
    /// Maximum order size, base currency
    pub max_order_size: f64,
    /// Expected transport latency, informational
    pub latency_ms: f64,
}

impl Config {
    /// Load and validate a configuration file. Any violation is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let raw: RawConfig = serde_json::from_str(&raw)
            .with_context(|| format!("bad config file {}", path.display()))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let mut venues = [false; Venue::COUNT];
        for name in &raw.exchanges {
            let venue = Venue::from_name(name).with_context(|| {
                format!("unknown exchange '{}' (supported: okx, deribit, bybit)", name)
            })?;
            venues[venue.index()] = true;
        }
        if !venues.iter().any(|&v| v) {
            bail!("no exchanges enabled; fill the 'exchanges' list");
        }

        if raw.pairs.is_empty() {
            bail!("no pairs enabled; fill the 'pairs' list");
        }
        if raw.pairs.len() > 1 {
            bail!("exactly one pair per run is supported, got {}", raw.pairs.len());
        }
        let pair = Pair::from_name(&raw.pairs[0]).with_context(|| {
            format!(
                "unknown pair '{}' (supported: BTC/USDT, ETH/USDT, SOL/USDT)",
                raw.pairs[0]
            )
        })?;

        let mut fees = [0.0; Venue::COUNT];
        for (name, &fee) in &raw.fees {
            let venue = Venue::from_name(name).with_context(|| {
                format!("unknown exchange '{}' in fees", name)
            })?;
            if !venues[venue.index()] {
                bail!("fee given for disabled exchange '{}'", name);
            }
            if !fee.is_finite() || fee < 0.0 {
                bail!("fee for '{}' must be a non-negative percentage", name);
            }
            fees[venue.index()] = fee;
        }

        if !raw.min_profit.is_finite() || raw.min_profit < 0.0 {
            bail!("min_profit must be a non-negative quote-currency amount");
        }
        if !raw.max_order_size.is_finite() || raw.max_order_size <= 0.0 {
            bail!("max_order_size must be positive");
        }

        Ok(Self {
            venues,
            fees,
            pair,
            min_profit: raw.min_profit,
            max_order_size: raw.max_order_size,
            latency_ms: raw.latency_ms,
        })
    }

    /// Enabled venues in index order.
    pub fn enabled_venues(&self) -> impl Iterator<Item = Venue> + '_ {
        Venue::ALL.into_iter().filter(|v| self.venues[v.index()])
    }
}
