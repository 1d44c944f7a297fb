//! Append-only opportunity log.
//!
//! Each record is a multi-line human-readable block terminated by a 50-dash
//! rule, in the operator-facing display format. The console tails the file
//! from a remembered byte offset via `LogPager`, so a record is only surfaced
//! once its terminating rule has been flushed.

use crate::config::{Config, Venue};
use crate::models::Opportunity;
use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Record terminator: 50 dashes on their own line.
pub const RECORD_RULE: &str = "--------------------------------------------------";

pub struct OpportunityLog {
    writer: BufWriter<File>,
}

impl OpportunityLog {
    /// Open the log for appending, creating parent directories as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open opportunity log {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Append every opportunity of a round, then flush once.
    pub fn append_batch(&mut self, batch: &[Opportunity], cfg: &Config) -> Result<()> {
        for opp in batch {
            self.writer
                .write_all(format_record(opp, cfg).as_bytes())
                .context("failed to append opportunity record")?;
        }
        self.writer.flush().context("failed to flush opportunity log")
    }

    /// Flush any buffered records (called on shutdown).
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("failed to flush opportunity log")
    }
}

/// Render one opportunity in the operator display format.
pub fn format_record(opp: &Opportunity, cfg: &Config) -> String {
    let buy = Venue::from_index(opp.buy_venue).map(|v| v.display_name()).unwrap_or("?");
    let sell = Venue::from_index(opp.sell_venue).map(|v| v.display_name()).unwrap_or("?");
    format!(
        "Arbitrage Opportunity:\n\
         Buy on {} at {:.2} using {} levels\n\
         Sell on {} at {:.2} using {} levels\n\
         Profit: {:.3}%\n\
         Order Size: {:.6} {}\n\
         Market Impact: {} levels deep\n\
         Detection Latency: {:.2} us\n\
         Detected At: {}\n\
         {}\n",
        buy,
        opp.buy_vwap,
        opp.buy_levels,
        sell,
        opp.sell_vwap,
        opp.sell_levels,
        opp.net_profit_pct,
        opp.order_size,
        cfg.pair.base(),
        opp.buy_levels + opp.sell_levels,
        opp.detection_latency_us,
        opp.detected_at.to_rfc3339(),
        RECORD_RULE,
    )
}

/// Forward-only reader over the log, remembering its byte offset between
/// pages. Only complete (rule-terminated) records are returned.
pub struct LogPager {
    path: PathBuf,
    offset: u64,
}

impl LogPager {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            offset: 0,
        }
    }

    /// Read up to `max_records` complete records past the remembered offset.
    /// Returns an empty vec when the log has nothing new (or does not exist
    /// yet).
    pub fn next_page(&mut self, max_records: usize) -> Result<Vec<String>> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("failed to open {}", self.path.display()))
            }
        };
        file.seek(SeekFrom::Start(self.offset))
            .context("failed to seek opportunity log")?;

        let mut tail = String::new();
        file.read_to_string(&mut tail)
            .context("failed to read opportunity log")?;

        let terminator = format!("{}\n", RECORD_RULE);
        let mut records = Vec::new();
        let mut consumed = 0usize;
        let mut rest = tail.as_str();

        while records.len() < max_records {
            let Some(end) = rest.find(&terminator) else {
                break;
            };
            let record_len = end + terminator.len();
            records.push(rest[..record_len].to_string());
            consumed += record_len;
            rest = &rest[record_len..];
        }

        self.offset += consumed as u64;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Pair;
    use chrono::Utc;

    fn test_config() -> Config {
        Config {
            venues: [true; Venue::COUNT],
            fees: [0.0; Venue::COUNT],
            pair: Pair::BtcUsdt,
            min_profit: 0.0,
            max_order_size: 10.0,
            latency_ms: 0.0,
        }
    }

    fn sample_opportunity(order_size: f64) -> Opportunity {
        Opportunity {
            buy_venue: 0,
            sell_venue: 1,
            buy_levels: 1,
            sell_levels: 2,
            buy_vwap: 100.0,
            sell_vwap: 101.5,
            net_profit_pct: 1.5,
            order_size,
            detection_latency_us: 812.25,
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn record_format_matches_display_contract() {
        let cfg = test_config();
        let record = format_record(&sample_opportunity(2.5), &cfg);

        assert!(record.starts_with("Arbitrage Opportunity:\n"));
        assert!(record.contains("Buy on OKX at 100.00 using 1 levels"));
        assert!(record.contains("Sell on Deribit at 101.50 using 2 levels"));
        assert!(record.contains("Profit: 1.500%"));
        assert!(record.contains("Order Size: 2.500000 BTC"));
        assert!(record.contains("Market Impact: 3 levels deep"));
        assert!(record.contains("Detection Latency: 812.25 us"));
        assert!(record.ends_with(&format!("{}\n", RECORD_RULE)));
        assert_eq!(RECORD_RULE.len(), 50);
    }

    #[test]
    fn append_then_page_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opportunities.txt");
        let cfg = test_config();

        let mut log = OpportunityLog::open(&path).unwrap();
        let batch: Vec<Opportunity> = (0..5).map(|i| sample_opportunity(i as f64 + 1.0)).collect();
        log.append_batch(&batch, &cfg).unwrap();

        let mut pager = LogPager::new(&path);
        let page = pager.next_page(3).unwrap();
        assert_eq!(page.len(), 3);
        assert!(page[0].contains("Order Size: 1.000000 BTC"));

        let page = pager.next_page(3).unwrap();
        assert_eq!(page.len(), 2);
        assert!(page[1].contains("Order Size: 5.000000 BTC"));

        // Fully consumed: nothing further.
        assert!(pager.next_page(3).unwrap().is_empty());

        // New appends become visible from the remembered offset.
        log.append_batch(&[sample_opportunity(9.0)], &cfg).unwrap();
        let page = pager.next_page(10).unwrap();
        assert_eq!(page.len(), 1);
        assert!(page[0].contains("Order Size: 9.000000 BTC"));
    }

    #[test]
    fn pager_on_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut pager = LogPager::new(&dir.path().join("nope.txt"));
        assert!(pager.next_page(10).unwrap().is_empty());
    }

    #[test]
    fn pager_skips_unterminated_trailing_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("opportunities.txt");
        std::fs::write(
            &path,
            format!("complete record\n{}\npartial record without rule\n", RECORD_RULE),
        )
        .unwrap();

        let mut pager = LogPager::new(&path);
        let page = pager.next_page(10).unwrap();
        assert_eq!(page.len(), 1);
        assert!(page[0].starts_with("complete record"));

        // The partial tail stays pending until terminated.
        assert!(pager.next_page(10).unwrap().is_empty());
    }
}
