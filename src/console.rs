//! Operator command prompt.
//!
//! Line-oriented, no flags: `h|help`, `s|start` (page the next opportunities
//! out of the log), `m|metrics`, `y|system`, `q|quit`. Metric reads are
//! relaxed; the output is an operator aid, not an audit trail. `q` flips the
//! process-wide shutdown flag and returns control to main, which joins the
//! worker threads.

use crate::config::Config;
use crate::metrics::PipelineMetrics;
use crate::persist::oplog::LogPager;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Records shown per `s` command.
const PAGE_SIZE: usize = 10;

pub struct Console {
    cfg: Arc<Config>,
    metrics: Arc<PipelineMetrics>,
    pager: LogPager,
}

impl Console {
    pub fn new(cfg: Arc<Config>, metrics: Arc<PipelineMetrics>, pager: LogPager) -> Self {
        Self {
            cfg,
            metrics,
            pager,
        }
    }

    /// Run the prompt on the calling thread until `q` or stdin EOF.
    pub fn run(&mut self) {
        let stdin = io::stdin();
        println!("{}", help_text());

        loop {
            print!("> ");
            let _ = io::stdout().flush();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => break, // EOF: treat like quit
                Ok(_) => {}
                Err(_) => break,
            }

            match line.trim() {
                "" => {}
                "h" | "help" => println!("{}", help_text()),
                "s" | "start" => self.show_opportunities(),
                "m" | "metrics" => println!("{}", self.metrics_text()),
                "y" | "system" => println!("{}", self.system_text()),
                "q" | "quit" => break,
                other => println!("Unknown command '{}'. Type 'h' for help.", other),
            }
        }
    }

    fn show_opportunities(&mut self) {
        match self.pager.next_page(PAGE_SIZE) {
            Ok(records) if records.is_empty() => {
                println!("No new opportunities.");
            }
            Ok(records) => {
                for record in records {
                    print!("{}", record);
                }
            }
            Err(e) => println!("Failed to read opportunity log: {e:#}"),
        }
    }

    fn metrics_text(&self) -> String {
        let snap = self.metrics.snapshot();
        let mut out = format!(
            "\nPerformance Metrics:\n\
             Runtime: {} seconds\n\
             Updates Processed: {}\n\
             Opportunities Found: {}\n",
            snap.runtime_secs, snap.updates_processed, snap.opportunities_found,
        );
        if let Some(lat) = snap.latency {
            out.push_str(&format!(
                "Latency (us):\n  Min: {}\n  Avg: {}\n  Max: {}\n",
                lat.min_us, lat.avg_us, lat.max_us,
            ));
        }
        out
    }

    fn system_text(&self) -> String {
        let venues: Vec<&str> = self
            .cfg
            .enabled_venues()
            .map(|v| v.display_name())
            .collect();
        let snap = self.metrics.snapshot();
        format!(
            "\nSystem:\n\
             Venues: {}\n\
             Pair: {}\n\
             Min Profit: {} {} per tranche\n\
             Max Order Size: {} {}\n\
             Expected Transport Latency: {} ms\n\
             Parse Errors: {}\n\
             Reconnects: {}\n",
            venues.join(", "),
            self.cfg.pair.as_str(),
            self.cfg.min_profit,
            self.cfg.pair.quote(),
            self.cfg.max_order_size,
            self.cfg.pair.base(),
            self.cfg.latency_ms,
            snap.parse_errors,
            snap.reconnects,
        )
    }
}

fn help_text() -> &'static str {
    "\nAvailable Commands:\n\
     \x20 h, help     - Show this help message\n\
     \x20 s, start    - Show the next detected opportunities\n\
     \x20 m, metrics  - Show performance metrics\n\
     \x20 y, system   - Show system configuration and feed health\n\
     \x20 q, quit     - Exit the program\n"
}
