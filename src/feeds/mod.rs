//! Per-venue WebSocket ingest adapters.
//!
//! One feed task per enabled venue. Each message is stamped with a monotonic
//! arrival time BEFORE parsing (latency downstream is end-to-end transport +
//! detect time), decoded into the venue's book slot, published, and the
//! ingest signal raised. Malformed messages are dropped without publishing;
//! connection loss triggers reconnection with exponential backoff. The core
//! pipeline never sees any of this; it only observes slot publications.

pub mod parse;

use crate::book::SlotWriter;
use crate::config::{Pair, Venue};
use crate::metrics::PipelineMetrics;
use crate::models::{mono_now_ns, L2Book};
use crate::signal::CountingSignal;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

const RECONNECT_BASE_DELAY: Duration = Duration::from_millis(100);
const RECONNECT_MAX_DELAY: Duration = Duration::from_secs(30);

pub struct VenueFeed {
    venue: Venue,
    url: String,
    numbers_as_strings: bool,
    writer: SlotWriter,
    book_signal: Arc<CountingSignal>,
    metrics: Arc<PipelineMetrics>,
    shutdown: Arc<AtomicBool>,
    /// Scratch snapshot reused across messages
    scratch: L2Book,
}

impl VenueFeed {
    pub fn new(
        venue: Venue,
        pair: Pair,
        writer: SlotWriter,
        book_signal: Arc<CountingSignal>,
        metrics: Arc<PipelineMetrics>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        Self {
            venue,
            url: venue.ws_url(pair),
            numbers_as_strings: venue.numbers_as_strings(),
            writer,
            book_signal,
            metrics,
            shutdown,
            scratch: L2Book::new(),
        }
    }

    /// Connection loop with exponential backoff; runs until shutdown.
    pub async fn run(mut self) {
        let mut reconnect_delay = RECONNECT_BASE_DELAY;

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.connect_and_stream().await {
                Ok(()) => {
                    reconnect_delay = RECONNECT_BASE_DELAY;
                }
                Err(e) => {
                    if self.shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                    self.metrics.reconnects.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        venue = self.venue.as_str(),
                        error = %e,
                        delay_ms = reconnect_delay.as_millis() as u64,
                        "feed disconnected, reconnecting"
                    );
                    tokio::time::sleep(reconnect_delay).await;
                    reconnect_delay = (reconnect_delay * 2).min(RECONNECT_MAX_DELAY);
                }
            }
        }

        info!(venue = self.venue.as_str(), "feed stopped");
    }

    async fn connect_and_stream(&mut self) -> Result<()> {
        let (ws_stream, _) = connect_async(&self.url)
            .await
            .with_context(|| format!("failed to connect to {}", self.url))?;

        info!(venue = self.venue.as_str(), url = %self.url, "feed connected");

        let (mut write, mut read) = ws_stream.split();

        // Reused per-message parse buffer (simd-json mutates it in place)
        let mut parse_buffer: Vec<u8> = Vec::with_capacity(16 * 1024);

        while let Some(msg) = read.next().await {
            if self.shutdown.load(Ordering::Relaxed) {
                return Ok(());
            }

            match msg.context("websocket stream error")? {
                Message::Text(text) => {
                    self.handle_payload(text.as_bytes(), &mut parse_buffer);
                }
                Message::Binary(data) => {
                    self.handle_payload(&data, &mut parse_buffer);
                }
                Message::Ping(payload) => {
                    let _ = write.send(Message::Pong(payload)).await;
                }
                Message::Close(frame) => {
                    debug!(venue = self.venue.as_str(), ?frame, "close frame");
                    anyhow::bail!("closed by server");
                }
                _ => {}
            }
        }

        anyhow::bail!("websocket stream ended")
    }

    /// Ingest one raw message: stamp, decode, publish, signal.
    fn handle_payload(&mut self, raw: &[u8], parse_buffer: &mut Vec<u8>) {
        // Arrival stamp comes first; it anchors the latency measurement.
        let recv_ns = mono_now_ns();

        parse_buffer.clear();
        parse_buffer.extend_from_slice(raw);

        match parse::decode_book(parse_buffer, self.numbers_as_strings, &mut self.scratch) {
            Ok(()) => {
                self.scratch.captured_at_ns = recv_ns;
                self.writer.publish(&self.scratch);
                self.book_signal.release();
            }
            Err(err) => {
                // Drop: no publish, no signal.
                self.metrics.parse_errors.fetch_add(1, Ordering::Relaxed);
                debug!(venue = self.venue.as_str(), ?err, "dropping malformed message");
            }
        }
    }
}
