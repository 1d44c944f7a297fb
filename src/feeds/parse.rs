//! Venue L2 message decoding.
//!
//! Messages are `{"asks": [[price, qty], ...], "bids": [[price, qty], ...]}`
//! with asks ascending and bids descending. Depending on the venue the
//! numbers arrive either as JSON numbers or string-encoded; the per-venue
//! flag picks the decoder. Parsing is simd-json over a caller-owned scratch
//! buffer so the hot path never allocates per message.

use crate::models::{L2Book, MAX_LEVELS};
use simd_json::prelude::*;
use simd_json::BorrowedValue;

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    InvalidJson,
    NotObject,
    BadLevel,
    BadNumber,
}

/// Decode a venue message into `book`, consuming at most `MAX_LEVELS` per
/// side. A missing side yields size 0. `captured_at_ns` is left untouched;
/// the feed stamps it from the arrival time.
///
/// The buffer is mutated in place (simd-json requirement).
pub fn decode_book(
    raw: &mut [u8],
    numbers_as_strings: bool,
    book: &mut L2Book,
) -> Result<(), ParseError> {
    let value = simd_json::to_borrowed_value(raw).map_err(|_| ParseError::InvalidJson)?;
    let obj = value.as_object().ok_or(ParseError::NotObject)?;

    book.ask_size = 0;
    if let Some(asks) = obj.get("asks").and_then(|v| v.as_array()) {
        for level in asks.iter().take(MAX_LEVELS) {
            let (price, qty) = decode_level(level, numbers_as_strings)?;
            book.ask_price[book.ask_size] = price;
            book.ask_qty[book.ask_size] = qty;
            book.ask_size += 1;
        }
    }

    book.bid_size = 0;
    if let Some(bids) = obj.get("bids").and_then(|v| v.as_array()) {
        for level in bids.iter().take(MAX_LEVELS) {
            let (price, qty) = decode_level(level, numbers_as_strings)?;
            book.bid_price[book.bid_size] = price;
            book.bid_qty[book.bid_size] = qty;
            book.bid_size += 1;
        }
    }

    Ok(())
}

#[inline]
fn decode_level(
    level: &BorrowedValue,
    numbers_as_strings: bool,
) -> Result<(f64, f64), ParseError> {
    let pair = level.as_array().ok_or(ParseError::BadLevel)?;
    if pair.len() < 2 {
        return Err(ParseError::BadLevel);
    }
    let price = decode_number(&pair[0], numbers_as_strings)?;
    let qty = decode_number(&pair[1], numbers_as_strings)?;
    if !(price.is_finite() && qty.is_finite()) || price <= 0.0 || qty <= 0.0 {
        return Err(ParseError::BadLevel);
    }
    Ok((price, qty))
}

#[inline]
fn decode_number(value: &BorrowedValue, numbers_as_strings: bool) -> Result<f64, ParseError> {
    if numbers_as_strings {
        let s = value.as_str().ok_or(ParseError::BadNumber)?;
        fast_float::parse(s).map_err(|_| ParseError::BadNumber)
    } else {
        value.as_f64().ok_or(ParseError::BadNumber)
    }
}
