//! Per-venue book slot: a single-producer / single-consumer publish cell.
//!
//! Each venue gets one slot. The ingest adapter overwrites the whole snapshot
//! in place and raises a `fresh` flag with release ordering; the detector
//! observes the flag with acquire ordering, copies the snapshot out bitwise
//! and clears the flag. The slot is deliberately NOT a queue: a burst of
//! publishes between two detector ticks coalesces into the freshest state,
//! which is all arbitrage detection needs.
//!
//! Exclusive access is enforced at compile time: `book_slot()` hands out
//! exactly one `SlotWriter` and one `SlotReader`, neither of which is `Clone`,
//! and both of which take `&mut self` on their accessors.

use crate::models::L2Book;
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

struct BookSlot {
    /// The snapshot payload (UnsafeCell for interior mutability)
    book: UnsafeCell<L2Book>,
    /// Publication flag: true = consumer has not yet taken this publication
    fresh: AtomicBool,
}

// SAFETY: a slot is touched by exactly one writer handle and one reader
// handle. The writer mutates `book` only before the release-store of `fresh`,
// and the reader copies it only after the acquire-load, so the flag sequences
// every payload access across the two threads.
unsafe impl Sync for BookSlot {}
unsafe impl Send for BookSlot {}

/// Writing half of a book slot; owned by one ingest adapter.
pub struct SlotWriter {
    slot: Arc<BookSlot>,
}

/// Reading half of a book slot; owned by the detector.
pub struct SlotReader {
    slot: Arc<BookSlot>,
}

/// Create one slot and split it into its writer and reader handles.
pub fn book_slot() -> (SlotWriter, SlotReader) {
    let slot = Arc::new(BookSlot {
        book: UnsafeCell::new(L2Book::new()),
        fresh: AtomicBool::new(false),
    });
    (
        SlotWriter { slot: Arc::clone(&slot) },
        SlotReader { slot },
    )
}

impl SlotWriter {
    /// Overwrite the slot with a new snapshot and mark it fresh.
    ///
    /// All payload fields become visible to the reader before the flag does.
    #[inline]
    pub fn publish(&mut self, book: &L2Book) {
        // SAFETY: single-writer guarantee from the unique `&mut` handle; the
        // release-store below sequences this write for the reader.
        unsafe {
            *self.slot.book.get() = *book;
        }
        self.slot.fresh.store(true, Ordering::Release);
    }
}

impl SlotReader {
    /// If the slot holds an untaken publication, copy it into `dest` and
    /// clear the flag. Returns false without touching `dest` otherwise.
    #[inline]
    pub fn try_take(&mut self, dest: &mut L2Book) -> bool {
        if !self.slot.fresh.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: single-reader guarantee from the unique `&mut` handle; the
        // acquire-load above sequences the writer's payload before this copy.
        unsafe {
            *dest = *self.slot.book.get();
        }
        self.slot.fresh.store(false, Ordering::Release);
        true
    }

    /// Whether an untaken publication is pending.
    #[inline]
    pub fn is_fresh(&self) -> bool {
        self.slot.fresh.load(Ordering::Acquire)
    }
}
