//! Bounded counting signals coordinating the pipeline stages.
//!
//! Two of these drive the whole data plane: ingest → detector and detector →
//! persistor. A release increments the pending count, saturating at
//! `MAX_PENDING`; an acquire blocks until the count is positive and then
//! decrements it. Saturation is the backpressure policy: when producers
//! outrun the consumer, surplus wakeups are dropped and the consumer catches
//! up by reading whichever state is freshest, mirroring the coalescing book
//! slots. Signals carry no payload.

use parking_lot::{Condvar, Mutex};

/// Maximum pending count; further releases before a wake are coalesced.
pub const MAX_PENDING: u32 = 2;

struct SignalState {
    permits: u32,
    closed: bool,
}

pub struct CountingSignal {
    state: Mutex<SignalState>,
    cond: Condvar,
}

impl CountingSignal {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SignalState {
                permits: 0,
                closed: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Signal the consumer. Saturates at `MAX_PENDING`; never blocks.
    pub fn release(&self) {
        let mut state = self.state.lock();
        if state.permits < MAX_PENDING {
            state.permits += 1;
            self.cond.notify_one();
        }
    }

    /// Block until a permit is available and consume it.
    ///
    /// Returns `false` only once the signal has been closed and every
    /// remaining permit has been drained, so consumers finish in-flight
    /// work before exiting.
    pub fn acquire(&self) -> bool {
        let mut state = self.state.lock();
        loop {
            if state.permits > 0 {
                state.permits -= 1;
                return true;
            }
            if state.closed {
                return false;
            }
            self.cond.wait(&mut state);
        }
    }

    /// Close the signal and wake all blocked consumers.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        self.cond.notify_all();
    }

    /// Current pending count (for diagnostics and tests).
    pub fn pending(&self) -> u32 {
        self.state.lock().permits
    }
}

impl Default for CountingSignal {
    fn default() -> Self {
        Self::new()
    }
}
