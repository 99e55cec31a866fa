// ABOUTME: Process-wide SMPP sequence number source with atomic increment-and-wrap
// ABOUTME: Values stay in 1..=0x7FFFFFFF; zero is never handed out

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

const MAX_SEQUENCE: u32 = 0x7FFF_FFFF;

/// Monotonic sequence counter.
///
/// After `0x7FFFFFFF` the counter wraps to 1. A session normally uses the
/// shared instance; tests inject their own.
#[derive(Debug, Default)]
pub struct SequenceNumber {
    current: AtomicU32,
}

impl SequenceNumber {
    pub const fn new() -> Self {
        Self::starting_after(0)
    }

    /// Counter whose first `next()` returns the value following `value`
    pub const fn starting_after(value: u32) -> Self {
        Self {
            current: AtomicU32::new(value),
        }
    }

    pub fn next(&self) -> u32 {
        let mut current = self.current.load(Ordering::Relaxed);
        loop {
            let next = advance(current);
            match self.current.compare_exchange_weak(
                current,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }

    /// Shared counter used when settings do not inject one
    pub fn shared() -> Arc<SequenceNumber> {
        static SHARED: OnceLock<Arc<SequenceNumber>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(SequenceNumber::new())).clone()
    }
}

fn advance(current: u32) -> u32 {
    match current.wrapping_add(1) & MAX_SEQUENCE {
        0 => 1,
        next => next,
    }
}
