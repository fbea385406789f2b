// Raffle Engine - Time source
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

use crate::state::UnixTimestamp;

/// Source of the current time for lifecycle checks and draw timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> UnixTimestamp;
}

/// Wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UnixTimestamp {
        Utc::now().timestamp()
    }
}

/// Manually driven clock
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicI64,
}

impl FixedClock {
    pub fn new(now: UnixTimestamp) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    pub fn set(&self, now: UnixTimestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> UnixTimestamp {
        self.now.load(Ordering::SeqCst)
    }
}
