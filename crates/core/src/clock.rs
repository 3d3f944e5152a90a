//! Wall-clock source for expiry arithmetic

use chrono::Utc;

/// Source of "now" in whole epoch seconds
pub trait Clock: Send + Sync {
    fn now_secs(&self) -> i64;
}

/// Real wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_secs(&self) -> i64 {
        Utc::now().timestamp()
    }
}
