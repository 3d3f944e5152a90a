//! Per-second countdown that runs while the warning is shown

use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};

/// Result of one countdown step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Still counting, with this many seconds left
    Remaining(u64),
    /// Reached zero
    Elapsed,
}

/// One countdown step; never goes below zero
#[must_use]
pub const fn step(seconds_remaining: u64) -> u64 {
    seconds_remaining.saturating_sub(1)
}

/// Live countdown. Owning one means a tick timer is running; dropping it
/// cancels the timer.
#[derive(Debug)]
pub struct Countdown {
    seconds_remaining: u64,
    ticker: Interval,
}

impl Countdown {
    /// Start counting down from `seconds`; the first tick fires one `period`
    /// from now
    #[must_use]
    pub fn start(seconds: u64, period: Duration) -> Self {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            seconds_remaining: seconds,
            ticker,
        }
    }

    #[must_use]
    pub const fn seconds_remaining(&self) -> u64 {
        self.seconds_remaining
    }

    /// Replace the remaining time with a fresh reading, keeping the timer
    pub const fn resync(&mut self, seconds: u64) {
        self.seconds_remaining = seconds;
    }

    /// Wait for the next tick and count down by one.
    ///
    /// Cancel safe: nothing changes unless the tick completes.
    pub async fn tick(&mut self) -> Tick {
        self.ticker.tick().await;
        self.seconds_remaining = step(self.seconds_remaining);
        if self.seconds_remaining == 0 {
            Tick::Elapsed
        } else {
            Tick::Remaining(self.seconds_remaining)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_saturates() {
        assert_eq!(step(3), 2);
        assert_eq!(step(1), 0);
        assert_eq!(step(0), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_once_per_period() {
        let started = Instant::now();
        let mut countdown = Countdown::start(3, Duration::from_secs(1));
        assert_eq!(countdown.seconds_remaining(), 3);

        assert_eq!(countdown.tick().await, Tick::Remaining(2));
        assert_eq!(started.elapsed(), Duration::from_secs(1));
        assert_eq!(countdown.tick().await, Tick::Remaining(1));
        assert_eq!(countdown.tick().await, Tick::Elapsed);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
        assert_eq!(countdown.seconds_remaining(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resync_keeps_timer() {
        let started = Instant::now();
        let mut countdown = Countdown::start(10, Duration::from_secs(1));

        assert_eq!(countdown.tick().await, Tick::Remaining(9));
        countdown.resync(5);
        assert_eq!(countdown.tick().await, Tick::Remaining(4));
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }
}
