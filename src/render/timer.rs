//! Fixed-cadence tick scheduling for the render loop

use std::time::{Duration, Instant};

/// Repeating timer polled from the window event loop.
///
/// Every successful [`fire`](Self::fire) schedules the next deadline one
/// interval later, whatever happened during the tick. The timer has no stop
/// state; it fires for as long as it is polled. When the caller falls more
/// than two intervals behind, the schedule restarts from the current time
/// instead of firing a burst of catch-up ticks.
#[derive(Clone, Debug)]
pub struct RepeatingTimer {
    interval: Duration,
    next_fire: Instant,
    fired: u64,
}

impl RepeatingTimer {
    /// A timer whose first tick is due at `start`
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            next_fire: start,
            fired: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the next tick is due
    pub fn deadline(&self) -> Instant {
        self.next_fire
    }

    /// Ticks fired so far
    pub fn fired(&self) -> u64 {
        self.fired
    }

    /// Whether a tick is due at `now`. A due tick reschedules the timer.
    pub fn fire(&mut self, now: Instant) -> bool {
        if now < self.next_fire {
            return false;
        }

        self.next_fire += self.interval;

        // Reset if too far behind
        let max_behind = self.interval * 2;
        if now > self.next_fire + max_behind {
            log::debug!(
                "Render timer {:?} behind, resetting schedule",
                now - self.next_fire
            );
            self.next_fire = now + self.interval;
        }

        self.fired += 1;
        true
    }
}
