// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// A monotonic time source measured in whole seconds. The host supplies one
/// of these to each session; the session only reads it from within `tick`,
/// it never sleeps or schedules anything itself.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

/// Clock backed by [`std::time::Instant`], anchored at creation.
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        self.start.elapsed().as_secs()
    }
}

/// A clock the caller advances by hand. Used by tests and by hosts that
/// drive time themselves.
#[derive(Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::Relaxed);
    }

    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> u64 {
        self.now.load(Ordering::Relaxed)
    }
}

/// A countdown timer. Ticked by the owning session with the seconds that
/// elapsed between `tick` calls.
#[derive(Clone)]
pub struct Timer {
    /// How long the timer runs until it fires.
    pub interval: u64,

    /// Timer state. The first value indicates if the timer is enabled. The
    /// second value indicates how much time is left.
    value: Arc<Mutex<(bool, u64)>>,
}

impl Timer {
    /// Create a new, disabled timer with the specified interval in seconds.
    pub fn new(interval: u64) -> Self {
        Self {
            interval,
            value: Arc::new(Mutex::new((false, interval))),
        }
    }

    /// Make the timer tick, decrementing the value by the elapsed seconds.
    /// The decrement saturates, so ticking once the timer has reached zero
    /// is a no-op. Use `expired` to check for expiration.
    pub fn tick(&self, elapsed: u64) {
        let mut value = self.value.lock().unwrap();
        if value.0 {
            value.1 = value.1.saturating_sub(elapsed);
        }
    }

    /// Returns true if the timer is enabled.
    pub fn enabled(&self) -> bool {
        self.value.lock().unwrap().0
    }

    /// Enable the timer. Only enabled timers can expire.
    pub fn enable(&self) {
        self.value.lock().unwrap().0 = true;
    }

    /// Disable the timer. Only enabled timers can expire.
    pub fn disable(&self) {
        self.value.lock().unwrap().0 = false;
    }

    /// Check if the timer has expired. Returns true if the timer is enabled
    /// and has ticked down to zero.
    pub fn expired(&self) -> bool {
        let v = self.value.lock().unwrap();
        v.0 && v.1 == 0
    }

    /// Reset the value of a timer to the timer's interval.
    pub fn reset(&self) {
        self.value.lock().unwrap().1 = self.interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timer_expiry() {
        let t = Timer::new(30);
        assert!(!t.enabled());

        // Disabled timers do not tick down.
        t.tick(10);
        assert!(!t.expired());

        t.enable();
        t.tick(29);
        assert!(!t.expired());
        t.tick(1);
        assert!(t.expired());

        // Saturating: further ticks keep it expired.
        t.tick(100);
        assert!(t.expired());

        t.reset();
        assert!(!t.expired());
        t.tick(30);
        assert!(t.expired());

        t.disable();
        assert!(!t.expired());
    }

    #[test]
    fn manual_clock() {
        let c = ManualClock::new(100);
        assert_eq!(c.now(), 100);
        c.advance(17);
        assert_eq!(c.now(), 117);
        c.set(1701);
        assert_eq!(c.now(), 1701);
    }
}
