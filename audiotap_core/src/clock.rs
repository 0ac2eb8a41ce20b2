//! Timestamp source for captured audio headers.
//!
//! The capture worker stamps every packet with a monotonic timestamp before
//! handing it to the downstream transport (§4.5, §6 `audio_header.timestamp`).
//! Adapted from the workspace's clock-sync primitive: the distributed
//! multi-node synchronization this pipeline doesn't need is dropped, leaving
//! a plain monotonic microsecond clock behind a trait so tests can supply a
//! deterministic one.

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Instant,
};

/// A source of monotonically non-decreasing microsecond timestamps.
pub trait Clock: Send + Sync {
    /// Microseconds since an arbitrary, clock-specific epoch.
    ///
    /// Only differences between two calls on the same `Clock` are
    /// meaningful; the absolute value carries no defined meaning across
    /// clocks or processes.
    fn now_micros(&self) -> u64;
}

/// Wall-clock-backed [`Clock`], monotonic for the lifetime of the process.
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    #[inline]
    fn now_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

/// A [`Clock`] driven explicitly by test code instead of [`Instant`].
#[derive(Debug)]
pub struct FixedClock {
    micros: AtomicU64,
}

impl FixedClock {
    pub fn new(start_micros: u64) -> Self {
        Self {
            micros: AtomicU64::new(start_micros),
        }
    }

    pub fn advance(&self, delta_micros: u64) {
        self.micros.fetch_add(delta_micros, Ordering::Relaxed);
    }
}

impl Clock for FixedClock {
    fn now_micros(&self) -> u64 {
        self.micros.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_micros();
        let b = clock.now_micros();
        assert!(b >= a);
    }

    #[test]
    fn fixed_clock_advances_on_demand() {
        let clock = FixedClock::new(100);
        assert_eq!(clock.now_micros(), 100);
        clock.advance(50);
        assert_eq!(clock.now_micros(), 150);
    }
}
