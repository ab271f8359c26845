//! Timestamp values.
//!
//! Two shapes are supported: a calendar date stored as milliseconds since
//! the Unix epoch, and a high-precision instant stored as
//! `(epoch seconds, nanoseconds)`. Neither does leap-second correction —
//! both are plain, monotonic-within-a-day counts, matching what the
//! distilled format actually puts on the wire.
use std::cmp::Ordering;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// A calendar-date timestamp, stored as milliseconds since the Unix epoch.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Timestamp {
    epoch_millis: i64,
}

impl Timestamp {
    /// Builds a `Timestamp` from milliseconds since the Unix epoch.
    pub fn from_epoch_millis(epoch_millis: i64) -> Timestamp {
        Timestamp { epoch_millis }
    }

    /// Milliseconds since the Unix epoch.
    pub fn epoch_millis(&self) -> i64 {
        self.epoch_millis
    }
}

/// A high-precision instant, stored as seconds since the Unix epoch plus
/// a sub-second nanosecond remainder.
#[derive(Clone, Copy, Debug, Eq, Hash)]
pub struct Instant {
    epoch_secs: i64,
    nanos: i64,
}

impl Instant {
    /// Builds an `Instant` from epoch-seconds and a nanosecond remainder.
    /// `nanos` is normalized into `[0, 1_000_000_000)`, borrowing from or
    /// lending to `epoch_secs` as needed.
    pub fn new(epoch_secs: i64, nanos: i64) -> Instant {
        let mut secs = epoch_secs;
        let mut n = nanos;
        if n >= NANOS_PER_SEC {
            secs += n / NANOS_PER_SEC;
            n %= NANOS_PER_SEC;
        } else if n < 0 {
            let borrow = (-n + NANOS_PER_SEC - 1) / NANOS_PER_SEC;
            secs -= borrow;
            n += borrow * NANOS_PER_SEC;
        }
        Instant { epoch_secs: secs, nanos: n }
    }

    /// Seconds since the Unix epoch.
    pub fn epoch_secs(&self) -> i64 {
        self.epoch_secs
    }

    /// Nanosecond remainder, always in `[0, 1_000_000_000)`.
    pub fn subsec_nanos(&self) -> i64 {
        self.nanos
    }
}

impl PartialEq for Instant {
    fn eq(&self, other: &Instant) -> bool {
        self.epoch_secs == other.epoch_secs && self.nanos == other.nanos
    }
}

impl Ord for Instant {
    fn cmp(&self, other: &Instant) -> Ordering {
        (self.epoch_secs, self.nanos).cmp(&(other.epoch_secs, other.nanos))
    }
}

impl PartialOrd for Instant {
    fn partial_cmp(&self, other: &Instant) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
