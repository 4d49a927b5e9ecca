use derive_more::Display;
use derive_new::new;
use formato::Formato;
use once_cell::sync::Lazy;
use quanta::Clock;
use serde::{Deserialize, Serialize};
use std::convert::From;
use std::ops::{Add, Sub};
use std::time::Duration;

type RawTime = u64;

static CLOCK: Lazy<Clock> = Lazy::new(Clock::new);

/// A point in scheduler time, in nanoseconds.  Real-time schedulers read a
/// monotonic clock, virtual-time schedulers count from wherever their clock
/// was started (usually zero).  Also used for offsets relative to a
/// subscription's own zero point.
#[derive(
    new,
    Display,
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
    Deserialize,
)]
pub struct NanoTime(RawTime);

impl NanoTime {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(RawTime::MAX);
    pub const SECONDS_PER_NANO: f64 = 1e-9;

    /// Monotonic clock time.
    pub fn now() -> Self {
        Self(CLOCK.now().as_u64())
    }

    pub fn pretty(&self) -> String {
        (self.0 as f64 * Self::SECONDS_PER_NANO).formato("#,###.000_000")
    }

    /// Addition clamped at [NanoTime::MAX].  Due times are computed with
    /// this so that a huge delay parks an action at the end of time rather
    /// than wrapping around to the front of the queue.
    pub fn saturating_add(self, other: impl Into<NanoTime>) -> Self {
        Self(self.0.saturating_add(other.into().0))
    }

    /// Subtraction clamped at [NanoTime::ZERO].
    pub fn saturating_sub(self, other: impl Into<NanoTime>) -> Self {
        Self(self.0.saturating_sub(other.into().0))
    }
}

impl From<u128> for NanoTime {
    fn from(t: u128) -> Self {
        NanoTime(t.min(RawTime::MAX as u128) as RawTime)
    }
}

impl From<u64> for NanoTime {
    fn from(t: u64) -> Self {
        NanoTime(t)
    }
}

impl From<u32> for NanoTime {
    fn from(t: u32) -> Self {
        NanoTime(t as RawTime)
    }
}

impl From<Duration> for NanoTime {
    fn from(dur: Duration) -> Self {
        Self::from(dur.as_nanos())
    }
}

impl From<NanoTime> for u64 {
    fn from(t: NanoTime) -> Self {
        t.0
    }
}

impl From<NanoTime> for Duration {
    fn from(t: NanoTime) -> Self {
        Duration::from_nanos(u64::from(t))
    }
}

impl Add<NanoTime> for NanoTime {
    type Output = Self;
    fn add(self, other: Self) -> Self::Output {
        Self(self.0 + other.0)
    }
}

impl Add<Duration> for NanoTime {
    type Output = Self;
    fn add(self, other: Duration) -> Self::Output {
        self + NanoTime::from(other)
    }
}

/// Clamped at [NanoTime::ZERO], like [NanoTime::saturating_sub].
impl Sub<NanoTime> for NanoTime {
    type Output = Self;
    fn sub(self, other: Self) -> Self::Output {
        self.saturating_sub(other)
    }
}
