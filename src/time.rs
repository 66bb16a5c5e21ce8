//! # Wrap-Safe Time
//!
//! Opaque timestamps and durations for the scheduler. Timestamps are
//! unsigned tick counts that wrap; ordering is defined over a rolling
//! window by interpreting the two's-complement difference as signed, so
//! comparisons stay correct across the numeric wrap boundary. Never
//! compare raw tick values with `<`.

use core::ops::{Add, Sub};

use crate::config::{RawTick, RawTickDelta};

// ---------------------------------------------------------------------------
// Instant
// ---------------------------------------------------------------------------

/// A point in time, measured in ticks of the scheduler's clock source.
///
/// `Instant` deliberately does not implement `Ord`: the ordering is
/// modular, not total. Use [`Instant::precedes`] and [`Instant::follows`].
/// Two instants exactly half the timestamp range apart are not ordered;
/// tasks must not be scheduled that far into the future.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instant(RawTick);

impl Instant {
    /// The zero timestamp. Freshly initialized tasks carry this fire time.
    pub const ZERO: Instant = Instant(0);

    /// Construct an instant from a raw tick count.
    #[inline]
    pub const fn from_ticks(ticks: RawTick) -> Self {
        Instant(ticks)
    }

    /// The raw tick count.
    #[inline]
    pub const fn ticks(self) -> RawTick {
        self.0
    }

    /// True if `self` is strictly earlier than `other` within the rolling
    /// comparison window. Equal instants neither precede nor follow.
    #[inline]
    pub fn precedes(self, other: Instant) -> bool {
        other.0.wrapping_sub(self.0) as RawTickDelta > 0
    }

    /// True if `self` is strictly later than `other` within the rolling
    /// comparison window.
    #[inline]
    pub fn follows(self, other: Instant) -> bool {
        other.precedes(self)
    }

    /// The instant `duration` ticks away from `self` (negative durations
    /// move backwards). Wraps modularly.
    #[inline]
    pub const fn offset(self, duration: Duration) -> Instant {
        Instant(self.0.wrapping_add(duration.0 as RawTick))
    }

    /// Ticks elapsed from `earlier` to `self`, as a signed duration.
    /// Only meaningful when the two instants are within the comparison
    /// window of each other.
    #[inline]
    pub const fn since(self, earlier: Instant) -> Duration {
        Duration(self.0.wrapping_sub(earlier.0) as RawTickDelta)
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    #[inline]
    fn add(self, rhs: Duration) -> Instant {
        self.offset(rhs)
    }
}

impl Sub<Instant> for Instant {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Instant) -> Duration {
        self.since(rhs)
    }
}

// ---------------------------------------------------------------------------
// Duration
// ---------------------------------------------------------------------------

/// A signed span of time in clock ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Duration(RawTickDelta);

impl Duration {
    /// The empty duration.
    pub const ZERO: Duration = Duration(0);

    /// Construct a duration from a signed tick count.
    #[inline]
    pub const fn from_ticks(ticks: RawTickDelta) -> Self {
        Duration(ticks)
    }

    /// The signed tick count.
    #[inline]
    pub const fn ticks(self) -> RawTickDelta {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Unit tests (host-only)
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn equal_instants_are_unordered() {
        let t = Instant::from_ticks(1000);
        assert!(!t.precedes(t));
        assert!(!t.follows(t));
    }

    #[test]
    fn basic_ordering() {
        let a = Instant::from_ticks(1000);
        let b = Instant::from_ticks(1050);
        assert!(a.precedes(b));
        assert!(b.follows(a));
        assert!(!b.precedes(a));
        assert!(!a.follows(b));
    }

    #[test]
    fn ordering_across_wrap_boundary() {
        // Numerically smaller, but later in the rolling window.
        let before = Instant::from_ticks(RawTick::MAX - 5);
        let after = before.offset(Duration::from_ticks(10));
        assert_eq!(after.ticks(), 4);
        assert!(before.precedes(after));
        assert!(after.follows(before));
    }

    #[test]
    fn offset_round_trip() {
        let t = Instant::from_ticks(1000);
        let d = Duration::from_ticks(250);
        assert_eq!((t + d).since(t), d);
        assert_eq!(t + d - t, d);
    }

    #[test]
    fn negative_offset_moves_backwards() {
        let t = Instant::from_ticks(1000);
        let earlier = t.offset(Duration::from_ticks(-100));
        assert_eq!(earlier.ticks(), 900);
        assert!(earlier.precedes(t));
    }

    #[quickcheck]
    fn positive_offsets_follow(origin: RawTick, delta: RawTick) -> bool {
        // Restrict to the comparison window (half the timestamp range).
        let delta = delta % (1 << 31);
        if delta == 0 {
            return true;
        }
        let t = Instant::from_ticks(origin);
        let later = t.offset(Duration::from_ticks(delta as RawTickDelta));
        t.precedes(later) && later.follows(t)
    }

    #[quickcheck]
    fn ordering_is_antisymmetric(a: RawTick, b: RawTick) -> bool {
        let a = Instant::from_ticks(a);
        let b = Instant::from_ticks(b);
        // At most one of precedes/follows holds; both fail only for equal
        // instants or the ambiguous half-range separation.
        !(a.precedes(b) && b.precedes(a))
    }

    #[quickcheck]
    fn since_inverts_offset(origin: RawTick, delta: RawTickDelta) -> bool {
        let t = Instant::from_ticks(origin);
        let d = Duration::from_ticks(delta);
        t.offset(d).since(t) == d
    }
}
