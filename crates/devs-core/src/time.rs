//! Simulated time
//!
//! DEVS time is a real number that may be +∞ (a passive model never
//! schedules an internal transition). `SimTime` wraps an `f64` and gives it a
//! total order so simulators can take `min`/`max` over their children.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// A point on (or a span of) the simulated time axis
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(pub f64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0.0);
    pub const INFINITY: SimTime = SimTime(f64::INFINITY);

    /// Wrap `value`; `-0.0` becomes `0.0`
    #[inline]
    pub fn new(value: f64) -> Self {
        SimTime(if value == 0.0 { 0.0 } else { value })
    }

    #[inline]
    pub fn as_f64(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn is_infinite(self) -> bool {
        self.0 == f64::INFINITY
    }

    /// A valid time advance: non-negative and not NaN (+∞ allowed)
    #[inline]
    pub fn is_valid_duration(self) -> bool {
        !self.0.is_nan() && self.0 >= 0.0
    }

    /// True when `self` lies in the closed interval `[lo, hi]`
    #[inline]
    pub fn within(self, lo: SimTime, hi: SimTime) -> bool {
        lo <= self && self <= hi
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for SimTime {
    #[inline]
    fn from(value: f64) -> Self {
        SimTime::new(value)
    }
}

impl From<SimTime> for f64 {
    #[inline]
    fn from(value: SimTime) -> Self {
        value.0
    }
}

impl Add for SimTime {
    type Output = SimTime;

    #[inline]
    fn add(self, rhs: SimTime) -> Self::Output {
        SimTime::new(self.0 + rhs.0)
    }
}

impl Sub for SimTime {
    type Output = SimTime;

    #[inline]
    fn sub(self, rhs: SimTime) -> Self::Output {
        SimTime::new(self.0 - rhs.0)
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t({})", self)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_infinite() {
            write!(f, "inf")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_infinity_orders_last() {
        let times = [SimTime::new(3.0), SimTime::INFINITY, SimTime::ZERO];
        assert_eq!(times.iter().max(), Some(&SimTime::INFINITY));
        assert_eq!(times.iter().min(), Some(&SimTime::ZERO));
    }

    #[test]
    fn test_infinite_arithmetic() {
        let t = SimTime::new(7.0) + SimTime::INFINITY;
        assert!(t.is_infinite());
        assert_eq!(t, SimTime::INFINITY);
    }

    #[test]
    fn test_duration_validity() {
        assert!(SimTime::ZERO.is_valid_duration());
        assert!(SimTime::INFINITY.is_valid_duration());
        assert!(!SimTime::new(-1.0).is_valid_duration());
        assert!(!SimTime::new(f64::NAN).is_valid_duration());
    }

    #[test]
    fn test_negative_zero_is_zero() {
        let t = SimTime::new(-0.0);
        assert_eq!(t, SimTime::ZERO);
        assert!(t.as_f64().is_sign_positive());
        assert_eq!(SimTime::ZERO + SimTime::from(-0.0), SimTime::ZERO);
        assert_eq!(SimTime::new(2.0) - SimTime::new(2.0), SimTime::ZERO);
        assert!(SimTime::ZERO.within(SimTime::ZERO, SimTime::new(-0.0)));
    }

    proptest! {
        #[test]
        fn prop_order_matches_f64(a in -1.0e6f64..1.0e6, b in -1.0e6f64..1.0e6) {
            let (x, y) = (SimTime::new(a), SimTime::new(b));
            prop_assert_eq!(x < y, a < b);
            prop_assert_eq!(x == y, a == b);
            prop_assert_eq!(x.max(y).as_f64(), a.max(b));
            prop_assert!(x < SimTime::INFINITY);
        }
    }

    #[test]
    fn test_within_closed_interval() {
        let lo = SimTime::new(3.0);
        let hi = SimTime::new(7.0);
        assert!(SimTime::new(3.0).within(lo, hi));
        assert!(SimTime::new(7.0).within(lo, hi));
        assert!(!SimTime::new(7.5).within(lo, hi));
        assert!(SimTime::new(9.0).within(lo, SimTime::INFINITY));
    }

    #[test]
    fn test_display() {
        assert_eq!(SimTime::new(3.0).to_string(), "3");
        assert_eq!(SimTime::new(2.5).to_string(), "2.5");
        assert_eq!(SimTime::INFINITY.to_string(), "inf");
    }
}
