//! Closed numeric ranges with an explicit "empty" state.
//!
//! [`Interval`] is the workhorse behind polygon scan-line intersection and coverage computations.
//! Every operation on it is total: instead of failing, operations that have no meaningful result
//! leave (or put) the interval into its invalid state, which callers can check with
//! [`Interval::is_valid`].

use std::fmt;
use std::fmt::{Display, Formatter};

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A closed range `[min, max]` over `f64`.
///
/// The interval is either _valid_ (`min <= max`) or _invalid_, in which case it holds the
/// sentinel pair `(+∞, -∞)`. The sentinel is chosen so that growing an invalid interval by a
/// value yields exactly that value as both bounds.
///
/// The default interval is invalid:
///
/// ```rust
/// use flightplan_kinematics::Interval;
///
/// let mut interval = Interval::default();
/// assert!(!interval.is_valid());
///
/// interval.update(4.);
/// interval.update(-1.);
/// assert_eq!(interval, Interval::new(-1., 4.));
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval {
    min: f64,
    max: f64,
}

impl Default for Interval {
    fn default() -> Self {
        Self::invalid()
    }
}

impl Interval {
    /// The invalid (empty) interval.
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }

    /// Constructs `[min, max]`.
    ///
    /// If `min > max` (or either bound is NaN) the result is the invalid interval.
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self::invalid()
        }
    }

    /// Constructs the degenerate interval `[value, value]`.
    #[must_use]
    pub fn from_value(value: f64) -> Self {
        Self::new(value, value)
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        self.max
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.min <= self.max
    }

    /// Grows the interval so that it contains `value`.
    ///
    /// An invalid interval collapses onto `[value, value]`.
    pub fn update(&mut self, value: f64) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// Grows the interval to the union (hull) of itself and `other`.
    ///
    /// Does nothing if `other` is invalid.
    pub fn enlarge(&mut self, other: &Interval) {
        if !other.is_valid() {
            return;
        }
        self.update(other.min);
        self.update(other.max);
    }

    /// Moves both bounds outwards by `margin`.
    ///
    /// Does nothing on an invalid interval. A negative margin behaves like
    /// [`Interval::shrink_by`] with the opposite sign.
    pub fn enlarge_by(&mut self, margin: f64) {
        if !self.is_valid() {
            return;
        }
        self.min -= margin;
        self.max += margin;
        self.normalize();
    }

    /// Narrows the interval to its intersection with `other`.
    ///
    /// Does nothing if `other` is invalid. If the two do not overlap, `self` becomes invalid; this
    /// is not an error, callers check [`Interval::is_valid`] afterwards.
    pub fn shrink(&mut self, other: &Interval) {
        if !other.is_valid() {
            return;
        }
        self.min = self.min.max(other.min);
        self.max = self.max.min(other.max);
        self.normalize();
    }

    /// Moves both bounds inwards by `margin`.
    ///
    /// If the bounds cross, the interval becomes invalid.
    pub fn shrink_by(&mut self, margin: f64) {
        if !self.is_valid() {
            return;
        }
        self.min += margin;
        self.max -= margin;
        self.normalize();
    }

    /// Returns the intersection of the two intervals, or `None` if they do not overlap (or either
    /// is invalid).
    #[must_use]
    pub fn intersect(&self, other: &Interval) -> Option<Interval> {
        if !self.is_valid() || !other.is_valid() {
            return None;
        }
        let intersection = Interval::new(self.min.max(other.min), self.max.min(other.max));
        intersection.is_valid().then_some(intersection)
    }

    #[must_use]
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.intersect(other).is_some()
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        self.min <= value && value <= self.max
    }

    /// Linear interpolation between the bounds: `0` yields `min`, `1` yields `max`.
    ///
    /// Returns `0` for an invalid interval.
    #[must_use]
    pub fn interpolate(&self, x: f64) -> f64 {
        if !self.is_valid() {
            return 0.;
        }
        self.min + x * (self.max - self.min)
    }

    /// Distance from `value` to the closest point of the interval; `0` if `value` is inside.
    ///
    /// Returns `+∞` for an invalid interval.
    #[must_use]
    pub fn distance_to(&self, value: f64) -> f64 {
        if !self.is_valid() {
            f64::INFINITY
        } else if value < self.min {
            self.min - value
        } else if value > self.max {
            value - self.max
        } else {
            0.
        }
    }

    /// Size of the gap between the two intervals; `0` if they overlap.
    ///
    /// Returns `+∞` if either interval is invalid.
    #[must_use]
    pub fn distance_to_interval(&self, other: &Interval) -> f64 {
        if !self.is_valid() || !other.is_valid() {
            f64::INFINITY
        } else if other.max < self.min {
            self.min - other.max
        } else if other.min > self.max {
            other.min - self.max
        } else {
            0.
        }
    }

    /// Midpoint of the interval. Meaningless (non-finite) on an invalid interval.
    #[must_use]
    pub fn mean(&self) -> f64 {
        (self.min + self.max) / 2.
    }

    /// Width of the interval. Meaningless (`-∞`) on an invalid interval.
    #[must_use]
    pub fn size(&self) -> f64 {
        self.max - self.min
    }

    fn normalize(&mut self) {
        if !self.is_valid() {
            *self = Self::invalid();
        }
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "[{}, {}]", self.min, self.max)
        } else {
            write!(f, "[invalid]")
        }
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Interval {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        match (self.is_valid(), other.is_valid()) {
            (true, true) => {
                self.min.abs_diff_eq(&other.min, epsilon)
                    && self.max.abs_diff_eq(&other.max, epsilon)
            }
            (false, false) => true,
            _ => false,
        }
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for Interval {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        match (self.is_valid(), other.is_valid()) {
            (true, true) => {
                self.min.relative_eq(&other.min, epsilon, max_relative)
                    && self.max.relative_eq(&other.max, epsilon, max_relative)
            }
            (false, false) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Interval;
    use approx::assert_relative_eq;
    use quickcheck::{quickcheck, TestResult};
    use rstest::rstest;

    #[test]
    fn default_is_invalid_until_updated() {
        let mut interval = Interval::default();
        assert!(!interval.is_valid());

        interval.update(7.5);
        assert!(interval.is_valid());
        assert_eq!(interval.min(), 7.5);
        assert_eq!(interval.max(), 7.5);
    }

    #[test]
    fn crossed_bounds_are_invalid() {
        assert!(!Interval::new(3., 1.).is_valid());
        assert_eq!(Interval::new(3., 1.), Interval::invalid());
        assert!(!Interval::new(f64::NAN, 1.).is_valid());
    }

    #[rstest]
    #[case(30., 10.)]
    #[case(0., 10.)]
    #[case(15., 0.)]
    #[case(10., 0.)]
    #[case(20., 0.)]
    fn distance_to_value(#[case] value: f64, #[case] expected: f64) {
        assert_eq!(Interval::new(10., 20.).distance_to(value), expected);
    }

    #[rstest]
    #[case(Interval::new(25., 30.), 5.)]
    #[case(Interval::new(0., 4.), 6.)]
    #[case(Interval::new(15., 30.), 0.)]
    #[case(Interval::new(0., 100.), 0.)]
    #[case(Interval::invalid(), f64::INFINITY)]
    fn distance_to_interval(#[case] other: Interval, #[case] expected: f64) {
        assert_eq!(Interval::new(10., 20.).distance_to_interval(&other), expected);
    }

    #[test]
    fn interpolation_hits_the_bounds() {
        let interval = Interval::new(-2., 6.);
        assert_eq!(interval.interpolate(0.), -2.);
        assert_eq!(interval.interpolate(1.), 6.);
        assert_eq!(interval.interpolate(0.25), 0.);
        assert_eq!(Interval::invalid().interpolate(0.5), 0.);
    }

    #[test]
    fn enlarge_ignores_invalid_input() {
        let mut interval = Interval::new(1., 2.);
        interval.enlarge(&Interval::invalid());
        assert_eq!(interval, Interval::new(1., 2.));

        interval.enlarge(&Interval::new(-3., 1.5));
        assert_eq!(interval, Interval::new(-3., 2.));

        let mut empty = Interval::invalid();
        empty.enlarge(&Interval::new(4., 5.));
        assert_eq!(empty, Interval::new(4., 5.));
    }

    #[test]
    fn shrink_can_invalidate() {
        let mut interval = Interval::new(0., 10.);
        interval.shrink(&Interval::new(5., 20.));
        assert_eq!(interval, Interval::new(5., 10.));

        interval.shrink(&Interval::new(11., 12.));
        assert!(!interval.is_valid());

        let mut narrow = Interval::new(0., 1.);
        narrow.shrink_by(0.75);
        assert!(!narrow.is_valid());

        let mut wide = Interval::new(0., 10.);
        wide.shrink_by(2.);
        assert_eq!(wide, Interval::new(2., 8.));
        wide.enlarge_by(1.);
        assert_eq!(wide, Interval::new(1., 9.));
    }

    #[test]
    fn mean_and_size() {
        let interval = Interval::new(10., 20.);
        assert_relative_eq!(interval.mean(), 15.);
        assert_relative_eq!(interval.size(), 10.);
        assert_eq!(Interval::from_value(3.).size(), 0.);
    }

    #[test]
    fn touching_intervals_intersect_in_a_point() {
        let a = Interval::new(0., 1.);
        let b = Interval::new(1., 2.);
        assert_eq!(a.intersect(&b), Some(Interval::from_value(1.)));
        assert_eq!(a.intersect(&Interval::new(1.5, 2.)), None);
    }

    fn finite(v: f64) -> bool {
        v.is_finite() && v.abs() < 1e100
    }

    quickcheck! {
        fn intersection_is_none_iff_disjoint(a0: f64, a1: f64, b0: f64, b1: f64) -> TestResult {
            if ![a0, a1, b0, b1].into_iter().all(finite) {
                return TestResult::discard();
            }
            let a = Interval::new(a0.min(a1), a0.max(a1));
            let b = Interval::new(b0.min(b1), b0.max(b1));
            let disjoint = a.max() < b.min() || b.max() < a.min();

            match a.intersect(&b) {
                None => TestResult::from_bool(disjoint),
                Some(i) => TestResult::from_bool(
                    !disjoint && i.size() <= a.size().min(b.size()),
                ),
            }
        }

        fn update_always_contains_value(values: Vec<f64>) -> TestResult {
            if values.is_empty() || !values.iter().copied().all(finite) {
                return TestResult::discard();
            }
            let mut interval = Interval::default();
            for v in &values {
                interval.update(*v);
            }
            TestResult::from_bool(
                interval.is_valid() && values.iter().all(|v| interval.contains(*v)),
            )
        }
    }
}
