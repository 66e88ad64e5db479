use uom::si::angle::radian;
use uom::si::f64::Angle;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

/// An angle that is always interpreted modulo a full turn.
///
/// Joint constraint arcs and geodetic display both need to reason about angles "on the circle"
/// rather than on the real line, which is what this type is for.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BoundedAngle {
    angle: Angle,
}

impl BoundedAngle {
    pub(crate) fn new(angle: impl Into<Angle>) -> Self {
        Self {
            // uom may store the value in whatever normalisation it likes, so we also bound again
            // on the way out.
            angle: Angle::new::<radian>(Self::into_bounds(angle.into())),
        }
    }

    /// Returns the angle in [0°, 360°) in radians.
    pub(crate) fn get_bounded(self) -> f64 {
        Self::into_bounds(self.angle)
    }

    /// Returns the angle in [-180°, 180°) in radians.
    pub(crate) fn to_signed_range(self) -> f64 {
        let angle = self.get_bounded();
        if angle < Angle::HALF_TURN.get::<radian>() {
            angle
        } else {
            angle - Angle::FULL_TURN.get::<radian>()
        }
    }

    /// The smallest rotation (in radians, always in [0, π]) that takes `self` onto `other`,
    /// regardless of direction.
    pub(crate) fn undirected_distance(self, other: BoundedAngle) -> f64 {
        BoundedAngle::new(self.angle - other.angle)
            .to_signed_range()
            .abs()
    }

    /// Counter-clockwise distance (in radians, in [0, 2π)) from `start` to `self`.
    pub(crate) fn counter_clockwise_from(self, start: BoundedAngle) -> f64 {
        BoundedAngle::new(self.angle - start.angle).get_bounded()
    }

    fn into_bounds(angle: Angle) -> f64 {
        let out_of_bounds: f64 = angle.get::<radian>();
        out_of_bounds.rem_euclid(Angle::FULL_TURN.get::<radian>())
    }
}

impl<U: Into<Angle>> From<U> for BoundedAngle {
    fn from(value: U) -> Self {
        BoundedAngle::new(value)
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for BoundedAngle {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        0.000_000_001
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.undirected_distance(*other) <= epsilon
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for BoundedAngle {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        let min = f64::min(self.get_bounded(), other.get_bounded());
        let max = f64::max(self.get_bounded(), other.get_bounded());

        // 359.999° and 0° are neighbours
        f64::relative_eq(&min, &max, epsilon, max_relative)
            || f64::relative_eq(
                &(min + Angle::FULL_TURN.get::<radian>()),
                &max,
                epsilon,
                max_relative,
            )
    }
}

#[cfg(test)]
mod tests {
    use super::BoundedAngle;
    use approx::{assert_abs_diff_eq, assert_abs_diff_ne, assert_relative_eq};
    use rstest::rstest;
    use uom::si::angle::{degree, radian};
    use uom::si::f64::Angle;

    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }

    #[test]
    fn negative_angles_wrap_into_positive_range() {
        let sut = BoundedAngle::new(d(-390.));
        assert_relative_eq!(sut.get_bounded(), 330.0_f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn half_turn_stays_put() {
        let sut = BoundedAngle::new(Angle::HALF_TURN);
        assert_eq!(sut.get_bounded(), Angle::HALF_TURN.get::<radian>());
    }

    #[rstest]
    #[case(d(0.), 0.)]
    #[case(d(180.), -180.)]
    #[case(d(359.), -1.)]
    #[case(d(270.), -90.)]
    #[case(d(-90.), -90.)]
    #[case(d(360. + 120.), 120.)]
    fn signed_range(#[case] input: Angle, #[case] expected_degrees: f64) {
        assert_relative_eq!(
            BoundedAngle::new(input).to_signed_range(),
            expected_degrees.to_radians(),
            epsilon = f64::EPSILON * 1000.
        );
    }

    #[rstest]
    #[case(10., 350., 20.)]
    #[case(350., 10., 20.)]
    #[case(0., 180., 180.)]
    #[case(-90., 90., 180.)]
    #[case(45., 45. + 720., 0.)]
    fn undirected_distance_takes_the_short_way_round(
        #[case] a: f64,
        #[case] b: f64,
        #[case] expected_degrees: f64,
    ) {
        let distance = BoundedAngle::new(d(a)).undirected_distance(BoundedAngle::new(d(b)));
        assert_relative_eq!(distance, expected_degrees.to_radians(), epsilon = 1e-9);
    }

    #[rstest]
    #[case(10., 350., 20.)]
    #[case(350., 10., 340.)]
    #[case(-30., -90., 60.)]
    fn counter_clockwise_distance(#[case] angle: f64, #[case] start: f64, #[case] expected: f64) {
        let distance =
            BoundedAngle::new(d(angle)).counter_clockwise_from(BoundedAngle::new(d(start)));
        assert_relative_eq!(distance, expected.to_radians(), epsilon = 1e-9);
    }

    #[test]
    fn full_turns_compare_equal() {
        let a = BoundedAngle::new(d(360. - 1e-10));
        let b = BoundedAngle::new(d(0.));
        assert_abs_diff_eq!(&a, &b, epsilon = 1e-9);
        assert_relative_eq!(&a, &b, epsilon = 1e-9);
        assert_abs_diff_ne!(&BoundedAngle::new(d(10.)), &b, epsilon = 1e-9);
    }
}
