//! Rigid body transforms between the frames of a kinematic chain.
//!
//! The main type provided by this module is [`FrameTransform`], which describes the isometry (ie,
//! rotation and translation) between two frames. Frames in a kinematic chain are only known at
//! runtime (they are named by snap point ids that come from hardware descriptions), so unlike a
//! compile-time frame tag the source and target frames of a [`FrameTransform`] are implied by the
//! operation that produced it.
//!
//! [`Orientation`] describes the attitude of a body in the north/east/down earth frame using
//! intrinsic Tait-Bryan angles.

use crate::error::{Error, Result};
use crate::{Isometry3, Point3, UnitQuaternion, Vector3};
use nalgebra::{Translation3, Unit};
use std::fmt;
use std::fmt::{Display, Formatter};
use uom::si::angle::radian;
use uom::si::f64::Angle;
use uom::ConstZero;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A rigid transform that changes the coordinate system of a fixed point.
///
/// A `FrameTransform` from frame `A` to frame `B` takes the coordinates of a point expressed in
/// `A` and returns the coordinates of the same point expressed in `B`. Transforms compose with
/// [`FrameTransform::and_then`]:
///
/// ```rust
/// use flightplan_kinematics::math::FrameTransform;
/// use nalgebra::{Point3, Vector3};
/// use uom::si::{angle::degree, f64::Angle};
///
/// // the origin of a frame shifted half a meter along x, seen from its parent
/// let child_to_parent = FrameTransform::from_parts(
///     Vector3::new(0.5, 0., 0.),
///     nalgebra::UnitQuaternion::identity(),
/// );
/// let parent_to_grandparent =
///     FrameTransform::from_rotation_about_axis(&Vector3::z(), Angle::new::<degree>(90.)).unwrap();
///
/// let child_to_grandparent = child_to_parent.and_then(&parent_to_grandparent);
/// let p = child_to_grandparent.transform_point(&Point3::origin());
/// assert!((p - Point3::new(0., 0.5, 0.)).norm() < 1e-12);
/// ```
///
/// Note that moving a _point_ (rather than re-expressing it) along the same relation needs the
/// [inverse](FrameTransform::inverse).
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameTransform {
    inner: Isometry3,
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl FrameTransform {
    #[must_use]
    pub fn identity() -> Self {
        Self {
            inner: Isometry3::identity(),
        }
    }

    /// Constructs the transform that first rotates by `rotation` and then translates by
    /// `translation`.
    ///
    /// Equivalently: the source frame's origin sits at `translation` in the target frame, and its
    /// axes are the target's axes rotated by `rotation`.
    #[must_use]
    pub fn from_parts(translation: Vector3, rotation: UnitQuaternion) -> Self {
        Self {
            inner: Isometry3::from_parts(Translation3::from(translation), rotation),
        }
    }

    /// A pure rotation by `angle` about `axis` (right-hand rule).
    ///
    /// Fails if `axis` cannot be normalised.
    pub fn from_rotation_about_axis(axis: &Vector3, angle: impl Into<Angle>) -> Result<Self> {
        let axis = Unit::try_new(*axis, f64::EPSILON).ok_or_else(|| {
            Error::invalid_argument(format!("rotation axis {axis:?} has no direction"))
        })?;
        Ok(Self {
            inner: Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_axis_angle(&axis, angle.into().get::<radian>()),
            ),
        })
    }

    /// The transform from the north/east/down earth frame into the body frame of something with
    /// the given [`Orientation`].
    #[must_use]
    pub fn from_orientation(orientation: &Orientation) -> Self {
        Self {
            inner: Isometry3::from_parts(
                Translation3::identity(),
                orientation.body_to_earth().inverse(),
            ),
        }
    }

    #[must_use]
    pub fn to_isometry(&self) -> Isometry3 {
        self.inner
    }

    /// Chains `self` (`A` to `B`) with `next` (`B` to `C`), yielding `A` to `C`.
    #[must_use]
    pub fn and_then(&self, next: &FrameTransform) -> FrameTransform {
        Self {
            inner: next.inner * self.inner,
        }
    }

    /// Turns `A` to `B` into `B` to `A`.
    #[must_use]
    pub fn inverse(&self) -> FrameTransform {
        Self {
            inner: self.inner.inverse(),
        }
    }

    #[must_use]
    pub fn transform_point(&self, point: &Point3) -> Point3 {
        self.inner.transform_point(point)
    }

    /// Re-expresses a direction; translation does not apply.
    #[must_use]
    pub fn transform_vector(&self, vector: &Vector3) -> Vector3 {
        self.inner.transform_vector(vector)
    }

    /// Where the source frame's origin lies in the target frame.
    #[must_use]
    pub fn translation(&self) -> Vector3 {
        self.inner.translation.vector
    }

    #[must_use]
    pub fn rotation(&self) -> UnitQuaternion {
        self.inner.rotation
    }

    /// The rotational part, read as the orientation of the source frame's axes within the target
    /// frame.
    #[must_use]
    pub fn to_tait_bryan_angles(&self) -> Orientation {
        Orientation::from_body_to_earth(self.inner.rotation)
    }
}

impl Display for FrameTransform {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Translation: {}, Rotation: {}",
            self.inner.translation.vector, self.inner.rotation
        )
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for FrameTransform {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        Isometry3::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.inner.abs_diff_eq(&other.inner, epsilon)
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for FrameTransform {
    fn default_max_relative() -> Self::Epsilon {
        Isometry3::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.inner.relative_eq(&other.inner, epsilon, max_relative)
    }
}

/// The attitude of a body in the north/east/down earth frame.
///
/// The angles are intrinsic Tait-Bryan angles applied in the order yaw (about down), pitch (about
/// the new east), roll (about the new north). With all three zero the body's `x` axis points
/// north, `y` east and `z` down.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Orientation {
    yaw: Angle,
    pitch: Angle,
    roll: Angle,
}

impl Default for Orientation {
    fn default() -> Self {
        Self {
            yaw: Angle::ZERO,
            pitch: Angle::ZERO,
            roll: Angle::ZERO,
        }
    }
}

impl Orientation {
    #[doc(alias = "from_ypr")]
    #[must_use]
    pub fn from_tait_bryan_angles(
        yaw: impl Into<Angle>,
        pitch: impl Into<Angle>,
        roll: impl Into<Angle>,
    ) -> Self {
        Self {
            yaw: yaw.into(),
            pitch: pitch.into(),
            roll: roll.into(),
        }
    }

    fn from_body_to_earth(rotation: UnitQuaternion) -> Self {
        let (roll, pitch, yaw) = rotation.euler_angles();
        Self {
            yaw: Angle::new::<radian>(yaw),
            pitch: Angle::new::<radian>(pitch),
            roll: Angle::new::<radian>(roll),
        }
    }

    #[must_use]
    pub fn yaw(&self) -> Angle {
        self.yaw
    }

    #[must_use]
    pub fn pitch(&self) -> Angle {
        self.pitch
    }

    #[must_use]
    pub fn roll(&self) -> Angle {
        self.roll
    }

    /// Rotates body-frame vectors into the earth frame.
    #[must_use]
    pub fn body_to_earth(&self) -> UnitQuaternion {
        // nalgebra composes these as Rz(yaw) * Ry(pitch) * Rx(roll), i.e. intrinsic z-y'-x''.
        UnitQuaternion::from_euler_angles(
            self.roll.get::<radian>(),
            self.pitch.get::<radian>(),
            self.yaw.get::<radian>(),
        )
    }
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Orientation {
    type Epsilon = <f64 as AbsDiffEq>::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        UnitQuaternion::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        // q and -q are the same attitude
        let (a, b) = (self.body_to_earth(), other.body_to_earth());
        a.abs_diff_eq(&b, epsilon) || a.coords.abs_diff_eq(&(-b.coords), epsilon)
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for Orientation {
    fn default_max_relative() -> Self::Epsilon {
        UnitQuaternion::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        let (a, b) = (self.body_to_earth(), other.body_to_earth());
        a.relative_eq(&b, epsilon, max_relative)
            || a.coords.relative_eq(&(-b.coords), epsilon, max_relative)
    }
}

#[cfg(test)]
mod tests {
    use super::{FrameTransform, Orientation};
    use crate::{Point3, UnitQuaternion, Vector3};
    use approx::assert_relative_eq;
    use quickcheck::{quickcheck, Arbitrary};
    use rstest::rstest;
    use uom::si::angle::degree;
    use uom::si::f64::Angle;

    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }

    impl Arbitrary for FrameTransform {
        fn arbitrary(g: &mut quickcheck::Gen) -> Self {
            let mut bounded = |limit: f64| loop {
                let f = f64::arbitrary(g);
                if f.is_finite() {
                    break f % limit;
                }
            };
            let translation = Vector3::new(bounded(100.), bounded(100.), bounded(100.));
            let rotation =
                UnitQuaternion::from_euler_angles(bounded(3.), bounded(1.5), bounded(3.));
            FrameTransform::from_parts(translation, rotation)
        }
    }

    quickcheck! {
        fn inverse_cancels(t: FrameTransform) -> bool {
            let roundtrip = t.and_then(&t.inverse());
            approx::relative_eq!(roundtrip, FrameTransform::identity(), epsilon = 1e-9)
        }

        fn chaining_matches_sequential_application(a: FrameTransform, b: FrameTransform) -> bool {
            let p = Point3::new(1., -2., 3.);
            let chained = a.and_then(&b).transform_point(&p);
            let sequential = b.transform_point(&a.transform_point(&p));
            approx::relative_eq!(chained, sequential, epsilon = 1e-9)
        }
    }

    #[test]
    fn rotation_about_zero_axis_is_rejected() {
        assert!(FrameTransform::from_rotation_about_axis(&Vector3::zeros(), d(10.)).is_err());
    }

    #[rstest]
    // yawed east: north in the earth frame is to the body's left
    #[case(Orientation::from_tait_bryan_angles(d(90.), d(0.), d(0.)), Vector3::x(), Vector3::new(0., -1., 0.))]
    // pitched down 90°: "down" is the body's forward axis
    #[case(Orientation::from_tait_bryan_angles(d(0.), d(-90.), d(0.)), Vector3::z(), Vector3::new(1., 0., 0.))]
    #[case(Orientation::from_tait_bryan_angles(d(0.), d(90.), d(0.)), Vector3::z(), Vector3::new(-1., 0., 0.))]
    // rolled right: down is to the body's right
    #[case(Orientation::from_tait_bryan_angles(d(0.), d(0.), d(90.)), Vector3::z(), Vector3::new(0., 1., 0.))]
    fn earth_to_body(
        #[case] orientation: Orientation,
        #[case] earth: Vector3,
        #[case] expected_body: Vector3,
    ) {
        let t = FrameTransform::from_orientation(&orientation);
        assert_relative_eq!(t.transform_vector(&earth), expected_body, epsilon = 1e-12);
    }

    #[test]
    fn tait_bryan_roundtrip() {
        let orientation = Orientation::from_tait_bryan_angles(d(30.), d(-20.), d(10.));
        let recovered = FrameTransform::from_orientation(&orientation)
            .inverse()
            .to_tait_bryan_angles();
        assert_relative_eq!(recovered, orientation, epsilon = 1e-12);
        assert_relative_eq!(recovered.yaw().get::<degree>(), 30., epsilon = 1e-9);
        assert_relative_eq!(recovered.pitch().get::<degree>(), -20., epsilon = 1e-9);
        assert_relative_eq!(recovered.roll().get::<degree>(), 10., epsilon = 1e-9);
    }

    #[test]
    fn translation_is_where_the_source_origin_lands() {
        let t = FrameTransform::from_parts(
            Vector3::new(0.3164, 0., 0.0035),
            UnitQuaternion::from_axis_angle(&Vector3::y_axis(), std::f64::consts::FRAC_PI_2),
        );
        assert_eq!(t.translation(), Vector3::new(0.3164, 0., 0.0035));
        assert_relative_eq!(
            t.transform_point(&Point3::origin()),
            Point3::new(0.3164, 0., 0.0035)
        );
        // the source x axis is pitched onto the target's -z
        assert_relative_eq!(
            t.transform_vector(&Vector3::x()),
            Vector3::new(0., 0., -1.),
            epsilon = 1e-12
        );
    }
}
