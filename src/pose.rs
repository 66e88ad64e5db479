//! Camera poses at waypoints.
//!
//! Local flight geometry is Cartesian, in meters, with `z` pointing up. Yaw is measured clockwise
//! from `+y` towards `+x` and pitch is the elevation of the viewing direction above the
//! horizontal plane.

use crate::error::{Error, Result};
use crate::Vector3;
use uom::si::angle::radian;
use uom::si::f64::Angle;
use uom::ConstZero;

#[cfg(any(test, feature = "approx"))]
use approx::{AbsDiffEq, RelativeEq};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Where a camera is and where it looks.
///
/// A pose is immutable once built. There are three ways to build one, and they derive the
/// target-related fields differently:
///
/// | constructor                          | `direction`                  | `target`                          | `distance_to_target` |
/// |--------------------------------------|------------------------------|-----------------------------------|----------------------|
/// | [`Pose::from_direction`]             | normalised input             | `(+∞, +∞, +∞)`                    | `+∞`                 |
/// | [`Pose::from_direction_and_distance`]| normalised input             | `(position + direction) * distance` | input              |
/// | [`Pose::from_target`]                | `normalize(target - position)` | input                           | `‖target - position‖` |
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    position: Vector3,
    direction: Vector3,
    target: Vector3,
    distance_to_target: f64,
    roll: Angle,
    pitch: Angle,
    yaw: Angle,
}

impl Pose {
    /// A pose looking along `direction` without a known target.
    pub fn from_direction(position: Vector3, direction: Vector3) -> Result<Self> {
        check_finite("position", &position)?;
        let direction = normalized_direction(&direction)?;
        Ok(Self::assemble(
            position,
            direction,
            Vector3::repeat(f64::INFINITY),
            f64::INFINITY,
            Angle::ZERO,
        ))
    }

    /// A pose looking along `direction` at something `distance_to_target` away.
    ///
    /// The stored target is `(position + direction) * distance_to_target`, with `direction`
    /// normalised. Note that this is _not_ the point `distance_to_target` along the ray; flight
    /// plans built on this value depend on it as is.
    pub fn from_direction_and_distance(
        position: Vector3,
        direction: Vector3,
        distance_to_target: f64,
        roll: impl Into<Angle>,
    ) -> Result<Self> {
        check_finite("position", &position)?;
        let direction = normalized_direction(&direction)?;
        if !distance_to_target.is_finite() || distance_to_target < 0. {
            return Err(Error::invalid_argument(format!(
                "distance to target must be finite and non-negative, got {distance_to_target}"
            )));
        }
        let roll = checked_roll(roll.into())?;
        let target = (position + direction) * distance_to_target;
        Ok(Self::assemble(
            position,
            direction,
            target,
            distance_to_target,
            roll,
        ))
    }

    /// A pose at `position` looking at `target`.
    pub fn from_target(position: Vector3, target: Vector3, roll: impl Into<Angle>) -> Result<Self> {
        check_finite("position", &position)?;
        check_finite("target", &target)?;
        let roll = checked_roll(roll.into())?;
        let offset = target - position;
        let distance_to_target = offset.norm();
        let direction = offset.try_normalize(f64::EPSILON).ok_or_else(|| {
            Error::invalid_argument(format!("target {target:?} coincides with the position"))
        })?;
        Ok(Self::assemble(
            position,
            direction,
            target,
            distance_to_target,
            roll,
        ))
    }

    fn assemble(
        position: Vector3,
        direction: Vector3,
        target: Vector3,
        distance_to_target: f64,
        roll: Angle,
    ) -> Self {
        let yaw = direction.x.atan2(direction.y);
        let pitch = direction.z.atan2(direction.x.hypot(direction.y));
        Self {
            position,
            direction,
            target,
            distance_to_target,
            roll,
            pitch: Angle::new::<radian>(pitch),
            yaw: Angle::new::<radian>(yaw),
        }
    }

    #[must_use]
    pub fn position(&self) -> &Vector3 {
        &self.position
    }

    /// Unit length.
    #[must_use]
    pub fn direction(&self) -> &Vector3 {
        &self.direction
    }

    /// `(+∞, +∞, +∞)` when the pose was built from a direction alone.
    #[must_use]
    pub fn target(&self) -> &Vector3 {
        &self.target
    }

    #[must_use]
    pub fn has_target(&self) -> bool {
        self.target.iter().all(|c| c.is_finite())
    }

    #[must_use]
    pub fn distance_to_target(&self) -> f64 {
        self.distance_to_target
    }

    #[must_use]
    pub fn roll(&self) -> Angle {
        self.roll
    }

    #[must_use]
    pub fn pitch(&self) -> Angle {
        self.pitch
    }

    #[must_use]
    pub fn yaw(&self) -> Angle {
        self.yaw
    }
}

fn check_finite(what: &str, v: &Vector3) -> Result<()> {
    if v.iter().all(|c| c.is_finite()) {
        Ok(())
    } else {
        Err(Error::invalid_argument(format!(
            "{what} must be finite, got {v:?}"
        )))
    }
}

fn normalized_direction(direction: &Vector3) -> Result<Vector3> {
    check_finite("direction", direction)?;
    direction.try_normalize(f64::EPSILON).ok_or_else(|| {
        Error::invalid_argument(format!("direction {direction:?} has zero length"))
    })
}

fn checked_roll(roll: Angle) -> Result<Angle> {
    if roll.is_finite() {
        Ok(roll)
    } else {
        Err(Error::invalid_argument(format!(
            "roll must be finite, got {roll:?}"
        )))
    }
}

// the target of a direction-only pose is infinite, and inf - inf is not "close"
#[cfg(any(test, feature = "approx"))]
fn vectors_abs_diff_eq(a: &Vector3, b: &Vector3, epsilon: f64) -> bool {
    a.iter()
        .zip(b.iter())
        .all(|(x, y)| x == y || x.abs_diff_eq(y, epsilon))
}

#[cfg(any(test, feature = "approx"))]
impl AbsDiffEq<Self> for Pose {
    type Epsilon = f64;

    fn default_epsilon() -> Self::Epsilon {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        vectors_abs_diff_eq(&self.position, &other.position, epsilon)
            && vectors_abs_diff_eq(&self.direction, &other.direction, epsilon)
            && vectors_abs_diff_eq(&self.target, &other.target, epsilon)
            && (self.distance_to_target == other.distance_to_target
                || self
                    .distance_to_target
                    .abs_diff_eq(&other.distance_to_target, epsilon))
            && self
                .roll
                .get::<radian>()
                .abs_diff_eq(&other.roll.get::<radian>(), epsilon)
    }
}

#[cfg(any(test, feature = "approx"))]
impl RelativeEq for Pose {
    fn default_max_relative() -> Self::Epsilon {
        f64::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        // f64::relative_eq already treats equal infinities as equal
        self.position
            .relative_eq(&other.position, epsilon, max_relative)
            && self
                .direction
                .relative_eq(&other.direction, epsilon, max_relative)
            && self.target.relative_eq(&other.target, epsilon, max_relative)
            && self.distance_to_target.relative_eq(
                &other.distance_to_target,
                epsilon,
                max_relative,
            )
            && self.roll.get::<radian>().relative_eq(
                &other.roll.get::<radian>(),
                epsilon,
                max_relative,
            )
    }
}
