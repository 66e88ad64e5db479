use crate::error::{Error, Result};
use crate::kinematics::SnapPointId;
use crate::math::FrameTransform;
use crate::util::BoundedAngle;
use crate::{UnitQuaternion, Vector3};
use nalgebra::Unit;
use std::fmt;
use std::fmt::{Display, Formatter};
use uom::si::angle::{degree, radian};
use uom::si::f64::Angle;
use uom::ConstZero;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// slack for angles that land on an arc bound after a float round trip
const ARC_TOLERANCE_RAD: f64 = 1e-9;

/// The range a joint angle may take, as a counter-clockwise arc from `start` spanning `span`.
///
/// Arcs live on the circle, so an arc from 170° to -170° is 20° wide and contains 180°.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ConstraintArc {
    start: Angle,
    span: Angle,
}

impl ConstraintArc {
    /// The arc running counter-clockwise from `start` to `end`.
    ///
    /// If `end - start` is a full turn or more, the arc covers the whole circle.
    #[must_use]
    pub fn new(start: impl Into<Angle>, end: impl Into<Angle>) -> Self {
        let (start, end) = (start.into(), end.into());
        let span = if (end - start).abs() >= Angle::FULL_TURN {
            Angle::FULL_TURN
        } else {
            Angle::new::<radian>(BoundedAngle::new(end).counter_clockwise_from(start.into()))
        };
        Self { start, span }
    }

    #[must_use]
    pub fn from_degrees(start: f64, end: f64) -> Self {
        Self::new(Angle::new::<degree>(start), Angle::new::<degree>(end))
    }

    /// An arc that admits a single angle.
    #[must_use]
    pub fn fixed(angle: impl Into<Angle>) -> Self {
        Self {
            start: angle.into(),
            span: Angle::ZERO,
        }
    }

    #[must_use]
    pub fn start(&self) -> Angle {
        self.start
    }

    #[must_use]
    pub fn end(&self) -> Angle {
        self.start + self.span
    }

    #[must_use]
    pub fn span(&self) -> Angle {
        self.span
    }

    #[must_use]
    pub fn contains(&self, angle: impl Into<Angle>) -> bool {
        let from_start = BoundedAngle::new(angle).counter_clockwise_from(self.start.into());
        from_start <= self.span.get::<radian>() + ARC_TOLERANCE_RAD
            // just below the start, wrapped round to almost a full turn
            || Angle::FULL_TURN.get::<radian>() - from_start <= ARC_TOLERANCE_RAD
    }

    /// Returns `angle` if the arc contains it, otherwise whichever end of the arc is closer.
    #[must_use]
    pub fn limit(&self, angle: impl Into<Angle>) -> Angle {
        let angle = angle.into();
        if self.contains(angle) {
            return angle;
        }
        let to_start = BoundedAngle::new(angle).undirected_distance(self.start.into());
        let to_end = BoundedAngle::new(angle).undirected_distance(self.end().into());
        if to_start <= to_end {
            self.start
        } else {
            self.end()
        }
    }
}

impl Display for ConstraintArc {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}°, {}°]",
            self.start.get::<degree>(),
            self.end().get::<degree>()
        )
    }
}

/// One link of a kinematic chain.
///
/// A segment's frame is its parent's frame shifted by `offset` and then rotated about
/// `rotation_axis` by the segment's angle. Controllable segments (those with an angle index)
/// take that angle from the gimbal state; all others sit at the start of their constraint arc.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicSegment {
    snap_point_id: SnapPointId,
    offset: Vector3,
    rotation_axis: Unit<Vector3>,
    angle_index: Option<usize>,
    constraint_arc: ConstraintArc,
}

impl KinematicSegment {
    pub fn new(
        snap_point_id: SnapPointId,
        offset: Vector3,
        rotation_axis: Vector3,
        angle_index: Option<usize>,
        constraint_arc: ConstraintArc,
    ) -> Result<Self> {
        if !offset.iter().all(|c| c.is_finite()) {
            return Err(Error::invalid_argument(format!(
                "offset of snap point {snap_point_id} must be finite, got {offset:?}"
            )));
        }
        let rotation_axis = Unit::try_new(rotation_axis, f64::EPSILON)
            .filter(|axis| axis.iter().all(|c| c.is_finite()))
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "rotation axis of snap point {snap_point_id} must be finite and non-zero"
                ))
            })?;
        Ok(Self {
            snap_point_id,
            offset,
            rotation_axis,
            angle_index,
            constraint_arc,
        })
    }

    /// A rigid, non-rotating segment.
    pub fn fixed(snap_point_id: SnapPointId, offset: Vector3) -> Result<Self> {
        Self::new(
            snap_point_id,
            offset,
            Vector3::x(),
            None,
            ConstraintArc::fixed(Angle::ZERO),
        )
    }

    pub(crate) fn root() -> Self {
        Self {
            snap_point_id: SnapPointId::BODY_ORIGIN,
            offset: Vector3::zeros(),
            rotation_axis: Vector3::x_axis(),
            angle_index: None,
            constraint_arc: ConstraintArc::fixed(Angle::ZERO),
        }
    }

    #[must_use]
    pub fn snap_point_id(&self) -> &SnapPointId {
        &self.snap_point_id
    }

    #[must_use]
    pub fn offset(&self) -> &Vector3 {
        &self.offset
    }

    #[must_use]
    pub fn rotation_axis(&self) -> &Unit<Vector3> {
        &self.rotation_axis
    }

    /// Position of this segment's angle in a gimbal state vector, if it is controllable.
    #[must_use]
    pub fn angle_index(&self) -> Option<usize> {
        self.angle_index
    }

    #[must_use]
    pub fn is_controllable(&self) -> bool {
        self.angle_index.is_some()
    }

    #[must_use]
    pub fn constraint_arc(&self) -> &ConstraintArc {
        &self.constraint_arc
    }

    /// The angle a non-controllable segment always has.
    #[must_use]
    pub fn fixed_angle(&self) -> Angle {
        self.constraint_arc.start()
    }

    /// Transform from this segment's frame into its parent's frame, at the given joint angle.
    #[must_use]
    pub fn local_transform(&self, angle: Angle) -> FrameTransform {
        FrameTransform::from_parts(
            self.offset,
            UnitQuaternion::from_axis_angle(&self.rotation_axis, angle.get::<radian>()),
        )
    }
}
