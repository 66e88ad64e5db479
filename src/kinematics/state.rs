use crate::error::{Error, Result};
use crate::kinematics::{GimbalStateVector, KinematicChain, SnapPointId};
use crate::math::FrameTransform;
use std::sync::OnceLock;
use tracing::warn;
use uom::si::angle::degree;
use uom::si::f64::Angle;

/// A [`KinematicChain`] with every controllable joint set to a concrete angle.
///
/// Resolved segment-to-body transforms are cached, so asking for many paths through the same
/// state only composes each segment once.
#[derive(Debug)]
pub struct KinematicChainState<'a> {
    chain: &'a KinematicChain,
    angles: GimbalStateVector,
    to_body: Vec<OnceLock<FrameTransform>>,
}

impl<'a> KinematicChainState<'a> {
    pub(crate) fn new(chain: &'a KinematicChain, angles: GimbalStateVector) -> Result<Self> {
        if angles.len() != chain.gimbal_state_vector_len() {
            return Err(Error::invalid_argument(format!(
                "expected {} gimbal angles, got {}",
                chain.gimbal_state_vector_len(),
                angles.len()
            )));
        }

        let angles = chain
            .controllable_segments()
            .into_iter()
            .zip(angles.as_slice())
            .map(|(segment, &angle)| {
                let limited = segment.constraint_arc().limit(angle);
                if limited != angle {
                    warn!(
                        snap_point = %segment.snap_point_id(),
                        requested = angle.get::<degree>(),
                        limited = limited.get::<degree>(),
                        arc = %segment.constraint_arc(),
                        "gimbal angle outside of constraint arc"
                    );
                }
                limited
            })
            .collect();

        Ok(Self {
            chain,
            angles,
            to_body: (0..chain.nodes().len()).map(|_| OnceLock::new()).collect(),
        })
    }

    #[must_use]
    pub fn chain(&self) -> &'a KinematicChain {
        self.chain
    }

    /// The joint angles in effect, after limiting to the constraint arcs.
    #[must_use]
    pub fn angles(&self) -> &GimbalStateVector {
        &self.angles
    }

    /// The transform that takes coordinates in the frame of `source` to coordinates of the same
    /// point in the frame of `target`.
    pub fn get_transform_path(
        &self,
        source: &SnapPointId,
        target: &SnapPointId,
    ) -> Result<FrameTransform> {
        let unreachable = || Error::UnreachableSnapPoint {
            from: source.clone(),
            to: target.clone(),
        };
        let source_index = self.chain.index_of(source).ok_or_else(unreachable)?;
        let target_index = self.chain.index_of(target).ok_or_else(unreachable)?;
        if self.root_of(source_index) != self.root_of(target_index) {
            return Err(unreachable());
        }

        Ok(self
            .to_body(source_index)
            .and_then(&self.to_body(target_index).inverse()))
    }

    /// Transform from the body frame into the frame of `id`.
    pub fn transform_from_body(&self, id: &SnapPointId) -> Result<FrameTransform> {
        self.get_transform_path(&SnapPointId::BODY_ORIGIN, id)
    }

    fn angle_of(&self, index: usize) -> Angle {
        let segment = &self.chain.nodes()[index].segment;
        match segment.angle_index() {
            Some(i) => self.angles.as_slice()[i],
            None => segment.fixed_angle(),
        }
    }

    // segment frame -> root frame
    fn to_body(&self, index: usize) -> FrameTransform {
        *self.to_body[index].get_or_init(|| {
            let node = &self.chain.nodes()[index];
            let local = node.segment.local_transform(self.angle_of(index));
            match node.parent {
                Some(parent) => local.and_then(&self.to_body(parent)),
                None => local,
            }
        })
    }

    fn root_of(&self, mut index: usize) -> usize {
        while let Some(parent) = self.chain.nodes()[index].parent {
            index = parent;
        }
        index
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::kinematics::chain::tests::roll_pitch_gimbal;
    use crate::kinematics::{
        ConstraintArc, GimbalStateVector, KinematicChain, KinematicSegment, SnapPointId,
    };
    use crate::math::{FrameTransform, Orientation};
    use crate::{Point3, Vector3};
    use approx::assert_relative_eq;
    use uom::si::angle::degree;
    use uom::si::f64::Angle;

    fn id(name: &str) -> SnapPointId {
        SnapPointId::new(name)
    }

    fn d(degrees: f64) -> Angle {
        Angle::new::<degree>(degrees)
    }

    fn body_with(payload: Vec<(KinematicSegment, SnapPointId)>) -> KinematicChain {
        let mut builder = KinematicChain::builder()
            .add(
                KinematicSegment::fixed(SnapPointId::GNSS_ANTENNA, Vector3::new(0., 0., 0.3))
                    .unwrap(),
                &SnapPointId::BODY_ORIGIN,
            )
            .unwrap();
        for (segment, parent) in payload {
            builder = builder.add(segment, &parent).unwrap();
        }
        builder.build().unwrap()
    }

    fn fixed_rotation(name: &str, offset: Vector3, axis: Vector3, angle: f64) -> KinematicSegment {
        KinematicSegment::new(
            id(name),
            offset,
            axis,
            None,
            ConstraintArc::fixed(d(angle)),
        )
        .unwrap()
    }

    #[test]
    fn fixed_forward_payload() {
        let chain = body_with(vec![(
            fixed_rotation("P0", Vector3::new(0.5, 0., 0.), Vector3::z(), 0.),
            SnapPointId::BODY_ORIGIN,
        )]);
        let state = chain.create_state(GimbalStateVector::default()).unwrap();

        let to_antenna = state
            .get_transform_path(&id("P0"), &SnapPointId::GNSS_ANTENNA)
            .unwrap();
        // the payload origin as seen from the antenna
        assert_relative_eq!(
            to_antenna.transform_point(&Point3::origin()),
            Point3::new(0.5, 0., -0.3),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            to_antenna.transform_vector(&Vector3::x()),
            Vector3::x(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn fixed_downward_payload_looks_down() {
        let chain = body_with(vec![(
            fixed_rotation("P0", Vector3::new(0.5, 0., 0.), Vector3::y(), -90.),
            SnapPointId::BODY_ORIGIN,
        )]);
        let state = chain.create_state(GimbalStateVector::default()).unwrap();
        let to_body = state
            .get_transform_path(&id("P0"), &SnapPointId::BODY_ORIGIN)
            .unwrap();
        assert_relative_eq!(
            to_body.transform_vector(&Vector3::x()),
            Vector3::z(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn downward_payload_rolled_about_its_optical_axis() {
        let chain = body_with(vec![
            (
                fixed_rotation("P0i", Vector3::new(0.5, 0., 0.), Vector3::y(), -90.),
                SnapPointId::BODY_ORIGIN,
            ),
            (
                fixed_rotation("P0", Vector3::zeros(), Vector3::x(), 90.),
                id("P0i"),
            ),
        ]);
        let to_body = chain
            .create_state(GimbalStateVector::default())
            .unwrap()
            .get_transform_path(&id("P0"), &SnapPointId::BODY_ORIGIN)
            .unwrap();
        assert_relative_eq!(
            to_body.transform_vector(&Vector3::x()),
            Vector3::z(),
            epsilon = 1e-12
        );
        assert_relative_eq!(
            to_body.transform_vector(&Vector3::y()),
            Vector3::new(-1., 0., 0.),
            epsilon = 1e-12
        );
    }

    #[test]
    fn roll_pitch_gimbal_follows_the_state() {
        let chain = roll_pitch_gimbal();

        let level = chain
            .transform_from_body(&id("P0"), GimbalStateVector::zeros(2))
            .unwrap();
        assert_relative_eq!(
            level.transform_point(&Point3::new(0.5, 0., 0.)),
            Point3::origin(),
            epsilon = 1e-12
        );

        // pitched fully down, the payload sits straight below the pivot
        let down = chain
            .create_state(GimbalStateVector::from_degrees(&[0., -90.]))
            .unwrap()
            .get_transform_path(&id("P0"), &SnapPointId::BODY_ORIGIN)
            .unwrap();
        assert_relative_eq!(
            down.transform_point(&Point3::origin()),
            Point3::new(0., 0., 0.5),
            epsilon = 1e-12
        );
    }

    #[test]
    fn pitch_then_roll_gimbal() {
        let chain = KinematicChain::builder()
            .add(
                KinematicSegment::new(
                    id("Pitch"),
                    Vector3::zeros(),
                    Vector3::y(),
                    Some(0),
                    ConstraintArc::from_degrees(-90., 30.),
                )
                .unwrap(),
                &SnapPointId::BODY_ORIGIN,
            )
            .unwrap()
            .add(
                KinematicSegment::new(
                    id("Roll"),
                    Vector3::zeros(),
                    Vector3::x(),
                    Some(1),
                    ConstraintArc::from_degrees(-12., 10.),
                )
                .unwrap(),
                &id("Pitch"),
            )
            .unwrap()
            .add(
                KinematicSegment::fixed(id("P0"), Vector3::new(0.5, 0., 0.)).unwrap(),
                &id("Roll"),
            )
            .unwrap()
            .build()
            .unwrap();

        // rolling about the optical axis does not move a point on it
        let rolled = chain
            .transform_from_body(&id("P0"), GimbalStateVector::from_degrees(&[-90., 10.]))
            .unwrap()
            .inverse();
        assert_relative_eq!(
            rolled.transform_point(&Point3::origin()),
            Point3::new(0., 0., 0.5),
            epsilon = 1e-12
        );
    }

    #[test]
    fn there_and_back_again_is_the_identity() {
        let chain = roll_pitch_gimbal();
        let state = chain
            .create_state(GimbalStateVector::from_degrees(&[10., 30.]))
            .unwrap();
        let there = state
            .get_transform_path(&id("P0"), &SnapPointId::GNSS_ANTENNA)
            .unwrap();
        let back = state
            .get_transform_path(&SnapPointId::GNSS_ANTENNA, &id("P0"))
            .unwrap();
        let p = Point3::new(11., 12., 13.);
        assert_relative_eq!(there.and_then(&back).transform_point(&p), p, epsilon = 1e-9);
    }

    #[test]
    fn out_of_arc_angles_are_limited() {
        let chain = roll_pitch_gimbal();
        let state = chain
            .create_state(GimbalStateVector::from_degrees(&[45., -100.]))
            .unwrap();
        assert_relative_eq!(state.angles().as_slice()[0].get::<degree>(), 30., epsilon = 1e-9);
        assert_relative_eq!(state.angles().as_slice()[1].get::<degree>(), -90., epsilon = 1e-9);

        let err = chain.create_state(GimbalStateVector::zeros(3)).unwrap_err();
        insta::assert_snapshot!(err, @"invalid argument: expected 2 gimbal angles, got 3");
    }

    #[test]
    fn unknown_snap_points_are_unreachable() {
        let chain = roll_pitch_gimbal();
        let state = chain.create_state(GimbalStateVector::zeros(2)).unwrap();
        assert_eq!(
            state
                .get_transform_path(&id("P0"), &id("P7"))
                .unwrap_err(),
            Error::UnreachableSnapPoint {
                from: id("P0"),
                to: id("P7"),
            }
        );
    }

    #[test]
    fn camera_orientation_from_drone_orientation_and_gimbal() {
        // a payload pitched down by 90° on a drone that yaws -15° and pitches 20°
        let chain = body_with(vec![(
            fixed_rotation("P0", Vector3::zeros(), Vector3::y(), -90.),
            SnapPointId::BODY_ORIGIN,
        )]);
        let body_to_payload = chain
            .transform_from_body(&id("P0"), GimbalStateVector::default())
            .unwrap();

        let camera = |drone: Orientation| {
            FrameTransform::from_orientation(&drone)
                .and_then(&body_to_payload)
                .inverse()
                .to_tait_bryan_angles()
        };

        let level_roll = camera(Orientation::from_tait_bryan_angles(d(-15.), d(20.), d(0.)));
        assert_relative_eq!(level_roll.yaw().get::<degree>(), -15., epsilon = 1e-9);
        assert_relative_eq!(level_roll.pitch().get::<degree>(), -70., epsilon = 1e-9);
        assert_relative_eq!(level_roll.roll().get::<degree>(), 0., epsilon = 1e-9);

        let rolled = camera(Orientation::from_tait_bryan_angles(d(-15.), d(20.), d(5.)));
        assert_relative_eq!(rolled.yaw().get::<degree>(), -29.35, epsilon = 1e-2);
        assert_relative_eq!(rolled.pitch().get::<degree>(), -69.41, epsilon = 1e-2);
        assert_relative_eq!(rolled.roll().get::<degree>(), 13.47, epsilon = 1e-2);
    }
}
