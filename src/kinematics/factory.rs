//! Building a [`KinematicChain`] from a [`HardwareConfiguration`].
//!
//! The chain always contains, in this order:
//!
//! 1. the body origin,
//! 2. for each payload mount, its gimbal joints (each controlled by the next gimbal angle) and,
//!    for each payload fitted to it, the payload snap point followed by the lens mount and the
//!    nodal point,
//! 3. the platform's additional snap points, including [`SnapPointId::WAYPOINT_POSITION_OUT`] and
//!    [`SnapPointId::POSITION_TELEMETRY_IN`],
//! 4. the GNSS antenna.

use crate::error::{Error, HardwareConfigurationError, Result};
use crate::hardware::{
    DescriptionProvider, HardwareConfiguration, PayloadMountDescription,
    PayloadSnapPointDescription, SnapPointDescription,
};
use crate::kinematics::{
    ConstraintArc, KinematicChain, KinematicChainBuilder, KinematicSegment, SnapPointId,
};
use crate::Vector3;
use tracing::{debug, warn};
use uom::si::angle::{degree, radian};
use uom::si::f64::Angle;

// below this, an optical axis counts as the default one
const AXIS_TOLERANCE: f64 = 1e-9;

/// Id of the segment that turns a payload snap point's frame onto a non-default optical axis.
fn optical_axis_id(payload_snap_point: &SnapPointId) -> SnapPointId {
    SnapPointId::new(format!("{payload_snap_point}_OPTICAL_AXIS"))
}

/// Id of the lens mount of `camera`, the `payload_index`th payload on the `mount_index`th
/// configured payload mount.
#[must_use]
pub fn lens_mount_id(camera: &str, mount_index: usize, payload_index: usize) -> SnapPointId {
    SnapPointId::new(format!(
        "PAYLOAD_{camera}@{mount_index}:{payload_index}_LENSMOUNT"
    ))
}

/// Id of the nodal point of `camera`, indexed like [`lens_mount_id`].
#[must_use]
pub fn nodal_point_id(camera: &str, mount_index: usize, payload_index: usize) -> SnapPointId {
    SnapPointId::new(format!(
        "PAYLOAD_{camera}@{mount_index}:{payload_index}_NODAL_POINT"
    ))
}

impl KinematicChain {
    /// Builds the chain for `configuration`, looking up every referenced description in
    /// `descriptions`.
    ///
    /// Fails if any referenced description or snap point does not exist. The result is checked to
    /// connect the body origin with the GNSS antenna.
    pub fn from_hardware_configuration(
        configuration: &HardwareConfiguration,
        descriptions: &(impl DescriptionProvider + ?Sized),
    ) -> Result<Self> {
        let platform = descriptions
            .platform(&configuration.platform_id)
            .ok_or_else(|| {
                HardwareConfigurationError::UnknownPlatform(configuration.platform_id.clone())
            })?;

        let mut builder = KinematicChain::builder();
        let mut angle_index = 0;

        for (mount_index, mount_configuration) in
            configuration.payload_mounts.iter().enumerate()
        {
            let mount = platform
                .payload_mount(&mount_configuration.description_id)
                .ok_or_else(|| {
                    HardwareConfigurationError::UnknownPayloadMount(
                        mount_configuration.description_id.clone(),
                    )
                })?;

            builder = add_gimbal(builder, mount, &mut angle_index)?;

            for (payload_index, payload) in mount_configuration.payloads.iter().enumerate() {
                let snap_point = mount
                    .payload_snap_point(&payload.payload_snap_point_id)
                    .ok_or_else(|| HardwareConfigurationError::UnknownPayloadSnapPoint {
                        mount: mount.id.clone(),
                        snap_point: payload.payload_snap_point_id.clone(),
                    })?;
                let camera = descriptions.camera(&payload.description_id).ok_or_else(|| {
                    HardwareConfigurationError::UnknownPayload(payload.description_id.clone())
                })?;
                let lens_id = &payload
                    .lens
                    .as_ref()
                    .ok_or_else(|| HardwareConfigurationError::MissingLens {
                        camera: camera.id.clone(),
                    })?
                    .description_id;
                let lens = descriptions
                    .lens(lens_id)
                    .ok_or_else(|| HardwareConfigurationError::UnknownLens(lens_id.clone()))?;

                builder = add_payload_snap_point(builder, snap_point)?;

                let lens_mount = lens_mount_id(&camera.id, mount_index, payload_index);
                let nodal_point = nodal_point_id(&camera.id, mount_index, payload_index);
                let lens_mount_segment =
                    KinematicSegment::fixed(lens_mount.clone(), camera.lens_mount_offset)
                        .map_err(invalid_geometry(&lens_mount))?;
                let nodal_point_segment = KinematicSegment::fixed(
                    nodal_point.clone(),
                    Vector3::new(lens.nodal_point_shift_from_lens_mount, 0., 0.),
                )
                .map_err(invalid_geometry(&nodal_point))?;
                builder = builder
                    .add(lens_mount_segment, &snap_point.id)?
                    .add(nodal_point_segment, &lens_mount)?;
            }
        }

        for snap_point in additional_snap_points(&platform.additional_snap_points) {
            builder = builder.add(
                KinematicSegment::fixed(snap_point.id.clone(), snap_point.offset)
                    .map_err(invalid_geometry(&snap_point.id))?,
                &snap_point.attached_to,
            )?;
        }

        let antenna = match &configuration.gnss_antenna_id {
            Some(id) => {
                let antenna = platform.gnss_antenna(id);
                if antenna.is_none() {
                    warn!(
                        antenna = %id,
                        platform = %platform.id,
                        "GNSS antenna not compatible with platform, assuming antenna at body origin"
                    );
                }
                antenna
            }
            None => None,
        };
        let (antenna_parent, antenna_offset) = antenna.map_or_else(
            || (SnapPointId::BODY_ORIGIN, Vector3::zeros()),
            |a| (a.attached_to.clone(), a.offset),
        );
        builder = builder.add(
            KinematicSegment::fixed(SnapPointId::GNSS_ANTENNA, antenna_offset)
                .map_err(invalid_geometry(&SnapPointId::GNSS_ANTENNA))?,
            &antenna_parent,
        )?;

        let chain = builder.build()?;
        chain
            .create_state(chain.default_gimbal_state_vector())?
            .get_transform_path(&SnapPointId::BODY_ORIGIN, &SnapPointId::GNSS_ANTENNA)?;

        debug!(
            platform = %platform.id,
            segments = chain.segments().count(),
            gimbal_angles = chain.gimbal_state_vector_len(),
            "built kinematic chain"
        );
        Ok(chain)
    }
}

fn add_gimbal(
    mut builder: KinematicChainBuilder,
    mount: &PayloadMountDescription,
    angle_index: &mut usize,
) -> Result<KinematicChainBuilder> {
    let mut parent = SnapPointId::BODY_ORIGIN;
    for joint in &mount.gimbal_segments {
        let segment = KinematicSegment::new(
            joint.snap_point_id.clone(),
            joint.offset,
            joint.rotation_axis,
            Some(*angle_index),
            joint.constraint_arc(),
        )
        .map_err(invalid_geometry(&joint.snap_point_id))?;
        builder = builder.add(segment, &parent)?;
        parent = joint.snap_point_id.clone();
        *angle_index += 1;
    }
    Ok(builder)
}

/// Adds the frame of a payload snap point: first turned so that its `x` axis lies along the
/// optical axis, then rolled about it.
fn add_payload_snap_point(
    mut builder: KinematicChainBuilder,
    snap_point: &PayloadSnapPointDescription,
) -> Result<KinematicChainBuilder> {
    let optical_axis = snap_point
        .optical_axis
        .try_normalize(f64::EPSILON)
        .filter(|axis| axis.iter().all(|c| c.is_finite()))
        .ok_or_else(|| HardwareConfigurationError::InvalidSnapPointGeometry {
            snap_point: snap_point.id.clone(),
            reason: "optical axis must be finite and non-zero".into(),
        })?;
    if !snap_point.angle_deg.is_finite() {
        return Err(HardwareConfigurationError::InvalidSnapPointGeometry {
            snap_point: snap_point.id.clone(),
            reason: format!(
                "angle about the optical axis must be finite, got {}",
                snap_point.angle_deg
            ),
        }
        .into());
    }

    let mut parent = snap_point.attached_to.clone();
    let mut offset = snap_point.offset;
    if (optical_axis - Vector3::x()).norm() > AXIS_TOLERANCE {
        let turn = Vector3::x().cross(&optical_axis);
        // opposite to x, any perpendicular axis will do
        let turn = if turn.norm() > AXIS_TOLERANCE {
            turn
        } else {
            Vector3::z()
        };
        let angle = Vector3::x().dot(&optical_axis).clamp(-1., 1.).acos();
        let id = optical_axis_id(&snap_point.id);
        builder = builder.add(
            KinematicSegment::new(
                id.clone(),
                offset,
                turn,
                None,
                ConstraintArc::fixed(Angle::new::<radian>(angle)),
            )
            .map_err(invalid_geometry(&snap_point.id))?,
            &parent,
        )?;
        parent = id;
        offset = Vector3::zeros();
    }

    builder.add(
        KinematicSegment::new(
            snap_point.id.clone(),
            offset,
            Vector3::x(),
            None,
            ConstraintArc::fixed(Angle::new::<degree>(snap_point.angle_deg)),
        )
        .map_err(invalid_geometry(&snap_point.id))?,
        &parent,
    )
}

/// Turns a rejected segment into a configuration error naming the snap point it was built for.
fn invalid_geometry(snap_point: &SnapPointId) -> impl FnOnce(Error) -> Error + '_ {
    move |err| {
        let reason = match err {
            Error::InvalidArgument(reason) => reason,
            other => other.to_string(),
        };
        HardwareConfigurationError::InvalidSnapPointGeometry {
            snap_point: snap_point.clone(),
            reason,
        }
        .into()
    }
}

/// The platform's extra snap points, with the two default points first unless overridden.
fn additional_snap_points(platform_points: &[SnapPointDescription]) -> Vec<SnapPointDescription> {
    let mut points: Vec<_> = [
        SnapPointId::WAYPOINT_POSITION_OUT,
        SnapPointId::POSITION_TELEMETRY_IN,
    ]
    .into_iter()
    .map(|id| SnapPointDescription {
        id,
        attached_to: SnapPointId::BODY_ORIGIN,
        offset: Vector3::zeros(),
    })
    .collect();

    for point in platform_points {
        match points.iter_mut().find(|p| p.id == point.id) {
            Some(existing) => *existing = point.clone(),
            None => points.push(point.clone()),
        }
    }
    points
}
