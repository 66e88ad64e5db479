//! Hardware descriptions and the configurations that select among them.
//!
//! Descriptions say what a piece of hardware *is* (where a gimbal's joints sit, which payload
//! snap points a mount offers, how far a lens puts its nodal point in front of the mount). A
//! [`HardwareConfiguration`] says which of them are bolted together on a particular drone. The
//! kinematics module turns the two into a [`KinematicChain`](crate::kinematics::KinematicChain).
//!
//! All offsets are in meters, in the frame of the snap point they are attached to (`x` forward,
//! `y` right, `z` down). Angles in descriptions are in degrees.

use crate::kinematics::{ConstraintArc, SnapPointId};
use crate::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
fn zero_offset() -> Vector3 {
    Vector3::zeros()
}

#[cfg(feature = "serde")]
fn body_origin() -> SnapPointId {
    SnapPointId::BODY_ORIGIN
}

#[cfg(feature = "serde")]
fn default_optical_axis() -> Vector3 {
    Vector3::x()
}

/// Looks up hardware descriptions by id.
///
/// Returns `None` for ids it does not know; the caller decides which error that is.
pub trait DescriptionProvider {
    fn platform(&self, id: &str) -> Option<&PlatformDescription>;
    fn camera(&self, id: &str) -> Option<&CameraDescription>;
    fn lens(&self, id: &str) -> Option<&LensDescription>;
}

impl<P: DescriptionProvider + ?Sized> DescriptionProvider for &P {
    fn platform(&self, id: &str) -> Option<&PlatformDescription> {
        (**self).platform(id)
    }

    fn camera(&self, id: &str) -> Option<&CameraDescription> {
        (**self).camera(id)
    }

    fn lens(&self, id: &str) -> Option<&LensDescription> {
        (**self).lens(id)
    }
}

/// An in-memory set of descriptions, typically deserialized from a file.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DescriptionCatalog {
    pub platforms: Vec<PlatformDescription>,
    pub cameras: Vec<CameraDescription>,
    pub lenses: Vec<LensDescription>,
}

impl DescriptionProvider for DescriptionCatalog {
    fn platform(&self, id: &str) -> Option<&PlatformDescription> {
        self.platforms.iter().find(|p| p.id == id)
    }

    fn camera(&self, id: &str) -> Option<&CameraDescription> {
        self.cameras.iter().find(|c| c.id == id)
    }

    fn lens(&self, id: &str) -> Option<&LensDescription> {
        self.lenses.iter().find(|l| l.id == id)
    }
}

/// A drone airframe.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PlatformDescription {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub compatible_payload_mounts: Vec<PayloadMountDescription>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub compatible_gnss_antennas: Vec<GnssAntennaDescription>,
    /// Extra named points on the airframe. An entry named like one of the default points
    /// ([`SnapPointId::WAYPOINT_POSITION_OUT`], [`SnapPointId::POSITION_TELEMETRY_IN`]) replaces it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub additional_snap_points: Vec<SnapPointDescription>,
}

impl PlatformDescription {
    #[must_use]
    pub fn payload_mount(&self, id: &str) -> Option<&PayloadMountDescription> {
        self.compatible_payload_mounts.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn gnss_antenna(&self, id: &str) -> Option<&GnssAntennaDescription> {
        self.compatible_gnss_antennas.iter().find(|a| a.id == id)
    }
}

/// A place payloads can be fitted, possibly behind a gimbal.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PayloadMountDescription {
    pub id: String,
    /// Gimbal joints, outermost first. Each one attaches to the previous (the first to the body
    /// origin) and is controlled by the next gimbal angle.
    #[cfg_attr(feature = "serde", serde(default))]
    pub gimbal_segments: Vec<GimbalSegmentDescription>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub payload_snap_points: Vec<PayloadSnapPointDescription>,
}

impl PayloadMountDescription {
    #[must_use]
    pub fn payload_snap_point(&self, id: &SnapPointId) -> Option<&PayloadSnapPointDescription> {
        self.payload_snap_points.iter().find(|p| &p.id == id)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GimbalSegmentDescription {
    pub snap_point_id: SnapPointId,
    #[cfg_attr(feature = "serde", serde(default = "zero_offset"))]
    pub offset: Vector3,
    pub rotation_axis: Vector3,
    pub min_angle_deg: f64,
    pub max_angle_deg: f64,
}

impl GimbalSegmentDescription {
    #[must_use]
    pub fn constraint_arc(&self) -> ConstraintArc {
        ConstraintArc::from_degrees(self.min_angle_deg, self.max_angle_deg)
    }
}

/// Where a payload sits on a mount, and which way it looks.
///
/// A payload's own `x` axis is its optical axis. `optical_axis` gives that direction in the frame
/// of `attached_to`, and `angle_deg` rolls the payload about it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PayloadSnapPointDescription {
    pub id: SnapPointId,
    #[cfg_attr(feature = "serde", serde(default = "body_origin"))]
    pub attached_to: SnapPointId,
    #[cfg_attr(feature = "serde", serde(default = "zero_offset"))]
    pub offset: Vector3,
    #[cfg_attr(feature = "serde", serde(default = "default_optical_axis"))]
    pub optical_axis: Vector3,
    #[cfg_attr(feature = "serde", serde(default))]
    pub angle_deg: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SnapPointDescription {
    pub id: SnapPointId,
    #[cfg_attr(feature = "serde", serde(default = "body_origin"))]
    pub attached_to: SnapPointId,
    #[cfg_attr(feature = "serde", serde(default = "zero_offset"))]
    pub offset: Vector3,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GnssAntennaDescription {
    pub id: String,
    #[cfg_attr(feature = "serde", serde(default = "body_origin"))]
    pub attached_to: SnapPointId,
    #[cfg_attr(feature = "serde", serde(default = "zero_offset"))]
    pub offset: Vector3,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CameraDescription {
    pub id: String,
    /// From the payload snap point to the lens mount.
    #[cfg_attr(feature = "serde", serde(default = "zero_offset"))]
    pub lens_mount_offset: Vector3,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LensDescription {
    pub id: String,
    /// Distance along the optical axis from the lens mount to the nodal point, in meters.
    #[cfg_attr(feature = "serde", serde(default))]
    pub nodal_point_shift_from_lens_mount: f64,
}

/// Which hardware is fitted to a particular drone.
///
/// Two equal configurations always produce the same kinematic chain, which is what
/// [`KinematicsProvider`](crate::kinematics::KinematicsProvider) relies on for caching.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HardwareConfiguration {
    pub platform_id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub payload_mounts: Vec<PayloadMountConfiguration>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub gnss_antenna_id: Option<String>,
}

impl HardwareConfiguration {
    pub fn new(platform_id: impl Into<String>) -> Self {
        Self {
            platform_id: platform_id.into(),
            payload_mounts: Vec::new(),
            gnss_antenna_id: None,
        }
    }

    #[must_use]
    pub fn with_payload_mount(mut self, mount: PayloadMountConfiguration) -> Self {
        self.payload_mounts.push(mount);
        self
    }

    #[must_use]
    pub fn with_gnss_antenna(mut self, id: impl Into<String>) -> Self {
        self.gnss_antenna_id = Some(id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PayloadMountConfiguration {
    pub description_id: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub payloads: Vec<PayloadConfiguration>,
}

impl PayloadMountConfiguration {
    pub fn new(description_id: impl Into<String>) -> Self {
        Self {
            description_id: description_id.into(),
            payloads: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: PayloadConfiguration) -> Self {
        self.payloads.push(payload);
        self
    }
}

/// A camera fitted to one of a mount's payload snap points.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PayloadConfiguration {
    /// Id of the [`CameraDescription`].
    pub description_id: String,
    pub payload_snap_point_id: SnapPointId,
    #[cfg_attr(feature = "serde", serde(default))]
    pub lens: Option<LensConfiguration>,
}

impl PayloadConfiguration {
    pub fn camera(description_id: impl Into<String>, payload_snap_point_id: SnapPointId) -> Self {
        Self {
            description_id: description_id.into(),
            payload_snap_point_id,
            lens: None,
        }
    }

    #[must_use]
    pub fn with_lens(mut self, description_id: impl Into<String>) -> Self {
        self.lens = Some(LensConfiguration {
            description_id: description_id.into(),
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LensConfiguration {
    pub description_id: String,
}

#[cfg(test)]
pub(crate) fn test_catalog() -> DescriptionCatalog {
    serde_yaml::from_str(include_str!("testdata/test_drone.yaml"))
        .expect("test description catalog is valid YAML")
}

/// The gimballed camera setup most tests build on.
#[cfg(test)]
pub(crate) fn test_drone_configuration() -> HardwareConfiguration {
    HardwareConfiguration::new("TestDrone")
        .with_payload_mount(PayloadMountConfiguration::new("TestGimbal").with_payload(
            PayloadConfiguration::camera("TestCamera", SnapPointId::new("CamSnapPoint"))
                .with_lens("TestCameraLens"),
        ))
        .with_gnss_antenna("Antenna1")
}
