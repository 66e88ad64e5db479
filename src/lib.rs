//! Flight geometry and drone kinematics for mission planning.
//!
//! The crate has two halves that do not depend on each other:
//!
//! - Flight geometry in a local Cartesian frame (meters, `z` up): [`Interval`]s for coverage
//!   and range bookkeeping, camera [`Pose`]s, and [`FlightLine`]s, which can be stretched at the
//!   ends, clipped against polygons, and adapted to [terrain](terrain).
//! - Kinematics: a drone's [hardware configuration](hardware) is turned into a
//!   [`KinematicChain`](kinematics::KinematicChain), a tree of named snap points (body origin,
//!   gimbal joints, camera nodal points, GNSS antenna) that resolves the [`FrameTransform`]
//!   between any two of them for given gimbal angles. On top of that,
//!   [`KinematicsProvider`](kinematics::KinematicsProvider) moves [`Wgs84`] positions from one
//!   snap point to another; the typical question being "the camera was here when it took the
//!   picture, where was the GNSS antenna?".
//!
//! ```rust
//! use flightplan_kinematics::hardware::{
//!     CameraDescription, DescriptionCatalog, GnssAntennaDescription, HardwareConfiguration,
//!     LensDescription, PayloadConfiguration, PayloadMountConfiguration,
//!     PayloadMountDescription, PayloadSnapPointDescription, PlatformDescription,
//! };
//! use flightplan_kinematics::kinematics::{GimbalStateVector, KinematicsProvider, SnapPointId};
//! use flightplan_kinematics::{Ecef, Orientation, Wgs84};
//! use nalgebra::Vector3;
//! use uom::si::angle::degree;
//! use uom::si::f64::Angle;
//! use uom::ConstZero;
//!
//! // a quadcopter with a fixed camera 20cm ahead of the antenna
//! let catalog = DescriptionCatalog {
//!     platforms: vec![PlatformDescription {
//!         id: "Quad".into(),
//!         compatible_payload_mounts: vec![PayloadMountDescription {
//!             id: "Front".into(),
//!             gimbal_segments: vec![],
//!             payload_snap_points: vec![PayloadSnapPointDescription {
//!                 id: SnapPointId::new("Nose"),
//!                 attached_to: SnapPointId::BODY_ORIGIN,
//!                 offset: Vector3::new(0.2, 0., 0.),
//!                 optical_axis: Vector3::x(),
//!                 angle_deg: 0.,
//!             }],
//!         }],
//!         compatible_gnss_antennas: vec![GnssAntennaDescription {
//!             id: "Mast".into(),
//!             attached_to: SnapPointId::BODY_ORIGIN,
//!             offset: Vector3::zeros(),
//!         }],
//!         additional_snap_points: vec![],
//!     }],
//!     cameras: vec![CameraDescription {
//!         id: "Cam".into(),
//!         lens_mount_offset: Vector3::zeros(),
//!     }],
//!     lenses: vec![LensDescription {
//!         id: "Wide".into(),
//!         nodal_point_shift_from_lens_mount: 0.,
//!     }],
//! };
//! let config = HardwareConfiguration::new("Quad")
//!     .with_payload_mount(PayloadMountConfiguration::new("Front").with_payload(
//!         PayloadConfiguration::camera("Cam", SnapPointId::new("Nose")).with_lens("Wide"),
//!     ))
//!     .with_gnss_antenna("Mast");
//!
//! let provider = KinematicsProvider::new(catalog);
//! let payload = provider.get_or_create_payload_kinematic_chain(&config, 0, 0)?;
//! let state = payload.chain().create_state(GimbalStateVector::default())?;
//!
//! // the camera faced east when it was at this position
//! let camera_at = Wgs84::from_degrees_and_meters(47.3769, 8.5417, 408.)?;
//! let facing_east =
//!     Orientation::from_tait_bryan_angles(Angle::new::<degree>(90.), Angle::ZERO, Angle::ZERO);
//! let antenna_at = provider.transform_wgs84_position(
//!     &state,
//!     payload.nodal_point_id(),
//!     &facing_east,
//!     &camera_at,
//!     &SnapPointId::GNSS_ANTENNA,
//! )?;
//!
//! // so the antenna was 20cm away from it
//! let separation =
//!     Ecef::from(antenna_at).to_nalgebra_point() - Ecef::from(camera_at).to_nalgebra_point();
//! assert!((separation.norm() - 0.2).abs() < 1e-6);
//! # Ok::<(), flightplan_kinematics::Error>(())
//! ```
//!
//! Nothing in this crate logs above `warn`, and it never installs a `tracing` subscriber; that is
//! left to the application.

mod util;

pub mod error;
pub mod flight_line;
pub mod geodetic;
pub mod hardware;
pub mod interval;
pub mod kinematics;
pub mod math;
pub mod pose;
pub mod terrain;

pub(crate) type Point3 = nalgebra::Point3<f64>;
pub(crate) type Vector3 = nalgebra::Vector3<f64>;
pub(crate) type Vector2 = nalgebra::Vector2<f64>;
pub(crate) type Quaternion = nalgebra::Quaternion<f64>;
pub(crate) type UnitQuaternion = nalgebra::Unit<Quaternion>;
pub(crate) type Isometry3 = nalgebra::Isometry3<f64>;

pub use error::{Error, HardwareConfigurationError, Result};
pub use flight_line::FlightLine;
pub use geodetic::{Ecef, Wgs84};
pub use interval::Interval;
pub use math::{FrameTransform, Orientation};
pub use pose::Pose;
