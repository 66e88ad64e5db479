//! Errors produced while constructing geometry and kinematic chains.
//!
//! All errors are fatal at this layer: nothing here retries or returns partially-built values.

use crate::kinematics::SnapPointId;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The errors this crate can produce.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum Error {
    /// A geometry constructor or operation was handed an input it cannot work with (non-finite
    /// vectors, empty waypoint lists, non-positive distances, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The hardware configuration (or the descriptions it refers to) cannot be turned into a
    /// kinematic chain.
    #[error("invalid hardware configuration: {0}")]
    InvalidHardwareConfiguration(#[from] HardwareConfigurationError),

    /// The two snap points do not belong to the same kinematic tree.
    #[error("snap point {to} is not reachable from snap point {from}")]
    UnreachableSnapPoint { from: SnapPointId, to: SnapPointId },
}

impl Error {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

/// Details on why a hardware configuration was rejected.
///
/// Every variant names the id that caused the failure so that plan generation can report it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum HardwareConfigurationError {
    #[error("unknown platform description id {0:?}")]
    UnknownPlatform(String),

    #[error("unknown payload mount description id {0:?}")]
    UnknownPayloadMount(String),

    #[error("unsupported or unknown payload description id {0:?}")]
    UnknownPayload(String),

    #[error("camera {camera:?} has no lens configured")]
    MissingLens { camera: String },

    #[error("unknown lens description id {0:?}")]
    UnknownLens(String),

    #[error("payload mount {mount:?} has no payload snap point {snap_point}")]
    UnknownPayloadSnapPoint { mount: String, snap_point: SnapPointId },

    #[error("snap point {snap_point} refers to unknown parent snap point {parent}")]
    UnknownParent {
        snap_point: SnapPointId,
        parent: SnapPointId,
    },

    #[error("snap point {snap_point} has unusable geometry: {reason}")]
    InvalidSnapPointGeometry {
        snap_point: SnapPointId,
        reason: String,
    },

    #[error("snap point {0} is defined more than once")]
    DuplicateSnapPoint(SnapPointId),

    #[error("snap point {0} has more than one attached segment, expected a single payload chain")]
    Branching(SnapPointId),

    #[error("payload mount index {index} is out of range ({count} payload mounts configured)")]
    PayloadMountIndexOutOfRange { index: usize, count: usize },

    #[error("payload index {index} is out of range ({count} payloads configured on mount {mount})")]
    PayloadIndexOutOfRange {
        mount: usize,
        index: usize,
        count: usize,
    },

    #[error("controllable angle indices must be 0..{expected} without gaps, found index {found}")]
    AngleIndexGap { expected: usize, found: usize },
}
