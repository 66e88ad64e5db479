//! Kinematic chains: the tree of named points on a drone and the transforms between them.
//!
//! A [`KinematicChain`] is built once per [`HardwareConfiguration`](crate::hardware::HardwareConfiguration)
//! and never changes afterwards. To ask where one point is relative to another, pair the chain
//! with the current gimbal angles through [`KinematicChain::create_state`] and call
//! [`KinematicChainState::get_transform_path`]. [`KinematicsProvider`] caches chains and moves
//! WGS84 positions between snap points.
//!
//! All frames are body-like: `x` forward (for payloads, along the optical axis), `y` right and
//! `z` down.

mod chain;
mod factory;
mod provider;
mod segment;
mod snap_point;
mod state;

pub use chain::{GimbalStateVector, KinematicChain, KinematicChainBuilder};
pub use factory::{lens_mount_id, nodal_point_id};
pub use provider::{KinematicsProvider, KinematicsProviderConfig, PayloadKinematicChain};
pub use segment::{ConstraintArc, KinematicSegment};
pub use snap_point::SnapPointId;
pub use state::KinematicChainState;
