use std::borrow::Cow;
use std::fmt;
use std::fmt::{Display, Formatter};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Names an attachment point in a kinematic chain.
///
/// Snap point ids come from hardware descriptions, so most of them are only known at runtime. The
/// handful that every chain has are available as associated constants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct SnapPointId(Cow<'static, str>);

impl SnapPointId {
    /// The root of every chain: the drone body's reference point.
    pub const BODY_ORIGIN: Self = Self::from_static("BODY_ORIGIN");
    /// The phase center of the GNSS antenna the platform navigates with.
    pub const GNSS_ANTENNA: Self = Self::from_static("GNSS_ANTENNA");
    /// The point whose position is sent to the autopilot as the waypoint position.
    pub const WAYPOINT_POSITION_OUT: Self = Self::from_static("WAYPOINT_POSITION_OUT");
    /// The point whose position the autopilot reports in telemetry.
    pub const POSITION_TELEMETRY_IN: Self = Self::from_static("POSITION_TELEMETRY_IN");

    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl Display for SnapPointId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SnapPointId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for SnapPointId {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}
