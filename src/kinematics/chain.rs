use crate::error::{Error, HardwareConfigurationError, Result};
use crate::kinematics::{KinematicChainState, KinematicSegment, SnapPointId};
use crate::math::FrameTransform;
use crate::util::BoundedAngle;
use std::collections::HashMap;
use tracing::trace;
use uom::si::angle::{degree, radian};
use uom::si::f64::Angle;
use uom::ConstZero;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One angle per controllable joint of a [`KinematicChain`], ordered by angle index.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct GimbalStateVector(Vec<Angle>);

impl GimbalStateVector {
    #[must_use]
    pub fn new(angles: Vec<Angle>) -> Self {
        Self(angles)
    }

    #[must_use]
    pub fn zeros(len: usize) -> Self {
        Self(vec![Angle::ZERO; len])
    }

    #[must_use]
    pub fn from_degrees(degrees: &[f64]) -> Self {
        degrees.iter().map(|&d| Angle::new::<degree>(d)).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<Angle> {
        self.0.get(index).copied()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Angle] {
        &self.0
    }

    /// Root mean square of the per-joint angular distances to `other`, each taken the short way
    /// round the circle.
    pub fn distance_measure(&self, other: &GimbalStateVector) -> Result<Angle> {
        if self.len() != other.len() {
            return Err(Error::invalid_argument(format!(
                "cannot compare gimbal states of length {} and {}",
                self.len(),
                other.len()
            )));
        }
        if self.is_empty() {
            return Ok(Angle::ZERO);
        }
        let sum_sq: f64 = self
            .0
            .iter()
            .zip(&other.0)
            .map(|(&a, &b)| BoundedAngle::new(a).undirected_distance(b.into()).powi(2))
            .sum();
        Ok(Angle::new::<radian>((sum_sq / self.len() as f64).sqrt()))
    }
}

impl FromIterator<Angle> for GimbalStateVector {
    fn from_iter<I: IntoIterator<Item = Angle>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Node {
    pub(crate) segment: KinematicSegment,
    pub(crate) parent: Option<usize>,
    pub(crate) children: Vec<usize>,
}

/// The tree of snap points on a drone, rooted at [`SnapPointId::BODY_ORIGIN`].
///
/// Segments are stored in the order they were added, so a segment's parent always comes before
/// it. The chain is immutable once built; pair it with joint angles through
/// [`create_state`](Self::create_state) to resolve transforms.
#[derive(Debug, Clone, PartialEq)]
pub struct KinematicChain {
    nodes: Vec<Node>,
    by_id: HashMap<SnapPointId, usize>,
    gimbal_state_vector_len: usize,
}

impl KinematicChain {
    /// Starts a chain that holds only the body origin.
    #[must_use]
    pub fn builder() -> KinematicChainBuilder {
        KinematicChainBuilder::new()
    }

    #[must_use]
    pub fn segment(&self, id: &SnapPointId) -> Option<&KinematicSegment> {
        self.by_id.get(id).map(|&i| &self.nodes[i].segment)
    }

    #[must_use]
    pub fn contains(&self, id: &SnapPointId) -> bool {
        self.by_id.contains_key(id)
    }

    /// All segments, parents before children.
    pub fn segments(&self) -> impl Iterator<Item = &KinematicSegment> + '_ {
        self.nodes.iter().map(|n| &n.segment)
    }

    #[must_use]
    pub fn parent(&self, id: &SnapPointId) -> Option<&KinematicSegment> {
        let node = &self.nodes[*self.by_id.get(id)?];
        node.parent.map(|p| &self.nodes[p].segment)
    }

    /// Segments attached directly to `id`. Empty if `id` is not in the chain.
    pub fn children(&self, id: &SnapPointId) -> impl Iterator<Item = &KinematicSegment> + '_ {
        self.by_id
            .get(id)
            .into_iter()
            .flat_map(move |&i| self.nodes[i].children.iter())
            .map(move |&c| &self.nodes[c].segment)
    }

    /// Segments driven by the gimbal state, ordered by angle index.
    #[must_use]
    pub fn controllable_segments(&self) -> Vec<&KinematicSegment> {
        let mut controllable: Vec<_> = self.segments().filter(|s| s.is_controllable()).collect();
        controllable.sort_by_key(|s| s.angle_index());
        controllable
    }

    #[must_use]
    pub fn gimbal_state_vector_len(&self) -> usize {
        self.gimbal_state_vector_len
    }

    /// Every joint at zero, or at the nearest end of its arc where zero is not allowed.
    #[must_use]
    pub fn default_gimbal_state_vector(&self) -> GimbalStateVector {
        self.controllable_segments()
            .into_iter()
            .map(|s| s.constraint_arc().limit(Angle::ZERO))
            .collect()
    }

    /// Pairs the chain with concrete joint angles.
    ///
    /// Angles outside a joint's constraint arc are moved to the nearest end of the arc.
    pub fn create_state(&self, angles: GimbalStateVector) -> Result<KinematicChainState<'_>> {
        KinematicChainState::new(self, angles)
    }

    /// Transform from the body frame into the frame of `id`, at the given joint angles.
    pub fn transform_from_body(
        &self,
        id: &SnapPointId,
        angles: GimbalStateVector,
    ) -> Result<FrameTransform> {
        self.create_state(angles)?
            .get_transform_path(&SnapPointId::BODY_ORIGIN, id)
    }

    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub(crate) fn index_of(&self, id: &SnapPointId) -> Option<usize> {
        self.by_id.get(id).copied()
    }
}

/// Assembles a [`KinematicChain`] one segment at a time.
///
/// ```
/// use flightplan_kinematics::kinematics::{KinematicChain, KinematicSegment, SnapPointId};
/// use nalgebra::Vector3;
///
/// let antenna = KinematicSegment::fixed(SnapPointId::GNSS_ANTENNA, Vector3::new(0., 0., -0.3))?;
/// let chain = KinematicChain::builder()
///     .add(antenna, &SnapPointId::BODY_ORIGIN)?
///     .build()?;
/// assert_eq!(chain.segments().count(), 2);
/// # Ok::<(), flightplan_kinematics::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct KinematicChainBuilder {
    nodes: Vec<Node>,
    by_id: HashMap<SnapPointId, usize>,
}

impl Default for KinematicChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KinematicChainBuilder {
    #[must_use]
    pub fn new() -> Self {
        let root = KinematicSegment::root();
        Self {
            by_id: HashMap::from([(root.snap_point_id().clone(), 0)]),
            nodes: vec![Node {
                segment: root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    #[must_use]
    pub fn contains(&self, id: &SnapPointId) -> bool {
        self.by_id.contains_key(id)
    }

    /// Attaches `segment` to the already present segment `parent`.
    pub fn add(mut self, segment: KinematicSegment, parent: &SnapPointId) -> Result<Self> {
        let id = segment.snap_point_id().clone();
        let Some(&parent_index) = self.by_id.get(parent) else {
            return Err(HardwareConfigurationError::UnknownParent {
                snap_point: id,
                parent: parent.clone(),
            }
            .into());
        };
        if self.by_id.contains_key(&id) {
            return Err(HardwareConfigurationError::DuplicateSnapPoint(id).into());
        }

        trace!(snap_point = %id, %parent, angle_index = ?segment.angle_index(), "appended kinematic segment");
        let index = self.nodes.len();
        self.nodes[parent_index].children.push(index);
        self.nodes.push(Node {
            segment,
            parent: Some(parent_index),
            children: Vec::new(),
        });
        self.by_id.insert(id, index);
        Ok(self)
    }

    /// Checks that controllable angle indices are exactly `0..n` and freezes the chain.
    pub fn build(self) -> Result<KinematicChain> {
        let mut indices: Vec<usize> = self
            .nodes
            .iter()
            .filter_map(|n| n.segment.angle_index())
            .collect();
        indices.sort_unstable();
        if let Some((_, &found)) = indices
            .iter()
            .enumerate()
            .find(|&(expected, &found)| expected != found)
        {
            return Err(HardwareConfigurationError::AngleIndexGap {
                expected: indices.len(),
                found,
            }
            .into());
        }

        Ok(KinematicChain {
            gimbal_state_vector_len: indices.len(),
            nodes: self.nodes,
            by_id: self.by_id,
        })
    }
}
