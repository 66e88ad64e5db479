use crate::error::{HardwareConfigurationError, Result};
use crate::geodetic::Wgs84;
use crate::hardware::{DescriptionProvider, HardwareConfiguration};
use crate::kinematics::{KinematicChain, KinematicChainState, SnapPointId};
use crate::math::{FrameTransform, Orientation};
use crate::Vector3;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Settings for [`KinematicsProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KinematicsProviderConfig {
    /// How many chains to keep. The least recently used one is dropped to make room; `0` disables
    /// caching.
    pub cache_capacity: usize,
}

impl Default for KinematicsProviderConfig {
    fn default() -> Self {
        Self { cache_capacity: 32 }
    }
}

/// The part of a [`KinematicChain`] that carries one payload, from its snap point on the mount
/// to its nodal point.
#[derive(Debug, Clone)]
pub struct PayloadKinematicChain {
    chain: Arc<KinematicChain>,
    payload_snap_point_id: SnapPointId,
    nodal_point_id: SnapPointId,
}

impl PayloadKinematicChain {
    /// The whole chain the payload is part of.
    #[must_use]
    pub fn chain(&self) -> &Arc<KinematicChain> {
        &self.chain
    }

    #[must_use]
    pub fn payload_snap_point_id(&self) -> &SnapPointId {
        &self.payload_snap_point_id
    }

    #[must_use]
    pub fn nodal_point_id(&self) -> &SnapPointId {
        &self.nodal_point_id
    }
}

#[derive(Debug)]
struct CacheEntry {
    chain: Arc<KinematicChain>,
    last_used: u64,
}

#[derive(Debug, Default)]
struct ChainCache {
    entries: HashMap<HardwareConfiguration, CacheEntry>,
    clock: u64,
}

impl ChainCache {
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn evict_least_recently_used(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(config, _)| config.clone());
        if let Some(config) = oldest {
            debug!(platform = %config.platform_id, "evicting kinematic chain");
            self.entries.remove(&config);
        }
    }
}

/// Builds kinematic chains from hardware configurations and keeps the most recently used ones
/// around.
///
/// Chains are keyed by configuration value, so equal configurations share one chain. Lookups
/// are serialized by a single lock, which also ensures that a chain is only built once.
#[derive(Debug)]
pub struct KinematicsProvider<D> {
    descriptions: D,
    config: KinematicsProviderConfig,
    cache: Mutex<ChainCache>,
}

impl<D: DescriptionProvider> KinematicsProvider<D> {
    pub fn new(descriptions: D) -> Self {
        Self::with_config(descriptions, KinematicsProviderConfig::default())
    }

    pub fn with_config(descriptions: D, config: KinematicsProviderConfig) -> Self {
        Self {
            descriptions,
            config,
            cache: Mutex::new(ChainCache::default()),
        }
    }

    pub fn descriptions(&self) -> &D {
        &self.descriptions
    }

    // a panic while holding the lock cannot leave the map half-updated, so poisoning is ignored
    fn cache(&self) -> MutexGuard<'_, ChainCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The chain for `configuration`, built on first use.
    pub fn get_or_create_kinematic_chain(
        &self,
        configuration: &HardwareConfiguration,
    ) -> Result<Arc<KinematicChain>> {
        let mut cache = self.cache();
        let now = cache.tick();
        if let Some(entry) = cache.entries.get_mut(configuration) {
            entry.last_used = now;
            debug!(platform = %configuration.platform_id, "kinematic chain served from cache");
            return Ok(Arc::clone(&entry.chain));
        }

        let chain = Arc::new(KinematicChain::from_hardware_configuration(
            configuration,
            &self.descriptions,
        )?);
        if self.config.cache_capacity > 0 {
            while cache.entries.len() >= self.config.cache_capacity {
                cache.evict_least_recently_used();
            }
            cache.entries.insert(
                configuration.clone(),
                CacheEntry {
                    chain: Arc::clone(&chain),
                    last_used: now,
                },
            );
        }
        Ok(chain)
    }

    /// The chain of the `payload_index`th payload on the `mount_index`th payload mount of
    /// `configuration`.
    ///
    /// Fails if either index is out of range, or if the payload's snap point carries more than one
    /// chain of segments.
    pub fn get_or_create_payload_kinematic_chain(
        &self,
        configuration: &HardwareConfiguration,
        mount_index: usize,
        payload_index: usize,
    ) -> Result<PayloadKinematicChain> {
        let mount = configuration.payload_mounts.get(mount_index).ok_or(
            HardwareConfigurationError::PayloadMountIndexOutOfRange {
                index: mount_index,
                count: configuration.payload_mounts.len(),
            },
        )?;
        let payload = mount.payloads.get(payload_index).ok_or(
            HardwareConfigurationError::PayloadIndexOutOfRange {
                mount: mount_index,
                index: payload_index,
                count: mount.payloads.len(),
            },
        )?;

        let chain = self.get_or_create_kinematic_chain(configuration)?;
        let payload_snap_point_id = payload.payload_snap_point_id.clone();
        let mut current = payload_snap_point_id.clone();
        loop {
            let mut children = chain.children(&current);
            let Some(next) = children.next() else {
                break;
            };
            if children.next().is_some() {
                return Err(HardwareConfigurationError::Branching(current).into());
            }
            current = next.snap_point_id().clone();
        }

        Ok(PayloadKinematicChain {
            chain,
            payload_snap_point_id,
            nodal_point_id: current,
        })
    }

    /// Where `target` is relative to `source`, in north/east/down meters, when `source` has the
    /// given orientation.
    pub fn earth_frame_offset(
        &self,
        state: &KinematicChainState<'_>,
        source: &SnapPointId,
        source_orientation: &Orientation,
        target: &SnapPointId,
    ) -> Result<Vector3> {
        let earth_to_target = FrameTransform::from_orientation(source_orientation)
            .and_then(&state.get_transform_path(source, target)?);
        // the target's origin, expressed in the earth frame
        Ok(earth_to_target.inverse().translation())
    }

    /// Moves a position known at snap point `source` over to snap point `target`.
    ///
    /// `source_orientation` is the orientation of the `source` frame in the earth frame, so that
    /// the offset between the two points can be turned into north/east/down.
    pub fn transform_wgs84_position(
        &self,
        state: &KinematicChainState<'_>,
        source: &SnapPointId,
        source_orientation: &Orientation,
        source_position: &Wgs84,
        target: &SnapPointId,
    ) -> Result<Wgs84> {
        let ned = self.earth_frame_offset(state, source, source_orientation, target)?;
        Ok(source_position.offset_by_ned(&ned))
    }

    /// Drops the cached chain for `configuration`, if any. Returns whether there was one.
    pub fn invalidate(&self, configuration: &HardwareConfiguration) -> bool {
        self.cache().entries.remove(configuration).is_some()
    }

    pub fn clear(&self) {
        self.cache().entries.clear();
    }

    #[must_use]
    pub fn cached_chain_count(&self) -> usize {
        self.cache().entries.len()
    }
}
