//! Collider registry
//!
//! Fixed-capacity slot table plus the spatial hash. Every mutation that moves
//! a collider updates its cached bounds and its cell membership before
//! returning, so queries never see stale broad-phase data.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collider::{Collider, ColliderId};
use super::spatial_hash::{CellRange, SpatialHash};
use crate::config::WorldConfig;
use crate::error::WorldError;
use crate::geom::{Aabb, Pose, ShapeRef, compute_world_aabb};

/// One slot of the registry. The generation survives removal so ids issued
/// for earlier occupants stop resolving.
#[derive(Debug, Clone)]
pub(super) struct Slot {
    pub(super) generation: u32,
    pub(super) collider: Option<Collider>,
}

impl Slot {
    fn vacant() -> Self {
        Self {
            generation: 1,
            collider: None,
        }
    }

    fn bump_generation(&mut self) {
        self.generation = self.generation.wrapping_add(1).max(1);
    }
}

/// Registry counters, cheap to collect every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorldStats {
    /// Live colliders
    pub colliders: usize,
    /// Occupied spatial hash cells
    pub cells: usize,
    /// Spatial hash table slots
    pub hash_capacity: usize,
    /// Colliders ever added
    pub total_added: u64,
    /// Cell insertions lost to allocation failure
    pub dropped_cell_inserts: u64,
}

/// Collision world: collider registry, broad phase and queries
#[derive(Debug, Clone)]
pub struct World {
    pub(super) config: WorldConfig,
    pub(super) slots: Vec<Slot>,
    pub(super) hash: SpatialHash,
    count: usize,
    /// No free slot exists below this index
    free_hint: usize,
    total_added: u64,
    dropped_cell_inserts: u64,
}

/// Insert `key` into every cell of `range`, returning how many were lost
fn insert_cells(hash: &mut SpatialHash, range: CellRange, key: u32) -> u64 {
    range
        .iter()
        .filter(|&(cx, cy)| !hash.add(cx, cy, key))
        .count() as u64
}

fn remove_cells(hash: &mut SpatialHash, range: CellRange, key: u32) {
    for (cx, cy) in range.iter() {
        hash.remove(cx, cy, key);
    }
}

impl World {
    /// Validate `config` and allocate every slot up front
    pub fn new(config: WorldConfig) -> Result<Self, WorldError> {
        config.validate()?;
        let slots = vec![Slot::vacant(); config.max_colliders];
        let hash = SpatialHash::new(config.cell_size, config.spatial_initial_capacity);
        log::debug!(
            "World created: {} slots, cell size {}",
            config.max_colliders,
            config.cell_size
        );
        Ok(Self {
            config,
            slots,
            hash,
            count: 0,
            free_hint: 0,
            total_added: 0,
            dropped_cell_inserts: 0,
        })
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Read access to the broad phase (debug draw, diagnostics)
    #[inline]
    pub fn spatial_hash(&self) -> &SpatialHash {
        &self.hash
    }

    /// Add an unrotated collider
    pub fn add(&mut self, shape: ShapeRef, position: Vec2) -> Result<ColliderId, WorldError> {
        self.add_with_rotation(shape, position, 0.0)
    }

    /// Add a collider in the first free slot. Layer and mask default to
    /// [`Layers::ALL`](super::Layers::ALL).
    pub fn add_with_rotation(
        &mut self,
        shape: ShapeRef,
        position: Vec2,
        rotation: f32,
    ) -> Result<ColliderId, WorldError> {
        let capacity = self.slots.len();
        if self.count == capacity {
            log::warn!("Collider rejected: world is full ({capacity} colliders)");
            return Err(WorldError::Full { capacity });
        }

        let Some(slot) = (self.free_hint..capacity).find(|&i| self.slots[i].collider.is_none())
        else {
            log::warn!("Collider rejected: no free slot found");
            return Err(WorldError::Full { capacity });
        };

        let pose = Pose::new(position, rotation);
        let aabb = compute_world_aabb(&shape, pose);
        let key = slot as u32;
        let range = self.hash.cells_overlapping(&aabb);
        self.dropped_cell_inserts += insert_cells(&mut self.hash, range, key);

        let entry = &mut self.slots[slot];
        entry.collider = Some(Collider::new(shape, pose, aabb));
        let id = ColliderId::new(key, entry.generation);

        self.count += 1;
        self.total_added += 1;
        self.free_hint = slot + 1;
        log::trace!("Added collider {id:?} at {position}");
        Ok(id)
    }

    /// Remove a collider. Returns false for stale or unknown ids.
    pub fn remove(&mut self, id: ColliderId) -> bool {
        let Some(slot) = self.slot_index(id) else {
            return false;
        };
        let entry = &mut self.slots[slot];
        let Some(collider) = entry.collider.take() else {
            return false;
        };
        entry.bump_generation();
        let range = self.hash.cells_overlapping(&collider.aabb);
        remove_cells(&mut self.hash, range, slot as u32);

        self.count -= 1;
        self.free_hint = self.free_hint.min(slot);
        log::trace!("Removed collider {id:?}");
        true
    }

    /// Remove every collider. Outstanding ids all become stale.
    pub fn clear(&mut self) {
        for entry in &mut self.slots {
            if entry.collider.take().is_some() {
                entry.bump_generation();
            }
        }
        self.hash.clear();
        self.count = 0;
        self.free_hint = 0;
    }

    pub(super) fn slot_index(&self, id: ColliderId) -> Option<usize> {
        let slot = id.slot() as usize;
        let entry = self.slots.get(slot)?;
        (entry.generation == id.generation() && entry.collider.is_some()).then_some(slot)
    }

    /// Current id for an occupied slot
    #[inline]
    pub(super) fn id_at(&self, slot: usize) -> ColliderId {
        ColliderId::new(slot as u32, self.slots[slot].generation)
    }

    #[inline]
    pub fn is_valid(&self, id: ColliderId) -> bool {
        self.slot_index(id).is_some()
    }

    pub fn collider(&self, id: ColliderId) -> Option<&Collider> {
        self.slot_index(id)
            .and_then(|slot| self.slots[slot].collider.as_ref())
    }

    fn collider_mut(&mut self, id: ColliderId) -> Option<&mut Collider> {
        let slot = self.slot_index(id)?;
        self.slots[slot].collider.as_mut()
    }

    /// Live collider count
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Fixed slot count
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Live colliders in slot order
    pub fn iter(&self) -> impl Iterator<Item = (ColliderId, &Collider)> {
        self.slots.iter().enumerate().filter_map(|(slot, entry)| {
            entry
                .collider
                .as_ref()
                .map(|c| (ColliderId::new(slot as u32, entry.generation), c))
        })
    }

    pub fn stats(&self) -> WorldStats {
        WorldStats {
            colliders: self.count,
            cells: self.hash.cell_count(),
            hash_capacity: self.hash.capacity(),
            total_added: self.total_added,
            dropped_cell_inserts: self.dropped_cell_inserts,
        }
    }

    // --- Transform mutation ---

    /// Move a collider to a new pose, re-bucketing it in the spatial hash
    pub fn set_pose(&mut self, id: ColliderId, pose: Pose) -> bool {
        let Some(slot) = self.slot_index(id) else {
            return false;
        };
        let Some(collider) = self.slots[slot].collider.as_mut() else {
            return false;
        };

        let aabb = compute_world_aabb(&collider.shape, pose);
        let old_range = self.hash.cells_overlapping(&collider.aabb);
        let new_range = self.hash.cells_overlapping(&aabb);
        collider.pose = pose;
        collider.aabb = aabb;

        if old_range != new_range {
            let key = slot as u32;
            remove_cells(&mut self.hash, old_range, key);
            self.dropped_cell_inserts += insert_cells(&mut self.hash, new_range, key);
        }
        true
    }

    pub fn set_position(&mut self, id: ColliderId, position: Vec2) -> bool {
        let Some(rotation) = self.rotation(id) else {
            return false;
        };
        self.set_pose(id, Pose::new(position, rotation))
    }

    pub fn set_rotation(&mut self, id: ColliderId, rotation: f32) -> bool {
        let Some(position) = self.position(id) else {
            return false;
        };
        self.set_pose(id, Pose::new(position, rotation))
    }

    // --- Field access (no broad-phase work) ---

    pub fn set_layer(&mut self, id: ColliderId, layer: u32) -> bool {
        let Some(collider) = self.collider_mut(id) else {
            return false;
        };
        collider.layer = layer;
        true
    }

    pub fn set_mask(&mut self, id: ColliderId, mask: u32) -> bool {
        let Some(collider) = self.collider_mut(id) else {
            return false;
        };
        collider.mask = mask;
        true
    }

    pub fn set_enabled(&mut self, id: ColliderId, enabled: bool) -> bool {
        let Some(collider) = self.collider_mut(id) else {
            return false;
        };
        collider.enabled = enabled;
        true
    }

    pub fn set_user_tag(&mut self, id: ColliderId, user_tag: u64) -> bool {
        let Some(collider) = self.collider_mut(id) else {
            return false;
        };
        collider.user_tag = user_tag;
        true
    }

    pub fn position(&self, id: ColliderId) -> Option<Vec2> {
        self.collider(id).map(Collider::position)
    }

    pub fn rotation(&self, id: ColliderId) -> Option<f32> {
        self.collider(id).map(Collider::rotation)
    }

    pub fn pose(&self, id: ColliderId) -> Option<Pose> {
        self.collider(id).map(Collider::pose)
    }

    pub fn layer(&self, id: ColliderId) -> Option<u32> {
        self.collider(id).map(Collider::layer)
    }

    pub fn mask(&self, id: ColliderId) -> Option<u32> {
        self.collider(id).map(Collider::mask)
    }

    /// False for disabled and for stale ids
    pub fn is_enabled(&self, id: ColliderId) -> bool {
        self.collider(id).is_some_and(Collider::is_enabled)
    }

    pub fn user_tag(&self, id: ColliderId) -> Option<u64> {
        self.collider(id).map(Collider::user_tag)
    }

    /// Cached world bounds
    pub fn aabb(&self, id: ColliderId) -> Option<Aabb> {
        self.collider(id).map(Collider::aabb)
    }

    pub fn shape(&self, id: ColliderId) -> Option<&ShapeRef> {
        self.collider(id).map(Collider::shape)
    }
}
