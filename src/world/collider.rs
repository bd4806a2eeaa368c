//! Collider ids, layer bits and the per-slot collider record

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::geom::{Aabb, Pose, ShapeRef};

/// Layer and mask bit helpers
pub struct Layers;

impl Layers {
    /// Matches nothing
    pub const NONE: u32 = 0;

    /// Matches everything
    pub const ALL: u32 = 0xFFFF_FFFF;

    /// Single layer bit
    #[inline]
    pub const fn bit(index: u32) -> u32 {
        1 << index
    }

    /// Mutual test: each side's mask must accept the other side's layer
    #[inline]
    pub fn should_collide(layer_a: u32, mask_a: u32, layer_b: u32, mask_b: u32) -> bool {
        (mask_a & layer_b) != 0 && (mask_b & layer_a) != 0
    }
}

/// Handle to a collider in a [`World`](super::World)
///
/// Carries the slot index plus the slot's generation at insertion time, so
/// an id kept past `remove` never resolves to a later collider in the same
/// slot. Generations are 32-bit and wrap back to 1, so an id can alias again
/// only after its slot has been reused 2^32 times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ColliderId {
    slot: u32,
    generation: u32,
}

impl ColliderId {
    /// Reserved invalid id
    pub const NONE: ColliderId = ColliderId {
        slot: u32::MAX,
        generation: 0,
    };

    pub(crate) fn new(slot: u32, generation: u32) -> Self {
        Self { slot, generation }
    }

    #[inline]
    pub fn slot(&self) -> u32 {
        self.slot
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.generation == 0
    }

    /// Packed form: generation in the high half, `slot + 1` in the low half.
    /// `NONE` packs to 0.
    pub fn to_bits(&self) -> u64 {
        if self.is_none() {
            return 0;
        }
        ((self.generation as u64) << 32) | (self.slot as u64 + 1)
    }

    pub fn from_bits(bits: u64) -> Self {
        let low = bits as u32;
        let generation = (bits >> 32) as u32;
        if low == 0 || generation == 0 {
            return Self::NONE;
        }
        Self {
            slot: low - 1,
            generation,
        }
    }
}

impl Default for ColliderId {
    fn default() -> Self {
        Self::NONE
    }
}

/// A shape placed in a world, with its filter bits and cached bounds
#[derive(Debug, Clone)]
pub struct Collider {
    pub(super) shape: ShapeRef,
    pub(super) pose: Pose,
    pub(super) layer: u32,
    pub(super) mask: u32,
    pub(super) enabled: bool,
    pub(super) user_tag: u64,
    pub(super) aabb: Aabb,
}

impl Collider {
    pub(super) fn new(shape: ShapeRef, pose: Pose, aabb: Aabb) -> Self {
        Self {
            shape,
            pose,
            layer: Layers::ALL,
            mask: Layers::ALL,
            enabled: true,
            user_tag: 0,
            aabb,
        }
    }

    #[inline]
    pub fn shape(&self) -> &ShapeRef {
        &self.shape
    }

    #[inline]
    pub fn pose(&self) -> Pose {
        self.pose
    }

    #[inline]
    pub fn position(&self) -> Vec2 {
        self.pose.position
    }

    #[inline]
    pub fn rotation(&self) -> f32 {
        self.pose.rotation
    }

    #[inline]
    pub fn layer(&self) -> u32 {
        self.layer
    }

    #[inline]
    pub fn mask(&self) -> u32 {
        self.mask
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn user_tag(&self) -> u64 {
        self.user_tag
    }

    /// World bounds for the current pose
    #[inline]
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// Whether `other` passes the mutual layer/mask test against this collider
    #[inline]
    pub fn accepts(&self, other: &Collider) -> bool {
        Layers::should_collide(self.layer, self.mask, other.layer, other.mask)
    }
}
