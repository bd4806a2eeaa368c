//! Spatial queries
//!
//! Every query narrows candidates through the spatial hash, visits each
//! collider at most once, filters by enabled flag and layer bits, then runs
//! the geometry kernel. De-duplication state lives in a caller-owned
//! [`QueryScratch`]; the plain methods build a fresh one per call.

use std::ops::ControlFlow;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collider::{Collider, ColliderId};
use super::registry::World;
use super::spatial_hash::CellRange;
use crate::config::WorldConfig;
use crate::consts::{EPSILON, SWEEP_ITERATIONS};
use crate::geom::{
    Aabb, Contact, Pose, RayHit, Shape, compute_world_aabb, intersect, point_in_shape,
    raycast_shape,
};

/// Contact against a specific collider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderContact {
    pub id: ColliderId,
    pub contact: Contact,
}

/// Ray hit against a specific collider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderRayHit {
    pub id: ColliderId,
    pub hit: RayHit,
}

/// Result of a shape cast
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepHit {
    pub id: ColliderId,
    /// First path parameter found overlapping (0..=1)
    pub fraction: f32,
    /// Last path parameter found free of overlap
    pub safe_fraction: f32,
    /// Shape position at `safe_fraction`
    pub position: Vec2,
    pub normal: Vec2,
    pub depth: f32,
}

/// Per-query de-duplication buffer and result limit
///
/// Once `dedup_capacity` distinct colliders have been seen, further unseen
/// candidates are skipped; once `max_results` entries are produced the query
/// stops. Both truncations are silent apart from a trace log.
#[derive(Debug, Clone)]
pub struct QueryScratch {
    /// Per-slot stamp of the query that last saw it
    marks: Vec<u32>,
    stamp: u32,
    seen: usize,
    dedup_capacity: usize,
    max_results: usize,
}

impl QueryScratch {
    pub fn new(dedup_capacity: usize, max_results: usize) -> Self {
        Self {
            marks: Vec::new(),
            stamp: 0,
            seen: 0,
            dedup_capacity: dedup_capacity.max(1),
            max_results: max_results.max(1),
        }
    }

    pub fn from_config(config: &WorldConfig) -> Self {
        Self::new(config.dedup_capacity, config.max_query_results)
    }

    #[inline]
    pub fn dedup_capacity(&self) -> usize {
        self.dedup_capacity
    }

    #[inline]
    pub fn max_results(&self) -> usize {
        self.max_results
    }

    /// Reset for a new query over `slot_count` slots
    fn begin(&mut self, slot_count: usize) {
        if self.marks.len() < slot_count {
            self.marks.resize(slot_count, 0);
        }
        self.stamp = self.stamp.wrapping_add(1);
        if self.stamp == 0 {
            self.marks.fill(0);
            self.stamp = 1;
        }
        self.seen = 0;
    }

    /// True the first time `slot` shows up in the current query
    fn first_visit(&mut self, slot: usize) -> bool {
        if self.marks[slot] == self.stamp {
            return false;
        }
        if self.seen == self.dedup_capacity {
            log::trace!("Query de-dup buffer full ({}), candidate skipped", self.dedup_capacity);
            return false;
        }
        self.marks[slot] = self.stamp;
        self.seen += 1;
        true
    }
}

/// Push and report whether the result limit was reached
fn push_limited<T>(out: &mut Vec<T>, item: T, max_results: usize) -> ControlFlow<()> {
    out.push(item);
    if out.len() >= max_results {
        log::trace!("Query stopped at {max_results} results");
        ControlFlow::Break(())
    } else {
        ControlFlow::Continue(())
    }
}

impl World {
    /// Scratch sized from this world's config
    pub fn query_scratch(&self) -> QueryScratch {
        QueryScratch::from_config(&self.config)
    }

    /// Visit each live collider stored in `range` once
    fn for_each_candidate<F>(&self, scratch: &mut QueryScratch, range: CellRange, mut f: F)
    where
        F: FnMut(usize, &Collider) -> ControlFlow<()>,
    {
        scratch.begin(self.slots.len());
        let _ = self.hash.visit_range(range, |keys| {
            for &key in keys {
                let slot = key as usize;
                if !scratch.first_visit(slot) {
                    continue;
                }
                if let Some(collider) = self.slots.get(slot).and_then(|s| s.collider.as_ref()) {
                    f(slot, collider)?;
                }
            }
            ControlFlow::Continue(())
        });
    }

    /// Contacts between a placed shape and every accepted enabled collider
    fn contacts_against<A>(
        &self,
        scratch: &mut QueryScratch,
        shape: &Shape,
        pose: Pose,
        accept: A,
    ) -> Vec<ColliderContact>
    where
        A: Fn(usize, &Collider) -> bool,
    {
        let aabb = compute_world_aabb(shape, pose);
        let range = self.hash.cells_overlapping(&aabb);
        let max_results = scratch.max_results();
        let mut out = Vec::new();

        self.for_each_candidate(scratch, range, |slot, other| {
            if !other.enabled || !accept(slot, other) || !aabb.overlaps(&other.aabb) {
                return ControlFlow::Continue(());
            }
            match intersect(shape, pose, &other.shape, other.pose) {
                Some(contact) => push_limited(
                    &mut out,
                    ColliderContact {
                        id: self.id_at(slot),
                        contact,
                    },
                    max_results,
                ),
                None => ControlFlow::Continue(()),
            }
        });
        out
    }

    /// Direct narrow-phase test between two colliders, ignoring layers and
    /// enabled flags
    pub fn test(&self, a: ColliderId, b: ColliderId) -> Option<Contact> {
        let ca = self.collider(a)?;
        let cb = self.collider(b)?;
        intersect(&ca.shape, ca.pose, &cb.shape, cb.pose)
    }

    /// Everything overlapping a collider that passes the mutual layer test.
    /// Disabled or stale ids give no contacts.
    pub fn query_for_collider(&self, id: ColliderId) -> Vec<ColliderContact> {
        self.query_for_collider_with(&mut self.query_scratch(), id)
    }

    pub fn query_for_collider_with(
        &self,
        scratch: &mut QueryScratch,
        id: ColliderId,
    ) -> Vec<ColliderContact> {
        let Some(slot) = self.slot_index(id) else {
            return Vec::new();
        };
        let Some(collider) = self.slots[slot].collider.as_ref() else {
            return Vec::new();
        };
        if !collider.enabled {
            return Vec::new();
        }
        self.contacts_against(scratch, &collider.shape, collider.pose, |other_slot, other| {
            other_slot != slot && collider.accepts(other)
        })
    }

    /// Everything overlapping an unregistered shape whose layer is in
    /// `layer_mask`
    pub fn query_shape(&self, shape: &Shape, pose: Pose, layer_mask: u32) -> Vec<ColliderContact> {
        self.query_shape_with(&mut self.query_scratch(), shape, pose, layer_mask)
    }

    pub fn query_shape_with(
        &self,
        scratch: &mut QueryScratch,
        shape: &Shape,
        pose: Pose,
        layer_mask: u32,
    ) -> Vec<ColliderContact> {
        self.contacts_against(scratch, shape, pose, |_, other| layer_mask & other.layer != 0)
    }

    /// Colliders whose cached bounds overlap `aabb` (no narrow phase)
    pub fn query_aabb(&self, aabb: Aabb, layer_mask: u32) -> Vec<ColliderId> {
        self.query_aabb_with(&mut self.query_scratch(), aabb, layer_mask)
    }

    pub fn query_aabb_with(
        &self,
        scratch: &mut QueryScratch,
        aabb: Aabb,
        layer_mask: u32,
    ) -> Vec<ColliderId> {
        let range = self.hash.cells_overlapping(&aabb);
        let max_results = scratch.max_results();
        let mut out = Vec::new();
        self.for_each_candidate(scratch, range, |slot, other| {
            if other.enabled && layer_mask & other.layer != 0 && aabb.overlaps(&other.aabb) {
                push_limited(&mut out, self.id_at(slot), max_results)
            } else {
                ControlFlow::Continue(())
            }
        });
        out
    }

    /// Colliders containing `point`
    ///
    /// Only the point's own cell is visited: any collider containing the point
    /// has bounds touching that cell.
    pub fn point_query(&self, point: Vec2, layer_mask: u32) -> Vec<ColliderId> {
        self.point_query_with(&mut self.query_scratch(), point, layer_mask)
    }

    pub fn point_query_with(
        &self,
        scratch: &mut QueryScratch,
        point: Vec2,
        layer_mask: u32,
    ) -> Vec<ColliderId> {
        let (cx, cy) = self.hash.cell_of(point);
        let range = CellRange {
            min_x: cx,
            min_y: cy,
            max_x: cx,
            max_y: cy,
        };
        let max_results = scratch.max_results();
        let mut out = Vec::new();
        self.for_each_candidate(scratch, range, |slot, other| {
            if other.enabled
                && layer_mask & other.layer != 0
                && other.aabb.contains_point(point)
                && point_in_shape(&other.shape, other.pose, point)
            {
                push_limited(&mut out, self.id_at(slot), max_results)
            } else {
                ControlFlow::Continue(())
            }
        });
        out
    }

    /// Narrow-phase ray hits for every candidate along the ray
    fn ray_hits<F>(
        &self,
        scratch: &mut QueryScratch,
        origin: Vec2,
        dir: Vec2,
        max_distance: f32,
        layer_mask: u32,
        mut on_hit: F,
    ) where
        F: FnMut(ColliderRayHit),
    {
        if dir.length_squared() < EPSILON * EPSILON || max_distance.is_nan() || max_distance <= 0.0 {
            return;
        }
        // Infinite rays still get a finite bounding box
        let reach = max_distance.min(f32::MAX);
        let end = origin + dir.normalize() * reach;
        let range = self.hash.cells_overlapping(&Aabb::from_points([origin, end]));

        self.for_each_candidate(scratch, range, |slot, other| {
            if other.enabled && layer_mask & other.layer != 0 {
                if let Some(hit) = raycast_shape(&other.shape, other.pose, origin, dir, max_distance) {
                    on_hit(ColliderRayHit {
                        id: self.id_at(slot),
                        hit,
                    });
                }
            }
            ControlFlow::Continue(())
        });
    }

    /// Closest ray hit
    pub fn raycast(
        &self,
        origin: Vec2,
        dir: Vec2,
        max_distance: f32,
        layer_mask: u32,
    ) -> Option<ColliderRayHit> {
        self.raycast_with(&mut self.query_scratch(), origin, dir, max_distance, layer_mask)
    }

    pub fn raycast_with(
        &self,
        scratch: &mut QueryScratch,
        origin: Vec2,
        dir: Vec2,
        max_distance: f32,
        layer_mask: u32,
    ) -> Option<ColliderRayHit> {
        let mut best: Option<ColliderRayHit> = None;
        self.ray_hits(scratch, origin, dir, max_distance, layer_mask, |hit| {
            if best.is_none_or(|b| hit.hit.distance < b.hit.distance) {
                best = Some(hit);
            }
        });
        best
    }

    /// Every ray hit, nearest first, capped at the scratch's result limit
    pub fn raycast_all(
        &self,
        origin: Vec2,
        dir: Vec2,
        max_distance: f32,
        layer_mask: u32,
    ) -> Vec<ColliderRayHit> {
        self.raycast_all_with(&mut self.query_scratch(), origin, dir, max_distance, layer_mask)
    }

    pub fn raycast_all_with(
        &self,
        scratch: &mut QueryScratch,
        origin: Vec2,
        dir: Vec2,
        max_distance: f32,
        layer_mask: u32,
    ) -> Vec<ColliderRayHit> {
        let mut hits = Vec::new();
        self.ray_hits(scratch, origin, dir, max_distance, layer_mask, |hit| hits.push(hit));
        hits.sort_by(|a, b| a.hit.distance.total_cmp(&b.hit.distance));
        if hits.len() > scratch.max_results() {
            log::trace!("Raycast kept nearest {} of {} hits", scratch.max_results(), hits.len());
            hits.truncate(scratch.max_results());
        }
        hits
    }

    /// Move `shape` from `start` to `end` and report the first collider it
    /// runs into
    ///
    /// Overlap at the start reports fraction 0. The path is otherwise bisected
    /// a fixed number of times between the start and the end, which must be
    /// overlapping; obstacles passed through entirely are missed.
    pub fn shape_cast(
        &self,
        shape: &Shape,
        start: Vec2,
        end: Vec2,
        rotation: f32,
        layer_mask: u32,
    ) -> Option<SweepHit> {
        self.shape_cast_with(&mut self.query_scratch(), shape, start, end, rotation, layer_mask)
    }

    pub fn shape_cast_with(
        &self,
        scratch: &mut QueryScratch,
        shape: &Shape,
        start: Vec2,
        end: Vec2,
        rotation: f32,
        layer_mask: u32,
    ) -> Option<SweepHit> {
        self.cast(scratch, shape, start, end, rotation, |_, other| {
            layer_mask & other.layer != 0
        })
    }

    /// Shape cast of a collider's own shape by `delta`, filtered by its mask.
    /// The collider never hits itself.
    pub fn sweep(&self, id: ColliderId, delta: Vec2) -> Option<SweepHit> {
        self.sweep_with(&mut self.query_scratch(), id, delta)
    }

    pub fn sweep_with(
        &self,
        scratch: &mut QueryScratch,
        id: ColliderId,
        delta: Vec2,
    ) -> Option<SweepHit> {
        let slot = self.slot_index(id)?;
        let collider = self.slots[slot].collider.as_ref()?;
        if !collider.enabled {
            return None;
        }
        let mask = collider.mask;
        self.cast(
            scratch,
            &collider.shape,
            collider.pose.position,
            collider.pose.translated(delta).position,
            collider.pose.rotation,
            |other_slot, other| other_slot != slot && mask & other.layer != 0,
        )
    }

    fn cast<A>(
        &self,
        scratch: &mut QueryScratch,
        shape: &Shape,
        start: Vec2,
        end: Vec2,
        rotation: f32,
        accept: A,
    ) -> Option<SweepHit>
    where
        A: Fn(usize, &Collider) -> bool,
    {
        let mut deepest_at = |t: f32| {
            let pose = Pose::new(start.lerp(end, t), rotation);
            self.contacts_against(scratch, shape, pose, &accept)
                .into_iter()
                .max_by(|a, b| a.contact.depth.total_cmp(&b.contact.depth))
        };

        if let Some(hit) = deepest_at(0.0) {
            return Some(SweepHit {
                id: hit.id,
                fraction: 0.0,
                safe_fraction: 0.0,
                position: start,
                normal: hit.contact.normal,
                depth: hit.contact.depth,
            });
        }

        let mut best = deepest_at(1.0)?;
        let (mut lo, mut hi) = (0.0f32, 1.0f32);
        for _ in 0..SWEEP_ITERATIONS {
            let mid = 0.5 * (lo + hi);
            match deepest_at(mid) {
                Some(hit) => {
                    hi = mid;
                    best = hit;
                }
                None => lo = mid,
            }
        }

        log::trace!("Shape cast hit {:?} at {hi}", best.id);
        Some(SweepHit {
            id: best.id,
            fraction: hi,
            safe_fraction: lo,
            position: start.lerp(end, lo),
            normal: best.contact.normal,
            depth: best.contact.depth,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::ShapeRef;
    use crate::world::Layers;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    fn world() -> World {
        World::new(WorldConfig::default()).unwrap()
    }

    fn circle(radius: f32) -> ShapeRef {
        Shape::circle(radius).unwrap().shared()
    }

    fn square(half: f32) -> ShapeRef {
        Shape::aabb(half, half).unwrap().shared()
    }

    #[test]
    fn test_circle_against_box_reports_one_contact() {
        let mut world = world();
        let ball = world.add(circle(16.0), Vec2::new(100.0, 100.0)).unwrap();
        let block = world.add(square(16.0), Vec2::new(115.0, 100.0)).unwrap();

        let contacts = world.query_for_collider(ball);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, block);
        assert!(contacts[0].contact.normal.x < 0.0);
        assert!((contacts[0].contact.depth - 1.0).abs() < 0.001);

        // Seen from the box the normal flips
        let contacts = world.query_for_collider(block);
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].id, ball);
        assert!(contacts[0].contact.normal.x > 0.0);
    }

    #[test]
    fn test_query_aabb_matches_brute_force_on_grid() {
        let mut world = World::new(WorldConfig::with_max_colliders(10_000)).unwrap();
        let shape = circle(10.0);
        for i in 0..100 {
            for j in 0..100 {
                world
                    .add(shape.clone(), Vec2::new(i as f32 * 100.0, j as f32 * 100.0))
                    .unwrap();
            }
        }
        assert_eq!(world.len(), 10_000);

        let regions = [
            Aabb::new(Vec2::new(350.0, 350.0), Vec2::new(550.0, 550.0)),
            Aabb::new(Vec2::new(-100.0, -100.0), Vec2::new(100.0, 100.0)),
            Aabb::new(Vec2::new(4905.0, 7010.0), Vec2::new(5105.0, 7210.0)),
        ];
        for region in regions {
            let mut found = world.query_aabb(region, Layers::ALL);
            found.sort();
            let mut expected: Vec<_> = world
                .iter()
                .filter(|(_, c)| c.aabb().overlaps(&region))
                .map(|(id, _)| id)
                .collect();
            expected.sort();
            assert!(!expected.is_empty());
            assert_eq!(found, expected);
        }
    }

    #[test]
    fn test_raycast_hits_box_front_face() {
        let mut world = world();
        let target = world.add(square(20.0), Vec2::new(500.0, 0.0)).unwrap();

        let hit = world.raycast(Vec2::ZERO, Vec2::X, 1000.0, Layers::ALL).unwrap();
        assert_eq!(hit.id, target);
        assert!((hit.hit.distance - 480.0).abs() < 0.01);
        assert!((hit.hit.fraction - 0.48).abs() < 0.0001);
        assert!((hit.hit.normal - Vec2::NEG_X).length() < 0.001);

        // Out of reach, wrong direction, wrong layer
        assert!(world.raycast(Vec2::ZERO, Vec2::X, 400.0, Layers::ALL).is_none());
        assert!(world.raycast(Vec2::ZERO, Vec2::NEG_X, 1000.0, Layers::ALL).is_none());
        assert!(world.raycast(Vec2::ZERO, Vec2::X, 1000.0, Layers::NONE).is_none());
        // Unbounded rays still find it
        assert!(world.raycast(Vec2::ZERO, Vec2::X, f32::INFINITY, Layers::ALL).is_some());
    }

    #[test]
    fn test_raycast_all_sorted_and_consistent() {
        let mut world = world();
        let mut rng = Pcg32::seed_from_u64(42);
        for _ in 0..40 {
            let x = rng.random_range(50.0..2000.0);
            let y = rng.random_range(-30.0..30.0);
            let shape = if rng.random_bool(0.5) {
                circle(rng.random_range(5.0..25.0))
            } else {
                Shape::oriented_box(10.0, 20.0).unwrap().shared()
            };
            world
                .add_with_rotation(shape, Vec2::new(x, y), rng.random_range(0.0..3.0))
                .unwrap();
        }

        let all = world.raycast_all(Vec2::ZERO, Vec2::X, 2500.0, Layers::ALL);
        assert!(!all.is_empty());
        assert!(all.windows(2).all(|w| w[0].hit.distance <= w[1].hit.distance));

        let first = world.raycast(Vec2::ZERO, Vec2::X, 2500.0, Layers::ALL).unwrap();
        assert_eq!(first, all[0]);

        // Every id appears once
        let mut ids: Vec<_> = all.iter().map(|h| h.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), all.len());
    }

    #[test]
    fn test_layer_mask_filtering() {
        let mut world = world();
        let a = world.add(circle(10.0), Vec2::ZERO).unwrap();
        let b = world.add(circle(10.0), Vec2::new(5.0, 0.0)).unwrap();
        let c = world.add(circle(10.0), Vec2::new(-5.0, 0.0)).unwrap();

        // Defaults: everyone sees everyone
        assert_eq!(world.query_for_collider(a).len(), 2);

        // Mask zero matches nothing
        world.set_mask(a, Layers::NONE);
        assert!(world.query_for_collider(a).is_empty());
        // ...and the test is mutual, so nobody sees `a` either
        assert!(world.query_for_collider(b).iter().all(|c| c.id != a));

        world.set_layer(a, Layers::bit(0));
        world.set_mask(a, !Layers::bit(5));
        world.set_layer(b, Layers::bit(2));
        world.set_layer(c, Layers::bit(5));
        let seen: Vec<_> = world.query_for_collider(a).iter().map(|c| c.id).collect();
        assert_eq!(seen, vec![b]);

        // Layer filtered unregistered-shape and point queries
        let probe = Shape::circle(1.0).unwrap();
        let hits = world.query_shape(&probe, Pose::at(Vec2::ZERO), Layers::bit(2));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, b);
        assert!(world.query_shape(&probe, Pose::at(Vec2::ZERO), Layers::NONE).is_empty());
        assert_eq!(world.point_query(Vec2::new(1.0, 0.0), Layers::bit(2)), vec![b]);
        assert_eq!(world.point_query(Vec2::new(1.0, 0.0), Layers::ALL).len(), 3);
    }

    #[test]
    fn test_disabled_colliders_are_skipped() {
        let mut world = world();
        let a = world.add(circle(10.0), Vec2::ZERO).unwrap();
        let b = world.add(circle(10.0), Vec2::new(5.0, 0.0)).unwrap();

        world.set_enabled(b, false);
        assert!(world.query_for_collider(a).is_empty());
        assert!(world.point_query(Vec2::new(5.0, 0.0), Layers::ALL).iter().all(|&id| id != b));
        assert!(world.raycast(Vec2::new(30.0, 0.0), Vec2::NEG_X, 100.0, Layers::ALL).unwrap().id == a);
        // A disabled query collider sees nothing
        assert!(world.query_for_collider(b).is_empty());
        // The direct pair test ignores the flag
        assert!(world.test(a, b).is_some());
    }

    #[test]
    fn test_removed_ids_never_returned() {
        let mut world = world();
        let ids: Vec<_> = (0..20)
            .map(|i| world.add(square(8.0), Vec2::new(i as f32 * 10.0, 0.0)).unwrap())
            .collect();
        let victim = ids[7];
        let region = Aabb::new(Vec2::new(-50.0, -50.0), Vec2::new(300.0, 50.0));
        assert!(world.query_aabb(region, Layers::ALL).contains(&victim));

        assert!(world.remove(victim));
        assert!(!world.query_aabb(region, Layers::ALL).contains(&victim));
        assert!(!world.point_query(Vec2::new(70.0, 0.0), Layers::ALL).contains(&victim));
        assert!(world.query_for_collider(victim).is_empty());
        assert!(world.test(victim, ids[6]).is_none());

        // Re-adding into the same slot gives a fresh id, the old one stays dead
        let fresh = world.add(square(8.0), Vec2::new(70.0, 0.0)).unwrap();
        assert_eq!(fresh.slot(), victim.slot());
        let found = world.query_aabb(region, Layers::ALL);
        assert!(found.contains(&fresh));
        assert!(!found.contains(&victim));
    }

    #[test]
    fn test_point_query_with_rotated_and_polygon_shapes() {
        let mut world = world();
        let hexagon = world
            .add(Shape::regular_polygon(6, 28.0).unwrap().shared(), Vec2::new(200.0, 150.0))
            .unwrap();
        let bar = world
            .add_with_rotation(
                Shape::oriented_box(40.0, 2.0).unwrap().shared(),
                Vec2::new(-100.0, 0.0),
                std::f32::consts::FRAC_PI_2,
            )
            .unwrap();

        assert_eq!(world.point_query(Vec2::new(200.0, 150.0), Layers::ALL), vec![hexagon]);
        assert!(world.point_query(Vec2::new(240.0, 150.0), Layers::ALL).is_empty());
        assert_eq!(world.point_query(Vec2::new(-100.0, 35.0), Layers::ALL), vec![bar]);
        assert!(world.point_query(Vec2::new(-65.0, 0.0), Layers::ALL).is_empty());
    }

    #[test]
    fn test_result_limit_truncates() {
        let mut world = World::new(WorldConfig {
            max_query_results: 3,
            ..WorldConfig::default()
        })
        .unwrap();
        for i in 0..10 {
            world.add(circle(5.0), Vec2::new(i as f32, 0.0)).unwrap();
        }
        let region = Aabb::new(Vec2::splat(-20.0), Vec2::splat(20.0));
        assert_eq!(world.query_aabb(region, Layers::ALL).len(), 3);
        assert_eq!(world.raycast_all(Vec2::new(-50.0, 0.0), Vec2::X, 100.0, Layers::ALL).len(), 3);

        let mut roomy = QueryScratch::new(64, 64);
        assert_eq!(world.query_aabb_with(&mut roomy, region, Layers::ALL).len(), 10);
        // Scratch is reusable across queries
        assert_eq!(world.query_aabb_with(&mut roomy, region, Layers::ALL).len(), 10);

        // A tiny de-dup buffer skips candidates beyond its capacity
        let mut cramped = QueryScratch::new(4, 64);
        assert_eq!(cramped.dedup_capacity(), 4);
        assert_eq!(QueryScratch::new(0, 0).dedup_capacity(), 1);
        assert_eq!(world.query_aabb_with(&mut cramped, region, Layers::ALL).len(), 4);
    }

    #[test]
    fn test_shape_cast_converges_on_wall() {
        let mut world = world();
        let wall = world
            .add(Shape::aabb(5.0, 50.0).unwrap().shared(), Vec2::new(60.3, 0.0))
            .unwrap();
        let mover = Shape::aabb(5.0, 5.0).unwrap();

        let end = Vec2::new(60.0, 0.0);
        let hit = world
            .shape_cast(&mover, Vec2::ZERO, end, 0.0, Layers::ALL)
            .unwrap();
        assert_eq!(hit.id, wall);
        // Boxes first touch when the mover's centre reaches x = 50.3
        let step = 1.0 / 65536.0;
        assert!((hit.fraction - 50.3 / 60.0).abs() <= step + 1e-5);
        assert!(hit.safe_fraction < hit.fraction);
        assert!((hit.fraction - hit.safe_fraction - step).abs() < 1e-6);
        assert!(hit.position.x <= 50.3 + 1e-3);
        assert_eq!(hit.normal, Vec2::X);

        // Path that stops short of the wall
        assert!(world
            .shape_cast(&mover, Vec2::ZERO, Vec2::new(40.0, 0.0), 0.0, Layers::ALL)
            .is_none());
        // Filtered out by layer
        assert!(world
            .shape_cast(&mover, Vec2::ZERO, end, 0.0, Layers::NONE)
            .is_none());
    }

    #[test]
    fn test_shape_cast_starting_in_overlap() {
        let mut world = world();
        let blocker = world.add(circle(10.0), Vec2::ZERO).unwrap();
        let probe = Shape::circle(5.0).unwrap();
        let hit = world
            .shape_cast(&probe, Vec2::new(3.0, 0.0), Vec2::new(100.0, 0.0), 0.0, Layers::ALL)
            .unwrap();
        assert_eq!(hit.id, blocker);
        assert_eq!(hit.fraction, 0.0);
        assert_eq!(hit.safe_fraction, 0.0);
        assert_eq!(hit.position, Vec2::new(3.0, 0.0));
    }

    #[test]
    fn test_sweep_excludes_self_and_uses_mask() {
        let mut world = world();
        let mover = world.add(circle(5.0), Vec2::ZERO).unwrap();
        let wall = world.add(square(10.0), Vec2::new(100.0, 0.0)).unwrap();

        let delta = Vec2::new(100.0, 0.0);
        let hit = world.sweep(mover, delta).unwrap();
        assert_eq!(hit.id, wall);
        // Circle edge meets the box face at x = 90, centre at 85
        assert!((hit.fraction - 0.85).abs() < 0.001);
        // Circle vs box normals push the circle back out
        assert!(hit.normal.x < 0.0);
        // The mover itself was not moved
        assert_eq!(world.position(mover), Some(Vec2::ZERO));

        world.set_mask(mover, Layers::NONE);
        assert!(world.sweep(mover, delta).is_none());
        world.remove(mover);
        assert!(world.sweep(mover, delta).is_none());
    }

    #[test]
    fn test_scratch_reuse_across_many_queries() {
        let mut world = world();
        for i in 0..50 {
            world.add(circle(6.0), Vec2::new(i as f32 * 7.0, 0.0)).unwrap();
        }
        let mut scratch = world.query_scratch();
        for i in 0..50 {
            let id = world.iter().nth(i).map(|(id, _)| id).unwrap();
            let contacts = world.query_for_collider_with(&mut scratch, id);
            let fresh = world.query_for_collider(id);
            assert_eq!(contacts, fresh);
        }
    }
}
