//! collide2d demo
//!
//! Scatters a seeded population of mixed shapes, moves them around a walled
//! arena for a number of frames and runs every query family, logging
//! per-frame statistics.
//!
//! Usage: `collide2d-demo [world.json]` (log level via `RUST_LOG`)

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::f32::consts::TAU;

    use glam::Vec2;
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;
    use thiserror::Error;

    use collide2d::{
        Aabb, CapsuleAxis, ColliderId, ConfigError, Layers, Pose, Shape, ShapeError, ShapeRef,
        World, WorldConfig, WorldError,
    };

    const SEED: u64 = 0x00c0_111d;
    const BODY_COUNT: usize = 400;
    const FRAMES: u32 = 180;
    const DT: f32 = 1.0 / 60.0;
    const ARENA_HALF: f32 = 1200.0;
    const MAX_SPEED: f32 = 240.0;
    const REPORT_EVERY: u32 = 60;

    #[derive(Error, Debug)]
    pub enum DemoError {
        #[error(transparent)]
        Config(#[from] ConfigError),
        #[error(transparent)]
        World(#[from] WorldError),
        #[error(transparent)]
        Shape(#[from] ShapeError),
    }

    struct Body {
        id: ColliderId,
        radius: f32,
        vel: Vec2,
        spin: f32,
    }

    fn palette() -> Result<Vec<ShapeRef>, ShapeError> {
        Ok(vec![
            Shape::circle(12.0)?.shared(),
            Shape::aabb(16.0, 10.0)?.shared(),
            Shape::oriented_box(22.0, 6.0)?.shared(),
            Shape::capsule(8.0, 14.0, CapsuleAxis::Y)?.shared(),
            Shape::regular_polygon(6, 14.0)?.shared(),
            Shape::polygon(&[Vec2::new(0.0, 18.0), Vec2::new(-15.0, -9.0), Vec2::new(15.0, -9.0)])?
                .shared(),
        ])
    }

    fn scatter(world: &mut World, rng: &mut Pcg32) -> Result<Vec<Body>, DemoError> {
        let shapes = palette()?;
        let mut bodies = Vec::with_capacity(BODY_COUNT);
        for i in 0..BODY_COUNT.min(world.capacity() - world.len()) {
            let shape = shapes[i % shapes.len()].clone();
            let radius = shape.bounding_radius();
            let position = Vec2::new(
                rng.random_range(-ARENA_HALF..ARENA_HALF),
                rng.random_range(-ARENA_HALF..ARENA_HALF),
            );
            let id = world.add_with_rotation(shape, position, rng.random_range(0.0..TAU))?;
            world.set_layer(id, Layers::bit((i % 3) as u32));
            world.set_user_tag(id, i as u64);

            let heading = rng.random_range(0.0..TAU);
            bodies.push(Body {
                id,
                radius,
                vel: Vec2::from_angle(heading) * rng.random_range(20.0..MAX_SPEED),
                spin: rng.random_range(-2.0..2.0),
            });
        }
        Ok(bodies)
    }

    /// Integrate and bounce off the arena walls, keeping each body inside
    fn step(world: &mut World, bodies: &mut [Body]) {
        for body in bodies.iter_mut() {
            let Some(pose) = world.pose(body.id) else {
                continue;
            };
            let limit = ARENA_HALF - body.radius;
            let mut position = pose.position + body.vel * DT;
            if position.x.abs() > limit {
                body.vel.x = -body.vel.x;
                position.x = position.x.clamp(-limit, limit);
            }
            if position.y.abs() > limit {
                body.vel.y = -body.vel.y;
                position.y = position.y.clamp(-limit, limit);
            }
            world.set_pose(body.id, Pose::new(position, pose.rotation + body.spin * DT));
        }
    }

    #[derive(Default)]
    struct FrameReport {
        contact_pairs: usize,
        deepest: f32,
        ray_hits: usize,
        point_hits: usize,
        region_hits: usize,
        sweep_fraction: Option<f32>,
    }

    fn run_queries(world: &World, bodies: &[Body], rng: &mut Pcg32) -> FrameReport {
        let mut scratch = world.query_scratch();
        let mut report = FrameReport::default();

        // Each pair is reported from both sides; count it once
        for body in bodies {
            for hit in world.query_for_collider_with(&mut scratch, body.id) {
                if body.id < hit.id {
                    report.contact_pairs += 1;
                    report.deepest = report.deepest.max(hit.contact.depth);
                }
            }
        }

        for i in 0..16 {
            let dir = Vec2::from_angle(i as f32 * TAU / 16.0);
            report.ray_hits +=
                world.raycast_all_with(&mut scratch, Vec2::ZERO, dir, ARENA_HALF, Layers::ALL).len();
        }

        let probe = Vec2::new(
            rng.random_range(-ARENA_HALF..ARENA_HALF),
            rng.random_range(-ARENA_HALF..ARENA_HALF),
        );
        report.point_hits = world.point_query_with(&mut scratch, probe, Layers::ALL).len();

        let region = Aabb::from_center_half_extents(probe, Vec2::splat(200.0));
        report.region_hits = world
            .query_aabb_with(&mut scratch, region, Layers::bit(0) | Layers::bit(1))
            .len();

        if let Some(first) = bodies.first() {
            report.sweep_fraction = world
                .sweep_with(&mut scratch, first.id, first.vel)
                .map(|hit| hit.fraction);
        }
        report
    }

    pub fn run() -> Result<(), DemoError> {
        let config = match std::env::args().nth(1) {
            Some(path) => WorldConfig::load(path)?,
            None => WorldConfig::default(),
        };
        let mut world = World::new(config)?;
        let mut rng = Pcg32::seed_from_u64(SEED);

        let mut bodies = scatter(&mut world, &mut rng)?;
        log::info!(
            "Scattered {} colliders (seed {SEED:#x}): {:?}",
            world.len(),
            world.stats()
        );

        for frame in 1..=FRAMES {
            step(&mut world, &mut bodies);
            let report = run_queries(&world, &bodies, &mut rng);
            let level = if frame % REPORT_EVERY == 0 {
                log::Level::Info
            } else {
                log::Level::Debug
            };
            log::log!(
                level,
                "Frame {frame}: {} pairs (deepest {:.2}), {} ray hits, {} at probe, {} in region, sweep {:?}, {} cells",
                report.contact_pairs,
                report.deepest,
                report.ray_hits,
                report.point_hits,
                report.region_hits,
                report.sweep_fraction,
                world.stats().cells
            );
        }

        // Churn: drop a third of the bodies and refill the freed slots
        let removed: Vec<_> = bodies.iter().step_by(3).map(|b| b.id).collect();
        for &id in &removed {
            world.remove(id);
        }
        bodies.retain(|b| world.is_valid(b.id));
        let refill = scatter(&mut world, &mut rng)?;
        log::info!(
            "Removed {}, kept {}, re-added {}; stale ids resolve: {}",
            removed.len(),
            bodies.len(),
            refill.len(),
            removed.iter().any(|&id| world.is_valid(id))
        );
        log::info!("Final stats: {:?}", world.stats());
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("collide2d demo starting...");

    if let Err(e) = demo::run() {
        log::error!("Demo failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // Library-only on wasm; the demo needs a native logger
}
