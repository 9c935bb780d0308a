//! Character controller facade: owns the swept volume and drives each step.

use character_sweep::math::{decompose, narrow};
use character_sweep::{
    resolve_step, CollisionFlags, ControllerConfig, ExtendedPoint, NonWalkableMode, StepExit,
    StepOutcome, StepRequest, SweptVolume, Touched,
};
use physics_rapier::PhysicsWorld;
use rapier3d::math::{Real, Vector};
use tracing::{debug, warn};

use crate::obstacles::ObstacleSet;
use crate::profile::{ClimbingMode, ControllerProfile};
use crate::sweep::{touched_collider, ControllerFilters, RapierSweepQuery, SweepSettings};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CharacterMove {
    pub flags: CollisionFlags,
    pub position: ExtendedPoint,
    /// Actual motion this step, from the starting center.
    pub translation: Vector<Real>,
    pub hit_non_walkable: bool,
    pub touched: Touched,
    /// The step was replayed with the walk experiment enabled.
    pub retried: bool,
    pub exit: StepExit,
}

pub struct CharacterController {
    volume: SweptVolume,
    config: ControllerConfig,
    settings: SweepSettings,
    climbing_mode: ClimbingMode,
    filters: ControllerFilters,
    collision_flags: CollisionFlags,
    hit_non_walkable: bool,
    moving_up: bool,
    touched: Touched,
}

impl CharacterController {
    pub fn new(profile: &ControllerProfile, position: ExtendedPoint) -> Self {
        Self::from_parts(
            profile.volume(position),
            profile.controller_config(),
            profile.sweep_settings(),
            profile.climbing_mode,
        )
    }

    pub fn from_parts(
        volume: SweptVolume,
        config: ControllerConfig,
        settings: SweepSettings,
        climbing_mode: ClimbingMode,
    ) -> Self {
        Self {
            volume,
            config,
            settings,
            climbing_mode,
            filters: ControllerFilters::default(),
            collision_flags: CollisionFlags::NONE,
            hit_non_walkable: false,
            moving_up: false,
            touched: Touched::None,
        }
    }

    pub fn position(&self) -> ExtendedPoint {
        self.volume.center
    }

    /// Teleports the volume; no collision is performed.
    pub fn set_position(&mut self, position: ExtendedPoint) {
        self.volume.center = position;
    }

    pub fn foot_position(&self) -> ExtendedPoint {
        self.volume.foot_position(self.config.up())
    }

    pub fn volume(&self) -> &SweptVolume {
        &self.volume
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn filters(&self) -> &ControllerFilters {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: ControllerFilters) {
        self.filters = filters;
    }

    pub fn climbing_mode(&self) -> ClimbingMode {
        self.climbing_mode
    }

    pub fn set_climbing_mode(&mut self, mode: ClimbingMode) {
        self.climbing_mode = mode;
    }

    /// Ignores offsets that are negative or not finite.
    pub fn set_step_offset(&mut self, offset: Real) -> bool {
        if !offset.is_finite() || offset < 0.0 {
            warn!(offset, "rejected step offset");
            return false;
        }
        self.config.step_offset = offset;
        true
    }

    /// `slope_limit` is the cosine of the steepest walkable angle.
    pub fn set_slope_limit(&mut self, slope_limit: Real) -> bool {
        if !slope_limit.is_finite() || !(0.0..=1.0).contains(&slope_limit) {
            warn!(slope_limit, "rejected slope limit");
            return false;
        }
        self.config.slope_limit = slope_limit;
        true
    }

    pub fn collision_flags(&self) -> CollisionFlags {
        self.collision_flags
    }

    pub fn hit_non_walkable(&self) -> bool {
        self.hit_non_walkable
    }

    pub fn is_moving_up(&self) -> bool {
        self.moving_up
    }

    pub fn touched(&self) -> Touched {
        self.touched
    }

    /// Whether the last supporting collider rides a body moving along up.
    pub fn standing_on_moving_up(&self, world: &PhysicsWorld) -> bool {
        touched_collider(self.touched)
            .is_some_and(|handle| world.carrier_velocity(handle).dot(self.config.up()) > 0.0)
    }

    fn constrained_climbing(&self) -> bool {
        self.climbing_mode == ClimbingMode::Constrained && self.volume.shape.is_capsule()
    }

    pub fn move_character(
        &mut self,
        world: &PhysicsWorld,
        obstacles: &ObstacleSet,
        displacement: Vector<Real>,
        min_distance: Real,
    ) -> CharacterMove {
        let displacement = sanitize(displacement);
        let start = self.volume.center;
        let up = *self.config.up();
        let request = StepRequest {
            displacement,
            min_distance: min_distance.max(0.0),
            constrained_climbing: self.constrained_climbing(),
            standing_on_moving_up: self.standing_on_moving_up(world),
            obstacles,
            filters: &self.filters,
        };
        let mut query = RapierSweepQuery::new(world, self.settings, up);
        let mut outcome = resolve_step(&mut query, &self.config, &mut self.volume, &request);

        let retried = outcome.hit_non_walkable && !self.config.walk_experiment;
        if retried {
            let replay = match self.config.non_walkable_mode {
                NonWalkableMode::PreventClimbing => displacement,
                NonWalkableMode::PreventClimbingAndForceSliding => {
                    decompose(&displacement, &up).0
                }
            };
            debug!(exit = ?outcome.exit, ?replay, "retrying step with walk experiment");
            self.volume.center = start;
            let config = ControllerConfig {
                walk_experiment: true,
                ..self.config
            };
            let request = StepRequest {
                displacement: replay,
                ..request
            };
            let second = resolve_step(&mut query, &config, &mut self.volume, &request);
            outcome = StepOutcome {
                hit_non_walkable: true,
                ..second
            };
        }

        self.collision_flags = outcome.collisions;
        self.hit_non_walkable = outcome.hit_non_walkable;
        self.moving_up = outcome.moving_up;
        self.touched = outcome.touched;
        if outcome.exit.is_early() {
            debug!(exit = ?outcome.exit, "step ended early");
        }
        CharacterMove {
            flags: outcome.collisions,
            position: self.volume.center,
            translation: narrow(&(self.volume.center - start)),
            hit_non_walkable: outcome.hit_non_walkable,
            touched: outcome.touched,
            retried,
            exit: outcome.exit,
        }
    }
}

fn sanitize(displacement: Vector<Real>) -> Vector<Real> {
    if displacement.iter().all(|component| component.is_finite()) {
        return displacement;
    }
    warn!(?displacement, "non-finite displacement components zeroed");
    displacement.map(|component| if component.is_finite() { component } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use character_sweep::Extended;
    use rapier3d::na as nalgebra;
    use rapier3d::na::UnitQuaternion;
    use rapier3d::prelude::{vector, Collider, ColliderBuilder};

    const DT: Real = 1.0 / 60.0;

    fn floor() -> Collider {
        ColliderBuilder::cuboid(20.0, 0.1, 20.0)
            .translation(vector![0.0, -0.1, 0.0])
            .build()
    }

    /// Plate whose upper face rises at 60 degrees from x = 2.
    fn steep_ramp() -> Collider {
        let angle = 60.0_f32.to_radians();
        let along = vector![angle.cos(), angle.sin(), 0.0];
        let normal = vector![-angle.sin(), angle.cos(), 0.0];
        let center = vector![2.0, 0.0, 0.0] + along * 3.0 - normal * 0.1;
        ColliderBuilder::cuboid(3.0, 0.1, 2.0)
            .rotation(vector![0.0, 0.0, angle])
            .translation(center)
            .build()
    }

    fn scene(colliders: Vec<Collider>) -> PhysicsWorld {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0]);
        for collider in colliders {
            world.insert_static_collider(collider);
        }
        world.refresh_queries();
        world
    }

    fn resting(profile: &ControllerProfile) -> CharacterController {
        let height = Extended::from(profile.full_height() * 0.5 + profile.contact_offset);
        CharacterController::new(profile, ExtendedPoint::new(0.0, height, 0.0))
    }

    #[test]
    fn walks_on_flat_ground() {
        let world = scene(vec![floor()]);
        let profile = ControllerProfile::arena_default();
        let mut controller = resting(&profile);
        let start = controller.position();
        for _ in 0..10 {
            let step = controller.move_character(
                &world,
                &ObstacleSet::new(),
                vector![0.05, -0.1, 0.0],
                0.0,
            );
            assert!(step.flags.contains(CollisionFlags::DOWN));
            assert!(!step.hit_non_walkable);
        }
        let position = controller.position();
        assert!((position.x - 0.5).abs() < 1.0e-3);
        assert!((position.y - start.y).abs() < 1.0e-3);
        assert!(!controller.is_moving_up());
        assert!(touched_collider(controller.touched()).is_some());
    }

    #[test]
    fn zero_motion_keeps_position() {
        let world = scene(vec![floor()]);
        let mut controller = resting(&ControllerProfile::arena_default());
        let start = controller.position();
        for _ in 0..2 {
            let step = controller.move_character(&world, &ObstacleSet::new(), Vector::zeros(), 0.0);
            assert!(step.flags.is_empty());
            assert_eq!(step.position, start);
        }
    }

    #[test]
    fn non_finite_motion_is_zeroed() {
        let world = scene(vec![floor()]);
        let mut controller = resting(&ControllerProfile::arena_default());
        let start = controller.position();
        let step = controller.move_character(
            &world,
            &ObstacleSet::new(),
            vector![Real::NAN, 0.0, Real::INFINITY],
            0.0,
        );
        assert_eq!(step.position, start);
        assert_eq!(step.translation, Vector::zeros());
    }

    #[test]
    fn climbs_low_step() {
        let step_box = ColliderBuilder::cuboid(1.0, 0.15, 2.0)
            .translation(vector![2.0, 0.15, 0.0])
            .build();
        let world = scene(vec![floor(), step_box]);
        let profile = ControllerProfile::arena_default();
        let mut controller = resting(&profile);
        let start = controller.position();
        for _ in 0..20 {
            controller.move_character(&world, &ObstacleSet::new(), vector![0.1, -0.1, 0.0], 0.0);
        }
        let position = controller.position();
        assert!(position.x > 1.9, "x {}", position.x);
        assert!((position.y - (start.y + 0.3)).abs() < 0.01, "y {}", position.y);
        assert!(controller.collision_flags().contains(CollisionFlags::DOWN));
    }

    #[test]
    fn wall_blocks_and_reports_sides() {
        let wall = ColliderBuilder::cuboid(0.1, 2.0, 2.0)
            .translation(vector![1.5, 2.0, 0.0])
            .build();
        let world = scene(vec![floor(), wall]);
        let mut controller = resting(&ControllerProfile::arena_default());
        let mut sides = false;
        for _ in 0..20 {
            let step =
                controller.move_character(&world, &ObstacleSet::new(), vector![0.1, -0.1, 0.0], 0.0);
            sides |= step.flags.contains(CollisionFlags::SIDES);
        }
        assert!(sides);
        assert!(controller.position().x < 1.4 - 0.4 + 1.0e-3);
    }

    #[test]
    fn steep_ramp_triggers_walk_experiment() {
        let world = scene(vec![floor(), steep_ramp()]);
        let profile = ControllerProfile::arena_default();
        let mut controller = resting(&profile);
        let start = controller.position();
        let mut retried = false;
        for _ in 0..30 {
            let step =
                controller.move_character(&world, &ObstacleSet::new(), vector![0.1, -0.1, 0.0], 0.0);
            retried |= step.retried;
            if step.retried {
                assert!(step.hit_non_walkable);
                assert!(controller.hit_non_walkable());
            }
        }
        assert!(retried);
        assert!(controller.position().y < start.y + 0.3, "y {}", controller.position().y);
    }

    #[test]
    fn constrained_climbing_stops_at_ramp_foot() {
        let world = scene(vec![floor(), steep_ramp()]);
        let profile = ControllerProfile::rpg_default();
        let mut controller = resting(&profile);
        let start = controller.position();
        for _ in 0..30 {
            controller.move_character(&world, &ObstacleSet::new(), vector![0.1, -0.1, 0.0], 0.0);
        }
        let position = controller.position();
        assert!(position.x < 1.9, "x {}", position.x);
        assert!(position.y < start.y + 0.3, "y {}", position.y);
    }

    #[test]
    fn obstacles_block_movement() {
        let world = scene(vec![floor()]);
        let mut obstacles = ObstacleSet::new();
        let handle = obstacles.add_box(
            vector![1.5, 1.0, 0.0],
            UnitQuaternion::identity(),
            vector![0.1, 1.0, 1.0],
        );
        let mut controller = resting(&ControllerProfile::arena_default());
        for _ in 0..20 {
            controller.move_character(&world, &obstacles, vector![0.1, 0.0, 0.0], 0.0);
        }
        assert!(controller.position().x < 1.0 + 1.0e-3);
        assert!(obstacles.remove(handle).is_some());
        for _ in 0..5 {
            controller.move_character(&world, &obstacles, vector![0.1, 0.0, 0.0], 0.0);
        }
        assert!(controller.position().x > 1.2);
    }

    #[test]
    fn rising_platform_is_detected() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0]);
        world.insert_kinematic_platform(
            ColliderBuilder::cuboid(2.0, 0.1, 2.0).build(),
            vector![0.0, -0.1, 0.0],
            vector![0.0, 1.0, 0.0],
        );
        world.refresh_queries();
        let mut controller = resting(&ControllerProfile::arena_default());
        assert!(!controller.standing_on_moving_up(&world));
        let step = controller.move_character(&world, &ObstacleSet::new(), vector![0.0, -0.1, 0.0], 0.0);
        assert!(step.flags.contains(CollisionFlags::DOWN));
        assert!(controller.standing_on_moving_up(&world));

        world.step(DT);
        let jump = controller.move_character(&world, &ObstacleSet::new(), vector![0.0, 0.2, 0.0], 0.0);
        assert!(controller.is_moving_up());
        assert!(!jump.flags.contains(CollisionFlags::DOWN));
    }

    #[test]
    fn static_floor_is_not_moving_up() {
        let world = scene(vec![floor()]);
        let mut controller = resting(&ControllerProfile::arena_default());
        controller.move_character(&world, &ObstacleSet::new(), vector![0.0, -0.1, 0.0], 0.0);
        assert!(touched_collider(controller.touched()).is_some());
        assert!(!controller.standing_on_moving_up(&world));
    }

    #[test]
    fn setters_reject_invalid_values() {
        let mut controller = resting(&ControllerProfile::arena_default());
        assert!(!controller.set_step_offset(-1.0));
        assert!(controller.set_step_offset(0.25));
        assert_eq!(controller.config().step_offset, 0.25);
        assert!(!controller.set_slope_limit(1.5));
        assert!(controller.set_slope_limit(0.5));
        assert_eq!(controller.config().slope_limit, 0.5);
    }

    #[test]
    fn foot_position_sits_below_center() {
        let profile = ControllerProfile::arena_default();
        let controller = resting(&profile);
        let foot = controller.foot_position();
        assert!((foot.y - Extended::from(profile.contact_offset)).abs() < 1.0e-6);
    }
}
