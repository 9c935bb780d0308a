//! Rapier world setup shared by the character controller and tools.
#![forbid(unsafe_code)]

use rapier3d::prelude::*;

/// What a collider stands for, stored in its `user_data`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColliderRole {
    World,
    Character,
    Platform,
}

impl ColliderRole {
    const CHARACTER_TAG: u128 = 1;
    const PLATFORM_TAG: u128 = 2;

    pub fn from_user_data(user_data: u128) -> Self {
        match user_data {
            Self::CHARACTER_TAG => ColliderRole::Character,
            Self::PLATFORM_TAG => ColliderRole::Platform,
            _ => ColliderRole::World,
        }
    }

    pub fn user_data(self) -> u128 {
        match self {
            ColliderRole::World => 0,
            ColliderRole::Character => Self::CHARACTER_TAG,
            ColliderRole::Platform => Self::PLATFORM_TAG,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlatformHandles {
    pub body: RigidBodyHandle,
    pub collider: ColliderHandle,
}

pub struct PhysicsWorld {
    pub gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: BroadPhaseMultiSap,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    pub fn new(gravity: Vector<Real>) -> Self {
        Self {
            gravity,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: BroadPhaseMultiSap::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    pub fn bodies(&self) -> &RigidBodySet {
        &self.bodies
    }

    pub fn colliders(&self) -> &ColliderSet {
        &self.colliders
    }

    pub fn query_pipeline(&self) -> &QueryPipeline {
        &self.query_pipeline
    }

    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    pub fn role(&self, handle: ColliderHandle) -> Option<ColliderRole> {
        self.colliders
            .get(handle)
            .map(|collider| ColliderRole::from_user_data(collider.user_data))
    }

    /// Linear velocity of the body carrying `handle`, zero for static colliders.
    pub fn carrier_velocity(&self, handle: ColliderHandle) -> Vector<Real> {
        self.colliders
            .get(handle)
            .and_then(|collider| collider.parent())
            .and_then(|parent| self.bodies.get(parent))
            .map(|body| *body.linvel())
            .unwrap_or_else(Vector::zeros)
    }

    pub fn step(&mut self, dt: Real) {
        self.integration_parameters.dt = dt;
        let physics_hooks = ();
        let event_handler = ();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &physics_hooks,
            &event_handler,
        );
        self.query_pipeline.update(&self.colliders);
    }

    /// Makes colliders inserted or moved since the last step visible to queries.
    pub fn refresh_queries(&mut self) {
        self.query_pipeline.update(&self.colliders);
    }

    pub fn insert_static_collider(&mut self, mut collider: Collider) -> ColliderHandle {
        collider.user_data = ColliderRole::World.user_data();
        self.colliders.insert(collider)
    }

    /// Inserts the proxy other characters collide with.
    pub fn insert_character_collider(&mut self, mut collider: Collider) -> ColliderHandle {
        collider.user_data = ColliderRole::Character.user_data();
        self.colliders.insert(collider)
    }

    /// Inserts a velocity-driven kinematic body carrying `collider`.
    pub fn insert_kinematic_platform(
        &mut self,
        mut collider: Collider,
        translation: Vector<Real>,
        linvel: Vector<Real>,
    ) -> PlatformHandles {
        let body = RigidBodyBuilder::kinematic_velocity_based()
            .translation(translation)
            .linvel(linvel)
            .build();
        let body = self.bodies.insert(body);
        collider.user_data = ColliderRole::Platform.user_data();
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);
        PlatformHandles { body, collider }
    }

    pub fn remove_collider(&mut self, handle: ColliderHandle) -> Option<Collider> {
        self.colliders.remove(
            handle,
            &mut self.island_manager,
            &mut self.bodies,
            true,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_floor(world: &mut PhysicsWorld) -> ColliderHandle {
        let floor = ColliderBuilder::cuboid(5.0, 0.1, 5.0)
            .translation(vector![0.0, -0.1, 0.0])
            .build();
        world.insert_static_collider(floor)
    }

    #[test]
    fn roles_round_trip_through_user_data() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0]);
        let floor = build_floor(&mut world);
        let proxy = world.insert_character_collider(ColliderBuilder::capsule_y(0.5, 0.4).build());
        let platform = world.insert_kinematic_platform(
            ColliderBuilder::cuboid(1.0, 0.1, 1.0).build(),
            vector![3.0, 0.0, 0.0],
            vector![0.0, 1.0, 0.0],
        );
        assert_eq!(world.role(floor), Some(ColliderRole::World));
        assert_eq!(world.role(proxy), Some(ColliderRole::Character));
        assert_eq!(world.role(platform.collider), Some(ColliderRole::Platform));
        assert_eq!(ColliderRole::from_user_data(99), ColliderRole::World);
    }

    #[test]
    fn carrier_velocity_reads_parent_body() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0]);
        let floor = build_floor(&mut world);
        let platform = world.insert_kinematic_platform(
            ColliderBuilder::cuboid(1.0, 0.1, 1.0).build(),
            vector![3.0, 0.0, 0.0],
            vector![0.0, 1.5, 0.0],
        );
        assert_eq!(world.carrier_velocity(floor), Vector::zeros());
        assert_eq!(world.carrier_velocity(platform.collider), vector![0.0, 1.5, 0.0]);
    }

    #[test]
    fn kinematic_platform_moves_with_steps() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0]);
        let platform = world.insert_kinematic_platform(
            ColliderBuilder::cuboid(1.0, 0.1, 1.0).build(),
            vector![0.0, 0.0, 0.0],
            vector![0.0, 1.0, 0.0],
        );
        for _ in 0..30 {
            world.step(1.0 / 60.0);
        }
        let height = world
            .collider(platform.collider)
            .map(|collider| collider.translation().y)
            .unwrap_or_default();
        assert!((height - 0.5).abs() < 0.05, "height {height}");
    }

    #[test]
    fn refresh_exposes_new_colliders_to_queries() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0]);
        build_floor(&mut world);
        world.refresh_queries();
        let ray = Ray::new(point![0.0, 1.0, 0.0], vector![0.0, -1.0, 0.0]);
        let hit = world.query_pipeline().cast_ray(
            world.bodies(),
            world.colliders(),
            &ray,
            5.0,
            true,
            QueryFilter::default(),
        );
        assert!(hit.is_some_and(|(_, toi)| (toi - 1.0).abs() < 1.0e-4));
    }

    #[test]
    fn removed_colliders_disappear() {
        let mut world = PhysicsWorld::new(vector![0.0, -9.81, 0.0]);
        let floor = build_floor(&mut world);
        assert!(world.remove_collider(floor).is_some());
        assert!(world.collider(floor).is_none());
    }
}
