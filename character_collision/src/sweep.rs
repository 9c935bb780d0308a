//! Rapier-backed collide-and-slide engine with a per-step geometry cache.

use character_sweep::math::{extend, narrow};
use character_sweep::{
    slide_target, Extended, ExtendedBounds, GeometryQuery, ObstacleHandle, StepState, SweepPass,
    SweepRequest, SweptVolume, Touched, TouchedGeometryCache, VolumeShape,
};
use physics_rapier::{ColliderRole, PhysicsWorld};
use rapier3d::math::{Isometry, Point, Real, Vector};
use rapier3d::na::UnitQuaternion;
use rapier3d::parry::bounding_volume::Aabb;
use rapier3d::parry::query::{cast_shapes, ShapeCastOptions, ShapeCastStatus};
use rapier3d::parry::shape::{Capsule, Cuboid, Shape};
use rapier3d::prelude::{Collider, ColliderHandle, InteractionGroups, RigidBodyHandle};
use tracing::trace;

use crate::obstacles::ObstacleSet;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepSettings {
    /// Separation kept between the volume and anything it touches.
    pub contact_offset: Real,
    /// Scale applied to gathered bounds so later passes reuse the cache.
    pub volume_growth: Real,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            contact_offset: 0.02,
            volume_growth: 1.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerFilters {
    pub groups: Option<InteractionGroups>,
    /// Usually the controller's own proxy collider.
    pub exclude_collider: Option<ColliderHandle>,
    pub exclude_sensors: bool,
}

impl Default for ControllerFilters {
    fn default() -> Self {
        Self {
            groups: None,
            exclude_collider: None,
            exclude_sensors: true,
        }
    }
}

impl ControllerFilters {
    pub fn accepts(&self, handle: ColliderHandle, collider: &Collider) -> bool {
        if self.exclude_collider == Some(handle) {
            return false;
        }
        if self.exclude_sensors && collider.is_sensor() {
            return false;
        }
        self.groups
            .map_or(true, |groups| collider.collision_groups().test(groups))
    }
}

/// Packs a collider handle into the opaque id carried by [`Touched::Shape`].
pub fn touched_id(handle: ColliderHandle) -> u64 {
    let (index, generation) = handle.into_raw_parts();
    (u64::from(generation) << 32) | u64::from(index)
}

pub fn touched_collider(touched: Touched) -> Option<ColliderHandle> {
    match touched {
        Touched::Shape { shape, .. } => Some(ColliderHandle::from_raw_parts(
            (shape & u64::from(u32::MAX)) as u32,
            (shape >> 32) as u32,
        )),
        _ => None,
    }
}

fn actor_id(handle: RigidBodyHandle) -> u64 {
    let (index, generation) = handle.into_raw_parts();
    (u64::from(generation) << 32) | u64::from(index)
}

enum CastShape {
    Capsule(Capsule),
    Cuboid(Cuboid),
}

impl CastShape {
    fn of(volume: &SweptVolume) -> Self {
        match volume.shape {
            VolumeShape::Capsule { radius } => CastShape::Capsule(Capsule::new_y(
                (volume.half_height - radius).max(0.0),
                radius,
            )),
            VolumeShape::Box { half_extents } => CastShape::Cuboid(Cuboid::new(half_extents)),
        }
    }

    fn as_shape(&self) -> &dyn Shape {
        match self {
            CastShape::Capsule(capsule) => capsule,
            CastShape::Cuboid(cuboid) => cuboid,
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum HitTarget {
    Collider(ColliderHandle),
    Obstacle(ObstacleHandle),
}

#[derive(Clone, Copy, Debug)]
struct SweepHit {
    toi: Real,
    /// World-space outward normal of the touched geometry.
    normal: Vector<Real>,
    target: HitTarget,
}

/// Casts `shape` against `other` and returns the time of impact with the
/// world-space normal of `other`.
fn cast_against(
    pose: &Isometry<Real>,
    direction: &Vector<Real>,
    shape: &dyn Shape,
    other_pose: &Isometry<Real>,
    other: &dyn Shape,
    reach: Real,
) -> Option<(Real, Vector<Real>)> {
    let options = ShapeCastOptions::with_max_time_of_impact(reach);
    let hit = cast_shapes(
        pose,
        direction,
        shape,
        other_pose,
        &Vector::zeros(),
        other,
        options,
    )
    .ok()
    .flatten()?;
    let normal = match hit.status {
        ShapeCastStatus::Converged | ShapeCastStatus::OutOfIterations => {
            other_pose.rotation * hit.normal2.into_inner()
        }
        // Already overlapping: treat as a head-on block.
        _ => -direction,
    };
    Some((hit.time_of_impact, normal))
}

fn to_aabb(bounds: &ExtendedBounds) -> Aabb {
    Aabb::new(
        Point::from(narrow(&bounds.min.coords)),
        Point::from(narrow(&bounds.max.coords)),
    )
}

/// Query engine over a [`PhysicsWorld`] plus user obstacles.
///
/// One instance serves a single step: `prefetch` gathers candidates once and
/// the sweeps only test those, re-gathering when a sweep leaves the cache.
pub struct RapierSweepQuery<'w> {
    world: &'w PhysicsWorld,
    settings: SweepSettings,
    up: Vector<Real>,
    rotation: UnitQuaternion<Real>,
    cached_bounds: Option<ExtendedBounds>,
    colliders: Vec<ColliderHandle>,
    obstacles: Vec<ObstacleHandle>,
    gathers: u32,
}

impl<'w> RapierSweepQuery<'w> {
    pub fn new(world: &'w PhysicsWorld, settings: SweepSettings, up: Vector<Real>) -> Self {
        Self {
            world,
            settings,
            up,
            rotation: SweptVolume::orientation(&up),
            cached_bounds: None,
            colliders: Vec::new(),
            obstacles: Vec::new(),
            gathers: 0,
        }
    }

    pub fn gather_count(&self) -> u32 {
        self.gathers
    }

    pub fn cached_bounds(&self) -> Option<ExtendedBounds> {
        self.cached_bounds
    }

    pub fn cached_colliders(&self) -> &[ColliderHandle] {
        &self.colliders
    }

    pub fn cached_obstacles(&self) -> &[ObstacleHandle] {
        &self.obstacles
    }

    fn gather(
        &mut self,
        bounds: ExtendedBounds,
        obstacles: &ObstacleSet,
        filters: &ControllerFilters,
    ) {
        let aabb = to_aabb(&bounds);
        let world = self.world;
        let colliders = world.colliders();
        let mut found = Vec::new();
        world
            .query_pipeline()
            .colliders_with_aabb_intersecting_aabb(&aabb, |handle| {
                if let Some(collider) = colliders.get(*handle) {
                    if filters.accepts(*handle, collider) {
                        found.push(*handle);
                    }
                }
                true
            });
        found.sort_by_key(|handle| handle.into_raw_parts());
        self.colliders = found;
        self.obstacles = obstacles.intersecting(&aabb);
        self.cached_bounds = Some(bounds);
        self.gathers += 1;
        trace!(
            colliders = self.colliders.len(),
            obstacles = self.obstacles.len(),
            "touched geometry gathered"
        );
    }

    fn grown(&self, bounds: &ExtendedBounds) -> ExtendedBounds {
        bounds
            .scaled(Extended::from(self.settings.volume_growth))
            .inflated(Extended::from(self.settings.contact_offset))
    }

    fn ensure_cached(
        &mut self,
        volume: &SweptVolume,
        motion: &Vector<Real>,
        obstacles: &ObstacleSet,
        filters: &ControllerFilters,
    ) {
        let swept = volume.temporal_bounds(motion, &self.up);
        match self.cached_bounds {
            Some(cached) if cached.contains(&swept) => {}
            Some(cached) => {
                let bounds = cached.union(&self.grown(&swept));
                self.gather(bounds, obstacles, filters);
            }
            None => self.gather(self.grown(&swept), obstacles, filters),
        }
    }

    fn closest_hit(
        &self,
        volume: &SweptVolume,
        shape: &dyn Shape,
        direction: &Vector<Real>,
        reach: Real,
        obstacles: &ObstacleSet,
    ) -> Option<SweepHit> {
        let pose = Isometry::from_parts(narrow(&volume.center.coords).into(), self.rotation);
        let colliders = self.world.colliders();
        let collider_hits = self.colliders.iter().filter_map(|handle| {
            let collider = colliders.get(*handle)?;
            let (toi, normal) = cast_against(
                &pose,
                direction,
                shape,
                collider.position(),
                collider.shape(),
                reach,
            )?;
            Some(SweepHit {
                toi,
                normal,
                target: HitTarget::Collider(*handle),
            })
        });
        let obstacle_hits = self.obstacles.iter().filter_map(|handle| {
            let obstacle = obstacles.get(*handle)?;
            let (toi, normal) = obstacle.with_shape(|other| {
                cast_against(&pose, direction, shape, &obstacle.position, other, reach)
            })?;
            Some(SweepHit {
                toi,
                normal,
                target: HitTarget::Obstacle(*handle),
            })
        });
        collider_hits
            .chain(obstacle_hits)
            .min_by(|a, b| a.toi.total_cmp(&b.toi))
    }

    fn record_hit(
        &self,
        volume: &SweptVolume,
        hit: &SweepHit,
        pass: SweepPass,
        state: &mut StepState,
    ) {
        let handle = match hit.target {
            HitTarget::Obstacle(handle) => {
                state.mark_touching_obstacle();
                state.set_touched(Touched::Obstacle(handle));
                return;
            }
            HitTarget::Collider(handle) => handle,
        };
        let Some(collider) = self.world.collider(handle) else {
            return;
        };
        if ColliderRole::from_user_data(collider.user_data) == ColliderRole::Character {
            state.mark_touching_controller();
            return;
        }
        let height = volume.contact_height(&hit.normal, &self.up);
        match pass {
            SweepPass::Side | SweepPass::Sensor => state.record_side_contact(hit.normal, height),
            SweepPass::Down => {
                let top = collider
                    .compute_aabb()
                    .vertices()
                    .iter()
                    .map(|corner| Extended::from(corner.coords.dot(&self.up)))
                    .fold(Extended::NEG_INFINITY, Extended::max);
                state.record_down_contact(hit.normal, height, top);
            }
            SweepPass::Up => {}
        }
        state.set_touched(Touched::Shape {
            shape: touched_id(handle),
            actor: collider.parent().map(actor_id),
        });
    }
}

impl TouchedGeometryCache for RapierSweepQuery<'_> {
    type Obstacles = ObstacleSet;
    type Filters = ControllerFilters;

    fn prefetch(
        &mut self,
        bounds: &ExtendedBounds,
        obstacles: &ObstacleSet,
        filters: &ControllerFilters,
        _side_reference: &Vector<Real>,
    ) {
        if self
            .cached_bounds
            .is_some_and(|cached| cached.contains(bounds))
        {
            return;
        }
        self.gather(self.grown(bounds), obstacles, filters);
    }
}

impl GeometryQuery for RapierSweepQuery<'_> {
    fn sweep(
        &mut self,
        volume: &mut SweptVolume,
        request: &SweepRequest,
        obstacles: &ObstacleSet,
        filters: &ControllerFilters,
        state: &mut StepState,
    ) -> bool {
        let offset = self.settings.contact_offset;
        let shape = CastShape::of(volume);
        let mut target = volume.center + extend(&request.motion);
        let mut moved = false;
        for _ in 0..request.max_iterations {
            let delta = narrow(&(target - volume.center));
            let length = delta.norm();
            if length <= request.min_distance {
                break;
            }
            let Some(direction) = delta.try_normalize(Real::EPSILON) else {
                break;
            };
            // Stop dead instead of oscillating in sloped corners.
            if direction.dot(&request.motion) <= 0.0 {
                break;
            }
            moved = true;

            let reach = length + offset;
            self.ensure_cached(volume, &(direction * reach), obstacles, filters);
            let Some(hit) = self.closest_hit(volume, shape.as_shape(), &direction, reach, obstacles)
            else {
                volume.center = target;
                break;
            };
            volume.translate(&(direction * (hit.toi - offset).max(0.0)));
            state.record_contact();
            self.record_hit(volume, &hit, request.pass, state);
            if request.pass.is_probe() {
                break;
            }
            target = slide_target(
                &volume.center,
                &target,
                &direction,
                &hit.normal,
                state.normalize_response(),
            );
        }
        trace!(pass = ?request.pass, moved, contacts = state.contacts(), "sweep");
        moved
    }
}
