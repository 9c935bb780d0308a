//! User obstacles: shapes the controller collides with that live outside
//! the rapier world.

use std::collections::HashMap;

use character_sweep::ObstacleHandle;
use rapier3d::math::{Isometry, Real, Vector};
use rapier3d::na::UnitQuaternion;
use rapier3d::parry::bounding_volume::{Aabb, BoundingVolume};
use rapier3d::parry::shape::{Capsule, Cuboid, Shape};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ObstacleShape {
    Box { half_extents: Vector<Real> },
    /// Capsule along the obstacle's local y axis.
    Capsule { radius: Real, half_height: Real },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obstacle {
    pub shape: ObstacleShape,
    pub position: Isometry<Real>,
}

impl Obstacle {
    pub(crate) fn with_shape<R>(&self, f: impl FnOnce(&dyn Shape) -> R) -> R {
        match self.shape {
            ObstacleShape::Box { half_extents } => f(&Cuboid::new(half_extents)),
            ObstacleShape::Capsule {
                radius,
                half_height,
            } => f(&Capsule::new_y(half_height, radius)),
        }
    }

    pub fn aabb(&self) -> Aabb {
        self.with_shape(|shape| shape.compute_aabb(&self.position))
    }
}

#[derive(Clone, Debug, Default)]
pub struct ObstacleSet {
    obstacles: HashMap<ObstacleHandle, Obstacle>,
    next_id: u32,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    pub fn add_box(
        &mut self,
        translation: Vector<Real>,
        rotation: UnitQuaternion<Real>,
        half_extents: Vector<Real>,
    ) -> ObstacleHandle {
        self.insert(Obstacle {
            shape: ObstacleShape::Box { half_extents },
            position: Isometry::from_parts(translation.into(), rotation),
        })
    }

    /// `height` is the distance between the sphere centers.
    pub fn add_capsule(
        &mut self,
        translation: Vector<Real>,
        rotation: UnitQuaternion<Real>,
        radius: Real,
        height: Real,
    ) -> ObstacleHandle {
        self.insert(Obstacle {
            shape: ObstacleShape::Capsule {
                radius,
                half_height: height * 0.5,
            },
            position: Isometry::from_parts(translation.into(), rotation),
        })
    }

    pub fn remove(&mut self, handle: ObstacleHandle) -> Option<Obstacle> {
        self.obstacles.remove(&handle)
    }

    /// Returns false for stale handles.
    pub fn set_position(&mut self, handle: ObstacleHandle, position: Isometry<Real>) -> bool {
        match self.obstacles.get_mut(&handle) {
            Some(obstacle) => {
                obstacle.position = position;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, handle: ObstacleHandle) -> Option<&Obstacle> {
        self.obstacles.get(&handle)
    }

    /// Obstacles whose bounds intersect `aabb`, in insertion order.
    pub fn intersecting(&self, aabb: &Aabb) -> Vec<ObstacleHandle> {
        let mut handles: Vec<ObstacleHandle> = self
            .obstacles
            .iter()
            .filter(|(_, obstacle)| obstacle.aabb().intersects(aabb))
            .map(|(handle, _)| *handle)
            .collect();
        handles.sort_by_key(|handle| handle.0);
        handles
    }

    fn insert(&mut self, obstacle: Obstacle) -> ObstacleHandle {
        let handle = ObstacleHandle(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.obstacles.insert(handle, obstacle);
        handle
    }
}
