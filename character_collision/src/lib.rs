//! Rapier-backed character controller built on `character_sweep`.
//!
//! [`RapierSweepQuery`] answers the resolver's sweeps against a
//! [`physics_rapier::PhysicsWorld`] and an [`ObstacleSet`];
//! [`CharacterController`] owns the volume and retries illegal climbs.
#![forbid(unsafe_code)]

mod controller;
mod obstacles;
mod profile;
mod sweep;

pub use controller::{CharacterController, CharacterMove};
pub use obstacles::{Obstacle, ObstacleSet, ObstacleShape};
pub use profile::{ClimbingMode, ControllerProfile, ProfileShape, ProfileValidation};
pub use sweep::{touched_collider, touched_id, ControllerFilters, RapierSweepQuery, SweepSettings};
