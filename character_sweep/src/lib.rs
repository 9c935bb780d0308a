//! Per-step motion resolution for swept-volume character controllers.
//!
//! A requested displacement is split into up, side and down components and
//! resolved with three sweeps through a [`GeometryQuery`] engine: an
//! artificial climb that provides auto-stepping, the lateral move, and a
//! settle pass that undoes the climb and classifies the support surface.
//! Illegal climbs on steep geometry are rejected or actively reversed.
#![forbid(unsafe_code)]

pub mod config;
mod context;
pub mod decompose;
pub mod flags;
pub mod math;
mod passes;
pub mod query;
pub mod resolver;
pub mod response;
pub mod state;
pub mod volume;

pub use config::{ControllerConfig, NonWalkableMode, DEFAULT_MAX_ITERATIONS};
pub use decompose::{decompose_motion, DecomposedMotion};
pub use flags::{CollisionFlags, StepFlags};
pub use math::{
    is_almost_zero, is_non_walkable, Extended, ExtendedPoint, ExtendedVector,
    ALMOST_ZERO_TOLERANCE,
};
pub use query::{GeometryQuery, SweepPass, SweepRequest, TouchedGeometryCache};
pub use resolver::{resolve_step, PassOutcome, StepExit, StepOutcome, StepRequest};
pub use response::slide_target;
pub use state::{CacheSlot, ObstacleHandle, StepState, Touched};
pub use volume::{ExtendedBounds, SweptVolume, VolumeShape};

#[cfg(test)]
mod test_support;
