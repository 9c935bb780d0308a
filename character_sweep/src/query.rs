//! Seams to the collision backend.
//!
//! The resolver never touches geometry directly: it asks a
//! [`TouchedGeometryCache`] to gather candidates once per step and a
//! [`GeometryQuery`] to advance the volume for each pass.

use rapier3d::math::{Real, Vector};

use crate::state::{CacheSlot, StepState};
use crate::volume::{ExtendedBounds, SweptVolume};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SweepPass {
    Up,
    Side,
    /// Exploratory side sweep whose motion is discarded by the resolver.
    Sensor,
    Down,
}

impl SweepPass {
    pub fn cache_slot(self) -> CacheSlot {
        match self {
            SweepPass::Up => CacheSlot::Up,
            SweepPass::Side | SweepPass::Sensor => CacheSlot::Side,
            SweepPass::Down => CacheSlot::Down,
        }
    }

    pub fn is_probe(self) -> bool {
        self == SweepPass::Sensor
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepRequest {
    pub motion: Vector<Real>,
    /// Lateral motion of the whole step, shared by every pass.
    pub side_reference: Vector<Real>,
    pub max_iterations: u32,
    /// Remaining motion at or below this length ends the sweep.
    pub min_distance: Real,
    pub pass: SweepPass,
}

pub trait TouchedGeometryCache {
    type Obstacles: ?Sized;
    type Filters: ?Sized;

    /// Gathers candidate geometry for the whole step inside `bounds`.
    fn prefetch(
        &mut self,
        bounds: &ExtendedBounds,
        obstacles: &Self::Obstacles,
        filters: &Self::Filters,
        side_reference: &Vector<Real>,
    );
}

pub trait GeometryQuery: TouchedGeometryCache {
    /// Advances `volume.center` along `request.motion` up to contact.
    ///
    /// Implementations bump `state.record_contact` once per contact, cache
    /// world-geometry contacts in the slot selected by `request.pass`, and
    /// report the touched entity. Returns whether any sweep iteration ran.
    fn sweep(
        &mut self,
        volume: &mut SweptVolume,
        request: &SweepRequest,
        obstacles: &Self::Obstacles,
        filters: &Self::Filters,
        state: &mut StepState,
    ) -> bool;
}
