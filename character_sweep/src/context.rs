use rapier3d::math::{Real, Vector};

use crate::config::ControllerConfig;
use crate::decompose::DecomposedMotion;
use crate::flags::CollisionFlags;
use crate::math::Extended;
use crate::query::{GeometryQuery, SweepPass, SweepRequest};
use crate::state::StepState;
use crate::volume::SweptVolume;

/// Everything one `resolve_step` call threads through its passes.
pub(crate) struct StepContext<'a, Q: GeometryQuery + ?Sized> {
    pub query: &'a mut Q,
    pub config: &'a ControllerConfig,
    pub volume: &'a mut SweptVolume,
    pub obstacles: &'a Q::Obstacles,
    pub filters: &'a Q::Filters,
    pub min_distance: Real,
    pub constrained_climbing: bool,
    pub motion: DecomposedMotion,
    pub state: StepState,
    pub collisions: CollisionFlags,
    pub original_height: Extended,
    pub original_bottom: Extended,
}

impl<Q: GeometryQuery + ?Sized> StepContext<'_, Q> {
    pub fn up(&self) -> Vector<Real> {
        *self.config.up()
    }

    pub fn current_height(&self) -> Extended {
        self.volume.height_along(self.config.up())
    }

    /// Runs one sweep and reports whether it moved and hit something.
    pub fn sweep(
        &mut self,
        motion: Vector<Real>,
        max_iterations: u32,
        min_distance: Real,
        pass: SweepPass,
    ) -> bool {
        self.state.begin_sweep(pass.cache_slot());
        let request = SweepRequest {
            motion,
            side_reference: self.motion.side_vector,
            max_iterations,
            min_distance,
            pass,
        };
        let moved = self.query.sweep(
            self.volume,
            &request,
            self.obstacles,
            self.filters,
            &mut self.state,
        );
        moved && self.state.contacts() > 0
    }
}
