//! Step driver: decomposition, prefetch, then up/side/down/recovery.

use rapier3d::math::{Real, Vector};
use tracing::trace;

use crate::config::ControllerConfig;
use crate::context::StepContext;
use crate::decompose::decompose_motion;
use crate::flags::{CollisionFlags, StepFlags};
use crate::math::Extended;
use crate::passes;
use crate::query::GeometryQuery;
use crate::state::{StepState, Touched};
use crate::volume::SweptVolume;

pub struct StepRequest<'a, O: ?Sized, F: ?Sized> {
    pub displacement: Vector<Real>,
    pub min_distance: Real,
    pub constrained_climbing: bool,
    pub standing_on_moving_up: bool,
    pub obstacles: &'a O,
    pub filters: &'a F,
}

/// How a step ended. Early exits still carry valid, partial collision flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepExit {
    Completed,
    /// Side contact above stepping range on a steep surface.
    IllegalClimb,
    /// The down pass settled on steep geometry taller than the step offset.
    NonWalkableSupport,
}

impl StepExit {
    pub fn is_early(self) -> bool {
        self != StepExit::Completed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassOutcome {
    Continue,
    Abort(StepExit),
}

impl PassOutcome {
    pub fn and_then(self, next: impl FnOnce() -> PassOutcome) -> PassOutcome {
        match self {
            PassOutcome::Continue => next(),
            abort => abort,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepOutcome {
    pub collisions: CollisionFlags,
    pub hit_non_walkable: bool,
    pub moving_up: bool,
    /// Entity touched by the down pass (or the recovery sweep).
    pub touched: Touched,
    pub exit: StepExit,
    pub flags: StepFlags,
    pub side_normal: Option<Vector<Real>>,
    pub down_normal: Option<Vector<Real>>,
}

/// Resolves one requested displacement, moving `volume` in place.
pub fn resolve_step<Q: GeometryQuery + ?Sized>(
    query: &mut Q,
    config: &ControllerConfig,
    volume: &mut SweptVolume,
    request: &StepRequest<'_, Q::Obstacles, Q::Filters>,
) -> StepOutcome {
    let up = *config.up();
    let motion = decompose_motion(
        &request.displacement,
        config,
        request.standing_on_moving_up,
    );
    let original_height = volume.height_along(&up);
    let original_bottom = original_height - Extended::from(volume.half_height);

    let mut state = StepState::new();
    state
        .flags_mut()
        .set(StepFlags::IS_MOVING_UP, motion.moving_up);

    // One query over the whole motion usually covers every pass.
    let bounds = volume.temporal_bounds(&request.displacement, &up);
    query.prefetch(
        &bounds,
        request.obstacles,
        request.filters,
        &motion.side_vector,
    );

    let mut ctx = StepContext {
        query,
        config,
        volume,
        obstacles: request.obstacles,
        filters: request.filters,
        min_distance: request.min_distance,
        constrained_climbing: request.constrained_climbing,
        motion,
        state,
        collisions: CollisionFlags::NONE,
        original_height,
        original_bottom,
    };

    let outcome = passes::up::run(&mut ctx)
        .and_then(|| passes::side::run(&mut ctx))
        .and_then(|| passes::down::run(&mut ctx))
        .and_then(|| passes::recovery::run(&mut ctx));
    let exit = match outcome {
        PassOutcome::Continue => StepExit::Completed,
        PassOutcome::Abort(exit) => exit,
    };

    let flags = ctx.state.flags();
    trace!(
        collisions = %ctx.collisions,
        ?exit,
        height = ctx.current_height(),
        "step resolved"
    );
    StepOutcome {
        collisions: ctx.collisions,
        hit_non_walkable: flags.contains(StepFlags::HIT_NON_WALKABLE),
        moving_up: flags.contains(StepFlags::IS_MOVING_UP),
        touched: ctx.state.touched(),
        exit,
        flags,
        side_normal: ctx.state.side_contact(),
        down_normal: ctx.state.down_contact(),
    }
}
