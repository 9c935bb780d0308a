use rapier3d::math::Real;
use tracing::debug;

use crate::context::StepContext;
use crate::flags::StepFlags;
use crate::math::{is_non_walkable, Extended};
use crate::query::{GeometryQuery, SweepPass};
use crate::resolver::{PassOutcome, StepExit};

/// Rejects or reverses a climb that ended on non-walkable support.
pub(crate) fn run<Q: GeometryQuery + ?Sized>(ctx: &mut StepContext<'_, Q>) -> PassOutcome {
    let config = ctx.config;
    if !config.handle_slope
        || ctx.state.touching_controller_or_obstacle()
        || ctx.motion.dir_dot_up > 0.0
    {
        return PassOutcome::Continue;
    }
    let Some(down_normal) = ctx.state.down_contact() else {
        return PassOutcome::Continue;
    };

    let up = ctx.up();
    let touched_height = ctx.state.touched_max_height() - ctx.original_bottom;
    if touched_height <= Extended::from(config.step_offset)
        || !is_non_walkable(&down_normal, &up, config.slope_limit)
    {
        return PassOutcome::Continue;
    }

    ctx.state.flags_mut().insert(StepFlags::HIT_NON_WALKABLE);
    if !config.walk_experiment {
        debug!(touched_height, "non-walkable support");
        return PassOutcome::Abort(StepExit::NonWalkableSupport);
    }

    // Sink back to at most the starting height.
    let climbed = (ctx.current_height() - ctx.original_height).max(0.0);
    let recover = climbed + Extended::from(ctx.motion.dir_dot_up.abs());
    let max_iterations = config.max_iterations.max(1);
    let min_distance = ctx
        .min_distance
        .min((recover / Extended::from(max_iterations)) as Real);

    ctx.state.flags_mut().insert(StepFlags::NORMALIZE_RESPONSE);
    ctx.sweep(
        -up * recover as Real,
        max_iterations,
        min_distance,
        SweepPass::Up,
    );
    ctx.state.flags_mut().remove(StepFlags::NORMALIZE_RESPONSE);
    debug!(recover, "walk experiment recovery");
    PassOutcome::Continue
}
