use tracing::debug;

use crate::config::{ControllerConfig, NonWalkableMode};
use crate::context::StepContext;
use crate::flags::{CollisionFlags, StepFlags};
use crate::math::{is_non_walkable, Extended};
use crate::query::{GeometryQuery, SweepPass};
use crate::resolver::{PassOutcome, StepExit};
use crate::state::Touched;

/// Forced sliding in walk-experiment mode needs the full iteration budget.
pub(crate) fn max_iterations_down(config: &ControllerConfig) -> u32 {
    if config.walk_experiment
        && config.non_walkable_mode == NonWalkableMode::PreventClimbingAndForceSliding
    {
        config.max_iterations
    } else {
        1
    }
}

/// Undoes the artificial climb and settles onto support.
pub(crate) fn run<Q: GeometryQuery + ?Sized>(ctx: &mut StepContext<'_, Q>) -> PassOutcome {
    let up = ctx.up();
    let mut down_vector = ctx.motion.down_vector;
    if !ctx.motion.step_suppressed {
        down_vector -= up * ctx.motion.step_offset;
    }

    ctx.state
        .flags_mut()
        .remove(StepFlags::VALIDATE_TRIANGLE_DOWN);
    ctx.state.set_touched(Touched::None);

    let max_iterations = max_iterations_down(ctx.config);
    if !ctx.sweep(down_vector, max_iterations, ctx.min_distance, SweepPass::Down) {
        return PassOutcome::Continue;
    }

    // A jump that grazes something below is not a landing.
    if ctx.motion.dir_dot_up <= 0.0 {
        ctx.collisions.insert(CollisionFlags::DOWN);
    }

    if !ctx.config.handle_slope || ctx.state.touching_controller_or_obstacle() {
        return PassOutcome::Continue;
    }
    let Some(side_normal) = ctx.state.side_contact() else {
        return PassOutcome::Continue;
    };
    if !is_non_walkable(&side_normal, &up, ctx.config.slope_limit) || !ctx.constrained_climbing {
        return PassOutcome::Continue;
    }
    let climb_limit = ctx.original_bottom + Extended::from(ctx.motion.step_offset);
    if ctx.state.contact_height() > climb_limit {
        ctx.state.flags_mut().insert(StepFlags::HIT_NON_WALKABLE);
        if !ctx.config.walk_experiment {
            debug!(
                contact_height = ctx.state.contact_height(),
                climb_limit, "illegal climb rejected"
            );
            return PassOutcome::Abort(StepExit::IllegalClimb);
        }
    }
    PassOutcome::Continue
}
