use rapier3d::math::Real;
use tracing::trace;

use crate::context::StepContext;
use crate::flags::CollisionFlags;
use crate::math::Extended;
use crate::query::{GeometryQuery, SweepPass};
use crate::resolver::PassOutcome;

/// Artificial climb (or genuine jump) ahead of the lateral move.
pub(crate) fn run<Q: GeometryQuery + ?Sized>(ctx: &mut StepContext<'_, Q>) -> PassOutcome {
    // Walk experiment bans assisted upward motion entirely.
    if ctx.config.walk_experiment {
        trace!("up pass skipped");
        return PassOutcome::Continue;
    }

    // A purely vertical move may slide along a ceiling to resolve fully.
    let max_iterations =
        if ctx.config.prevent_vertical_sliding_against_ceiling || !ctx.motion.side_is_zero {
            1
        } else {
            ctx.config.max_iterations
        };

    let up_vector = ctx.motion.up_vector;
    if ctx.sweep(up_vector, max_iterations, ctx.min_distance, SweepPass::Up) {
        ctx.collisions.insert(CollisionFlags::UP);
        // Never undo more height than was actually gained.
        let climbed = ctx.current_height() - ctx.original_height;
        if climbed < Extended::from(ctx.motion.step_offset) {
            ctx.motion.step_offset = climbed as Real;
        }
        trace!(
            climbed,
            step_offset = ctx.motion.step_offset,
            "up pass blocked"
        );
    }
    PassOutcome::Continue
}
