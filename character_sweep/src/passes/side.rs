use rapier3d::math::Real;
use tracing::trace;

use crate::context::StepContext;
use crate::flags::{CollisionFlags, StepFlags};
use crate::query::{GeometryQuery, SweepPass};
use crate::resolver::PassOutcome;

/// Lateral move, followed by the constrained-climbing sensor probe.
pub(crate) fn run<Q: GeometryQuery + ?Sized>(ctx: &mut StepContext<'_, Q>) -> PassOutcome {
    ctx.state
        .flags_mut()
        .remove(StepFlags::VALIDATE_TRIANGLE_SIDE);

    let side_vector = ctx.motion.side_vector;
    if ctx.sweep(
        side_vector,
        ctx.config.max_iterations,
        ctx.min_distance,
        SweepPass::Side,
    ) {
        ctx.collisions.insert(CollisionFlags::SIDES);
    }

    if ctx.constrained_climbing
        && !ctx
            .state
            .flags()
            .contains(StepFlags::VALIDATE_TRIANGLE_SIDE)
    {
        if let Some(radius) = ctx.volume.shape.probe_radius() {
            sensor_probe(ctx, radius);
        }
    }
    PassOutcome::Continue
}

/// Looks one capsule radius ahead when the requested motion is shorter.
///
/// Only the cached side contact survives; the volume is always restored.
fn sensor_probe<Q: GeometryQuery + ?Sized>(ctx: &mut StepContext<'_, Q>, radius: Real) {
    let side_vector = ctx.motion.side_vector;
    if side_vector.norm() >= radius {
        return;
    }
    let Some(direction) = side_vector.try_normalize(Real::EPSILON) else {
        return;
    };

    ctx.state
        .flags_mut()
        .remove(StepFlags::VALIDATE_TRIANGLE_SIDE);
    let saved = ctx.volume.center;
    ctx.sweep(direction * radius, 1, ctx.min_distance, SweepPass::Sensor);
    ctx.volume.center = saved;
    trace!(
        validated = ctx.state.side_contact().is_some(),
        "sensor probe"
    );
}
