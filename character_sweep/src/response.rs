use rapier3d::math::{Real, Vector};

use crate::math::{decompose, extend, Extended, ExtendedPoint};

/// Collide-and-slide target after hitting a surface with outward `normal`.
///
/// The remaining distance to `target` is redirected along the surface
/// tangent of the motion `direction`. With `normalize` the tangent is
/// renormalized so the whole remaining distance is kept.
pub fn slide_target(
    current: &ExtendedPoint,
    target: &ExtendedPoint,
    direction: &Vector<Real>,
    normal: &Vector<Real>,
    normalize: bool,
) -> ExtendedPoint {
    let reflected = direction - normal * (2.0 * direction.dot(normal));
    let reflected = reflected.try_normalize(Real::EPSILON).unwrap_or(reflected);
    let (_, mut tangent) = decompose(&reflected, normal);
    if normalize {
        if let Some(unit) = tangent.try_normalize(Real::EPSILON) {
            tangent = unit;
        }
    }
    let amplitude: Extended = (target - current).norm();
    current + extend(&tangent) * amplitude
}
