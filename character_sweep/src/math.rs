use rapier3d::math::{Real, Vector};
use rapier3d::na;

/// Scalar used for volume centers; large worlds need more than `f32`.
pub type Extended = f64;
pub type ExtendedPoint = na::Point3<Extended>;
pub type ExtendedVector = na::Vector3<Extended>;

/// Per-component tolerance used by [`is_almost_zero`].
///
/// Exact zero tests are unreliable once a displacement has been decomposed
/// against an arbitrary up axis, so near-zero residue counts as no motion.
pub const ALMOST_ZERO_TOLERANCE: Real = 1.0e-6;

pub fn is_almost_zero(vector: &Vector<Real>) -> bool {
    vector
        .iter()
        .all(|component| component.abs() <= ALMOST_ZERO_TOLERANCE)
}

/// Returns true when a contact normal is too steep to stand on.
///
/// `slope_limit` is the cosine of the maximum walkable angle. Normals facing
/// away from `up` (ceilings) are never classified as non-walkable.
pub fn is_non_walkable(normal: &Vector<Real>, up: &Vector<Real>, slope_limit: Real) -> bool {
    let dp = normal.dot(up);
    dp >= 0.0 && dp < slope_limit
}

/// Splits `vector` into its component along `axis` and the remainder.
pub fn decompose(vector: &Vector<Real>, axis: &Vector<Real>) -> (Vector<Real>, Vector<Real>) {
    let normal = axis * vector.dot(axis);
    (normal, vector - normal)
}

pub fn extend(vector: &Vector<Real>) -> ExtendedVector {
    vector.cast::<Extended>()
}

pub fn narrow(vector: &ExtendedVector) -> Vector<Real> {
    vector.cast::<Real>()
}

pub fn height_of(point: &ExtendedPoint, up: &Vector<Real>) -> Extended {
    point.coords.dot(&extend(up))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn almost_zero_tolerates_residue() {
        assert!(is_almost_zero(&Vector::new(1.0e-7, -5.0e-7, 0.0)));
        assert!(!is_almost_zero(&Vector::new(0.0, 0.0, 1.0e-4)));
    }

    #[test]
    fn ceilings_are_not_non_walkable() {
        let up = Vector::y();
        let limit = 45.0_f32.to_radians().cos();
        assert!(!is_non_walkable(&Vector::new(0.0, -1.0, 0.0), &up, limit));
        assert!(is_non_walkable(&Vector::new(1.0, 0.0, 0.0), &up, limit));
        assert!(!is_non_walkable(&up, &up, limit));
    }

    #[test]
    fn decompose_splits_against_axis() {
        let up = Vector::y();
        let (normal, tangent) = decompose(&Vector::new(1.0, -2.0, 3.0), &up);
        assert_eq!(normal, Vector::new(0.0, -2.0, 0.0));
        assert_eq!(tangent, Vector::new(1.0, 0.0, 3.0));
    }
}
