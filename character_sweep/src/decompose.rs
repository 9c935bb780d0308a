//! Motion decomposition into up, side and down components.

use rapier3d::math::{Real, Vector};

use crate::config::ControllerConfig;
use crate::math::{decompose, is_almost_zero};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DecomposedMotion {
    /// The undecomposed displacement requested for this step.
    pub raw: Vector<Real>,
    pub dir_dot_up: Real,
    pub up_vector: Vector<Real>,
    pub side_vector: Vector<Real>,
    pub down_vector: Vector<Real>,
    /// Step offset in effect for this call; the up pass may clamp it.
    pub step_offset: Real,
    /// The lateral component is numerically zero.
    pub side_is_zero: bool,
    /// No step offset was added to the up vector, so none is undone later.
    pub step_suppressed: bool,
    pub moving_up: bool,
}

/// Splits `displacement` against the configured up axis.
///
/// Moving up cancels auto-stepping unless the volume rides a platform that
/// moves up, and a numerically zero lateral motion never steps so objects
/// pushing into a standing character cannot lift it.
pub fn decompose_motion(
    displacement: &Vector<Real>,
    config: &ControllerConfig,
    standing_on_moving_up: bool,
) -> DecomposedMotion {
    let up = config.up();
    let dir_dot_up = displacement.dot(up);
    let moving_up = dir_dot_up > 0.0;
    let mut step_offset = config.step_offset;
    if moving_up && !standing_on_moving_up {
        step_offset = 0.0;
    }

    let (normal_part, tangent_part) = decompose(displacement, up);
    let (mut up_vector, down_vector) = if dir_dot_up <= 0.0 {
        (Vector::zeros(), normal_part)
    } else {
        (normal_part, Vector::zeros())
    };
    let side_vector = tangent_part;
    let side_is_zero = is_almost_zero(&side_vector);
    let step_suppressed = !standing_on_moving_up && side_is_zero;
    if !step_suppressed {
        up_vector += up * step_offset;
    }

    DecomposedMotion {
        raw: *displacement,
        dir_dot_up,
        up_vector,
        side_vector,
        down_vector,
        step_offset,
        side_is_zero,
        step_suppressed,
        moving_up,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ControllerConfig {
        ControllerConfig {
            step_offset: 0.3,
            ..Default::default()
        }
    }

    #[test]
    fn lateral_motion_gets_step_offset() {
        let motion = decompose_motion(&Vector::new(0.2, -0.1, 0.0), &config(), false);
        assert!(!motion.moving_up);
        assert_eq!(motion.side_vector, Vector::new(0.2, 0.0, 0.0));
        assert_eq!(motion.down_vector, Vector::new(0.0, -0.1, 0.0));
        assert_eq!(motion.up_vector, Vector::new(0.0, 0.3, 0.0));
        assert_eq!(motion.step_offset, 0.3);
    }

    #[test]
    fn jumping_cancels_step_offset() {
        let motion = decompose_motion(&Vector::new(0.2, 0.5, 0.0), &config(), false);
        assert!(motion.moving_up);
        assert_eq!(motion.step_offset, 0.0);
        assert_eq!(motion.up_vector, Vector::new(0.0, 0.5, 0.0));
        assert_eq!(motion.down_vector, Vector::zeros());
    }

    #[test]
    fn rising_platform_keeps_step_offset() {
        let motion = decompose_motion(&Vector::new(0.2, 0.5, 0.0), &config(), true);
        assert_eq!(motion.step_offset, 0.3);
        assert!((motion.up_vector.y - 0.8).abs() < 1.0e-6);
    }

    #[test]
    fn zero_side_motion_never_steps() {
        let motion = decompose_motion(&Vector::new(0.0, -0.2, 0.0), &config(), false);
        assert!(motion.side_is_zero);
        assert!(motion.step_suppressed);
        assert_eq!(motion.up_vector, Vector::zeros());
    }

    #[test]
    fn tilted_up_axis() {
        let up = Vector::new(1.0, 1.0, 0.0).normalize();
        let config = ControllerConfig {
            up_direction: rapier3d::na::Unit::new_normalize(up),
            ..config()
        };
        let motion = decompose_motion(&(-up * 2.0), &config, false);
        assert!(motion.side_is_zero);
        assert!((motion.down_vector + up * 2.0).norm() < 1.0e-5);
    }
}
