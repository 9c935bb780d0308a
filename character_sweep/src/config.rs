use rapier3d::math::{Real, UnitVector, Vector};
use serde::{Deserialize, Serialize};

/// Iteration count for collide-and-slide passes; 1 means collide-and-stop.
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonWalkableMode {
    /// Steep surfaces cannot be climbed; the character stays where it stops.
    #[default]
    PreventClimbing,
    /// Steep surfaces cannot be climbed and the character slides down them.
    PreventClimbingAndForceSliding,
}

/// Per-controller settings read by every step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControllerConfig {
    /// Maximum ledge height climbed automatically.
    pub step_offset: Real,
    /// Cosine of the maximum walkable slope angle.
    pub slope_limit: Real,
    pub up_direction: UnitVector<Real>,
    pub non_walkable_mode: NonWalkableMode,
    pub handle_slope: bool,
    pub prevent_vertical_sliding_against_ceiling: bool,
    pub walk_experiment: bool,
    pub max_iterations: u32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            step_offset: 0.5,
            slope_limit: 45.0_f32.to_radians().cos(),
            up_direction: Vector::y_axis(),
            non_walkable_mode: NonWalkableMode::PreventClimbing,
            handle_slope: true,
            prevent_vertical_sliding_against_ceiling: false,
            walk_experiment: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl ControllerConfig {
    pub fn with_slope_angle(mut self, radians: Real) -> Self {
        self.slope_limit = radians.cos();
        self
    }

    pub fn slope_angle(&self) -> Real {
        self.slope_limit.clamp(-1.0, 1.0).acos()
    }

    pub fn up(&self) -> &Vector<Real> {
        self.up_direction.as_ref()
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.step_offset.is_finite() || self.step_offset < 0.0 {
            return Err(format!(
                "step_offset must be finite and >= 0 (got {})",
                self.step_offset
            ));
        }
        if !self.slope_limit.is_finite() || !(0.0..=1.0).contains(&self.slope_limit) {
            return Err(format!(
                "slope_limit must be a cosine in [0, 1] (got {})",
                self.slope_limit
            ));
        }
        let up = self.up();
        if !up.iter().all(|component| component.is_finite())
            || (up.norm_squared() - 1.0).abs() > 1.0e-3
        {
            return Err("up_direction must be a finite unit vector".to_string());
        }
        if self.max_iterations == 0 {
            return Err("max_iterations must be > 0".to_string());
        }
        Ok(())
    }
}
