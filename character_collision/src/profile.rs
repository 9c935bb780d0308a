//! TOML-loadable controller profiles.

use character_sweep::{
    ControllerConfig, ExtendedPoint, NonWalkableMode, SweptVolume, DEFAULT_MAX_ITERATIONS,
};
use rapier3d::math::{Real, UnitVector, Vector};
use serde::{Deserialize, Serialize};

use crate::sweep::SweepSettings;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProfileShape {
    /// `height` is the distance between the sphere centers.
    Capsule { radius: f32, height: f32 },
    Box { half_extents: [f32; 3] },
}

/// How hard the controller resists climbing steep geometry with its sides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimbingMode {
    #[default]
    Easy,
    /// Capsules probe one radius ahead and reject climbs above the step offset.
    Constrained,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerProfile {
    pub shape: ProfileShape,
    pub step_offset: f32,
    pub slope_limit_deg: f32,
    pub up: [f32; 3],
    pub non_walkable_mode: NonWalkableMode,
    pub climbing_mode: ClimbingMode,
    pub handle_slope: bool,
    pub prevent_vertical_sliding_against_ceiling: bool,
    pub walk_experiment: bool,
    pub max_iterations: u32,
    pub min_distance: f32,
    pub contact_offset: f32,
    pub volume_growth: f32,
}

impl Default for ControllerProfile {
    fn default() -> Self {
        Self::arena_default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ProfileValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ProfileValidation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ControllerProfile {
    pub fn arena_default() -> Self {
        Self {
            shape: ProfileShape::Capsule {
                radius: 0.4,
                height: 1.0,
            },
            step_offset: 0.45,
            slope_limit_deg: 45.0,
            up: [0.0, 1.0, 0.0],
            non_walkable_mode: NonWalkableMode::PreventClimbing,
            climbing_mode: ClimbingMode::Easy,
            handle_slope: true,
            prevent_vertical_sliding_against_ceiling: false,
            walk_experiment: false,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            min_distance: 0.0,
            contact_offset: 0.02,
            volume_growth: 1.5,
        }
    }

    pub fn rpg_default() -> Self {
        Self {
            shape: ProfileShape::Capsule {
                radius: 0.45,
                height: 0.8,
            },
            step_offset: 0.32,
            non_walkable_mode: NonWalkableMode::PreventClimbingAndForceSliding,
            climbing_mode: ClimbingMode::Constrained,
            contact_offset: 0.045,
            ..Self::arena_default()
        }
    }

    pub fn parse_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|err| err.to_string())
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|err| err.to_string())
    }

    pub fn validate(&self) -> ProfileValidation {
        let mut validation = ProfileValidation::default();
        match self.shape {
            ProfileShape::Capsule { radius, height } => {
                if !radius.is_finite() || radius <= 0.0 {
                    validation.errors.push("capsule radius must be > 0".to_string());
                }
                if !height.is_finite() || height < 0.0 {
                    validation.errors.push("capsule height must be >= 0".to_string());
                }
            }
            ProfileShape::Box { half_extents } => {
                if !half_extents.iter().all(|value| value.is_finite() && *value > 0.0) {
                    validation
                        .errors
                        .push("box half_extents must all be > 0".to_string());
                }
            }
        }
        if !self.step_offset.is_finite() || self.step_offset < 0.0 {
            validation.errors.push("step_offset must be >= 0".to_string());
        } else if self.step_offset >= self.full_height() {
            validation
                .warnings
                .push("step_offset is taller than the volume".to_string());
        }
        if !self.slope_limit_deg.is_finite() || !(0.0..=90.0).contains(&self.slope_limit_deg) {
            validation
                .errors
                .push("slope_limit_deg must be within [0, 90]".to_string());
        } else if self.slope_limit_deg == 0.0 && self.handle_slope {
            validation
                .warnings
                .push("slope_limit_deg 0 disables slope handling".to_string());
        }
        let up = Vector::from(self.up);
        if !up.iter().all(|value| value.is_finite()) || up.norm_squared() < 1.0e-6 {
            validation
                .errors
                .push("up must be a finite non-zero vector".to_string());
        }
        if self.max_iterations == 0 {
            validation.errors.push("max_iterations must be > 0".to_string());
        }
        if !self.min_distance.is_finite() || self.min_distance < 0.0 {
            validation.errors.push("min_distance must be >= 0".to_string());
        }
        if !self.contact_offset.is_finite() || self.contact_offset <= 0.0 {
            validation
                .errors
                .push("contact_offset must be > 0".to_string());
        }
        if !self.volume_growth.is_finite() || self.volume_growth < 1.0 {
            validation
                .errors
                .push("volume_growth must be >= 1".to_string());
        }
        if self.climbing_mode == ClimbingMode::Constrained
            && matches!(self.shape, ProfileShape::Box { .. })
        {
            validation
                .warnings
                .push("constrained climbing has no effect on box volumes".to_string());
        }
        validation
    }

    /// Total extent of the volume along up.
    pub fn full_height(&self) -> f32 {
        match self.shape {
            ProfileShape::Capsule { radius, height } => height + radius * 2.0,
            ProfileShape::Box { half_extents } => half_extents[1] * 2.0,
        }
    }

    pub fn up_direction(&self) -> UnitVector<Real> {
        UnitVector::try_new(Vector::from(self.up), 1.0e-6).unwrap_or_else(Vector::y_axis)
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            step_offset: self.step_offset,
            up_direction: self.up_direction(),
            non_walkable_mode: self.non_walkable_mode,
            handle_slope: self.handle_slope,
            prevent_vertical_sliding_against_ceiling: self
                .prevent_vertical_sliding_against_ceiling,
            walk_experiment: self.walk_experiment,
            max_iterations: self.max_iterations,
            ..ControllerConfig::default()
        }
        .with_slope_angle(self.slope_limit_deg.to_radians())
    }

    /// Volume centered at `center`; boxes keep their local y axis along up.
    pub fn volume(&self, center: ExtendedPoint) -> SweptVolume {
        match self.shape {
            ProfileShape::Capsule { radius, height } => SweptVolume::capsule(center, radius, height),
            ProfileShape::Box { half_extents } => {
                SweptVolume::cuboid(center, Vector::from(half_extents))
            }
        }
    }

    pub fn sweep_settings(&self) -> SweepSettings {
        SweepSettings {
            contact_offset: self.contact_offset,
            volume_growth: self.volume_growth,
        }
    }
}
