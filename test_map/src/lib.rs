//! Scene maps for exercising character controllers: boxes, ramps and
//! generated stairs, built into a [`PhysicsWorld`].
#![forbid(unsafe_code)]

use physics_rapier::PhysicsWorld;
use rapier3d::na as nalgebra;
use rapier3d::prelude::{point, vector, ColliderBuilder, ColliderHandle, Point, Real};
use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct TestMap {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub notes: Option<String>,
    /// Foot position where characters start.
    #[serde(default)]
    pub spawn: Option<[f32; 3]>,
    #[serde(default)]
    pub solids: Vec<SolidSpec>,
    #[serde(default)]
    pub generators: Vec<GeneratorSpec>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SolidSpec {
    pub id: String,
    pub kind: SolidKind,
    /// Center of the solid's bounding box.
    pub pos: [f32; 3],
    #[serde(default)]
    pub size: Option<[f32; 3]>,
    #[serde(default)]
    pub yaw_deg: Option<f32>,
    #[serde(default)]
    pub angle_deg: Option<f32>,
    #[serde(default)]
    pub length: Option<f32>,
    #[serde(default)]
    pub width: Option<f32>,
}

#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SolidKind {
    Box,
    /// Wedge rising towards local +x.
    Ramp,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorSpec {
    Stairs {
        id: String,
        pos: [f32; 3],
        #[serde(default)]
        yaw_deg: f32,
        step_count: u32,
        step_rise: f32,
        step_run: f32,
        width: f32,
    },
    Ramps {
        id: String,
        pos: [f32; 3],
        #[serde(default)]
        yaw_deg: f32,
        width: f32,
        length: f32,
        angles_deg: Vec<f32>,
        #[serde(default)]
        gap: f32,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedSolid {
    pub id: String,
    pub kind: SolidKind,
    pub pos: [f32; 3],
    pub size: [f32; 3],
    pub yaw_deg: f32,
}

#[derive(Clone, Debug, Default)]
pub struct TestMapValidation {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl TestMapValidation {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

impl TestMap {
    pub fn parse_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|err| err.to_string())
    }

    pub fn spawn(&self) -> [f32; 3] {
        self.spawn.unwrap_or([0.0, 0.0, 0.0])
    }

    pub fn validate(&self) -> TestMapValidation {
        let mut validation = TestMapValidation::default();
        if self.version != 1 {
            validation
                .errors
                .push(format!("unsupported version {}", self.version));
        }
        if let Some(spawn) = self.spawn {
            if !vector_is_finite(spawn) {
                validation.errors.push("spawn must be finite".to_string());
            }
        }
        if self.solids.is_empty() && self.generators.is_empty() {
            validation
                .warnings
                .push("test map contains no solids or generators".to_string());
        }
        for solid in &self.solids {
            if solid.id.trim().is_empty() {
                validation
                    .errors
                    .push("solid id must not be empty".to_string());
            }
            if !vector_is_finite(solid.pos) {
                validation
                    .errors
                    .push(format!("solid '{}' has invalid pos", solid.id));
            }
            match solid.effective_size() {
                Some(size) if vector_is_finite(size) && size.iter().all(|value| *value > 0.0) => {}
                Some(_) => validation
                    .errors
                    .push(format!("solid '{}' has invalid size", solid.id)),
                None => validation
                    .errors
                    .push(format!("solid '{}' missing size", solid.id)),
            }
            if let Some(angle) = solid.angle_deg {
                if !ramp_angle_in_range(angle) {
                    validation.errors.push(format!(
                        "solid '{}' angle_deg must be between 0 and 89",
                        solid.id
                    ));
                }
            }
        }
        for generator in &self.generators {
            validate_generator(generator, &mut validation);
        }
        validation
    }

    pub fn expanded_solids(&self) -> Result<Vec<ResolvedSolid>, String> {
        let validation = self.validate();
        if !validation.is_ok() {
            return Err(validation.errors.join("; "));
        }
        let mut solids = Vec::new();
        for solid in &self.solids {
            solids.push(solid.resolve()?);
        }
        for generator in &self.generators {
            solids.extend(generator.expand());
        }
        let mut seen = std::collections::HashSet::new();
        for solid in &solids {
            if !seen.insert(solid.id.as_str()) {
                return Err(format!("duplicate solid id '{}'", solid.id));
            }
        }
        Ok(solids)
    }

    /// Inserts every solid as static world geometry.
    pub fn build_world(&self, world: &mut PhysicsWorld) -> Result<Vec<ColliderHandle>, String> {
        let solids = self.expanded_solids()?;
        let mut handles = Vec::with_capacity(solids.len());
        for solid in &solids {
            handles.push(world.insert_static_collider(solid.collider()?));
        }
        world.refresh_queries();
        Ok(handles)
    }
}

impl SolidSpec {
    fn resolve(&self) -> Result<ResolvedSolid, String> {
        let size = self
            .effective_size()
            .ok_or_else(|| format!("solid '{}' missing size", self.id))?;
        Ok(ResolvedSolid {
            id: self.id.clone(),
            kind: self.kind,
            pos: self.pos,
            size,
            yaw_deg: self.yaw_deg.unwrap_or(0.0),
        })
    }

    fn effective_size(&self) -> Option<[f32; 3]> {
        if let Some(size) = self.size {
            return Some(size);
        }
        if self.kind == SolidKind::Ramp {
            if let (Some(length), Some(width), Some(angle)) =
                (self.length, self.width, self.angle_deg)
            {
                return Some([length, ramp_height(length, angle), width]);
            }
        }
        None
    }
}

impl ResolvedSolid {
    pub fn collider(&self) -> Result<rapier3d::prelude::Collider, String> {
        let [length, height, width] = self.size;
        let builder = match self.kind {
            SolidKind::Box => ColliderBuilder::cuboid(length * 0.5, height * 0.5, width * 0.5),
            SolidKind::Ramp => {
                let (x, y, z) = (length * 0.5, height * 0.5, width * 0.5);
                let points: [Point<Real>; 6] = [
                    point![-x, -y, -z],
                    point![-x, -y, z],
                    point![x, -y, -z],
                    point![x, -y, z],
                    point![x, y, -z],
                    point![x, y, z],
                ];
                ColliderBuilder::convex_hull(&points)
                    .ok_or_else(|| format!("solid '{}' ramp hull is degenerate", self.id))?
            }
        };
        Ok(builder
            .translation(vector![self.pos[0], self.pos[1], self.pos[2]])
            .rotation(vector![0.0, self.yaw_deg.to_radians(), 0.0])
            .build())
    }
}

impl GeneratorSpec {
    fn expand(&self) -> Vec<ResolvedSolid> {
        match self {
            GeneratorSpec::Stairs {
                id,
                pos,
                yaw_deg,
                step_count,
                step_rise,
                step_run,
                width,
            } => {
                let yaw = yaw_deg.to_radians();
                (0..*step_count)
                    .map(|index| {
                        // Each step is a full-height column so nothing hangs in the air.
                        let height = step_rise * (index as f32 + 1.0);
                        let local = [step_run * (index as f32 + 0.5), height * 0.5, 0.0];
                        ResolvedSolid {
                            id: format!("{}/step_{:02}", id, index + 1),
                            kind: SolidKind::Box,
                            pos: offset(*pos, rotate_y(local, yaw)),
                            size: [*step_run, height, *width],
                            yaw_deg: *yaw_deg,
                        }
                    })
                    .collect()
            }
            GeneratorSpec::Ramps {
                id,
                pos,
                yaw_deg,
                width,
                length,
                angles_deg,
                gap,
            } => {
                let yaw = yaw_deg.to_radians();
                angles_deg
                    .iter()
                    .enumerate()
                    .map(|(index, angle)| {
                        let height = ramp_height(*length, *angle);
                        // Neighbours sit side by side along local z.
                        let local = [0.0, height * 0.5, (width + gap) * index as f32];
                        ResolvedSolid {
                            id: format!("{}/ramp_{:02}", id, index + 1),
                            kind: SolidKind::Ramp,
                            pos: offset(*pos, rotate_y(local, yaw)),
                            size: [*length, height, *width],
                            yaw_deg: *yaw_deg,
                        }
                    })
                    .collect()
            }
        }
    }
}

fn validate_generator(generator: &GeneratorSpec, validation: &mut TestMapValidation) {
    match generator {
        GeneratorSpec::Stairs {
            id,
            step_count,
            step_rise,
            step_run,
            width,
            ..
        } => {
            if id.trim().is_empty() {
                validation
                    .errors
                    .push("stairs generator id must not be empty".to_string());
            }
            if *step_count == 0 {
                validation
                    .errors
                    .push(format!("stairs '{}' step_count must be > 0", id));
            }
            if *step_rise <= 0.0 || *step_run <= 0.0 || *width <= 0.0 {
                validation
                    .errors
                    .push(format!("stairs '{}' dimensions must be > 0", id));
            }
        }
        GeneratorSpec::Ramps {
            id,
            width,
            length,
            angles_deg,
            gap,
            ..
        } => {
            if id.trim().is_empty() {
                validation
                    .errors
                    .push("ramps generator id must not be empty".to_string());
            }
            if *width <= 0.0 || *length <= 0.0 || *gap < 0.0 {
                validation
                    .errors
                    .push(format!("ramps '{}' dimensions must be > 0", id));
            }
            if angles_deg.is_empty() {
                validation
                    .errors
                    .push(format!("ramps '{}' angles_deg must not be empty", id));
            }
            if !angles_deg.iter().all(|angle| ramp_angle_in_range(*angle)) {
                validation
                    .errors
                    .push(format!("ramps '{}' angle out of range", id));
            }
        }
    }
}

fn ramp_angle_in_range(angle: f32) -> bool {
    angle > 0.0 && angle < 89.0
}

fn ramp_height(length: f32, angle_deg: f32) -> f32 {
    angle_deg.to_radians().tan() * length
}

fn offset(base: [f32; 3], delta: [f32; 3]) -> [f32; 3] {
    [base[0] + delta[0], base[1] + delta[1], base[2] + delta[2]]
}

fn rotate_y(value: [f32; 3], yaw: f32) -> [f32; 3] {
    let (sin, cos) = yaw.sin_cos();
    [
        value[0] * cos + value[2] * sin,
        value[1],
        -value[0] * sin + value[2] * cos,
    ]
}

fn vector_is_finite(value: [f32; 3]) -> bool {
    value.iter().all(|component| component.is_finite())
}
