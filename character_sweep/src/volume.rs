//! Moving shapes resolved by the controller.
//!
//! Shapes are expressed in the controller frame: local `y` is aligned with
//! the configured up axis, so a capsule segment and a box's `half_extents.y`
//! always run along up.

use rapier3d::math::{Real, Vector};
use rapier3d::na::UnitQuaternion;

use crate::math::{extend, height_of, Extended, ExtendedPoint, ExtendedVector};

const SUPPORT_TIE_TOLERANCE: Real = 1.0e-5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VolumeShape {
    Capsule { radius: Real },
    Box { half_extents: Vector<Real> },
}

impl VolumeShape {
    /// Radius usable for sensor probing; only capsules have one.
    pub fn probe_radius(&self) -> Option<Real> {
        match self {
            VolumeShape::Capsule { radius } => Some(*radius),
            VolumeShape::Box { .. } => None,
        }
    }

    pub fn is_capsule(&self) -> bool {
        matches!(self, VolumeShape::Capsule { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweptVolume {
    pub center: ExtendedPoint,
    /// Distance from the center to the bottom of the volume along up.
    pub half_height: Real,
    pub shape: VolumeShape,
}

impl SweptVolume {
    /// `height` is the capsule segment length, excluding the hemispheres.
    pub fn capsule(center: ExtendedPoint, radius: Real, height: Real) -> Self {
        Self {
            center,
            half_height: height * 0.5 + radius,
            shape: VolumeShape::Capsule { radius },
        }
    }

    pub fn cuboid(center: ExtendedPoint, half_extents: Vector<Real>) -> Self {
        Self {
            center,
            half_height: half_extents.y,
            shape: VolumeShape::Box { half_extents },
        }
    }

    pub fn height_along(&self, up: &Vector<Real>) -> Extended {
        height_of(&self.center, up)
    }

    pub fn bottom_height(&self, up: &Vector<Real>) -> Extended {
        self.height_along(up) - Extended::from(self.half_height)
    }

    pub fn foot_position(&self, up: &Vector<Real>) -> ExtendedPoint {
        self.center - extend(up) * Extended::from(self.half_height)
    }

    pub fn translate(&mut self, delta: &Vector<Real>) {
        self.center += extend(delta);
    }

    /// Rotation taking the controller frame (`y` up) to world space.
    pub fn orientation(up: &Vector<Real>) -> UnitQuaternion<Real> {
        UnitQuaternion::rotation_between(&Vector::y(), up).unwrap_or_else(|| {
            if up.y < 0.0 {
                UnitQuaternion::from_axis_angle(&Vector::x_axis(), std::f32::consts::PI)
            } else {
                UnitQuaternion::identity()
            }
        })
    }

    /// Distance from the center to the surface along the unit `direction`.
    pub fn support_distance(&self, direction: &Vector<Real>, up: &Vector<Real>) -> Real {
        match self.shape {
            VolumeShape::Capsule { radius } => {
                radius + (self.half_height - radius).max(0.0) * direction.dot(up).abs()
            }
            VolumeShape::Box { half_extents } => {
                let local = Self::orientation(up).inverse_transform_vector(direction);
                local.abs().dot(&half_extents)
            }
        }
    }

    /// Offset from the center to the support point along the unit `direction`.
    ///
    /// Flat features facing `direction` resolve to their middle.
    pub fn support_offset(&self, direction: &Vector<Real>, up: &Vector<Real>) -> Vector<Real> {
        match self.shape {
            VolumeShape::Capsule { radius } => {
                let along = direction.dot(up);
                let segment = if along.abs() <= SUPPORT_TIE_TOLERANCE {
                    Vector::zeros()
                } else {
                    up * ((self.half_height - radius).max(0.0) * along.signum())
                };
                segment + direction * radius
            }
            VolumeShape::Box { half_extents } => {
                let rotation = Self::orientation(up);
                let local = rotation.inverse_transform_vector(direction);
                let corner = Vector::from_fn(|i, _| {
                    if local[i].abs() <= SUPPORT_TIE_TOLERANCE {
                        0.0
                    } else {
                        half_extents[i] * local[i].signum()
                    }
                });
                rotation * corner
            }
        }
    }

    /// Height along up of the point touching a surface with outward `normal`.
    pub fn contact_height(&self, normal: &Vector<Real>, up: &Vector<Real>) -> Extended {
        let offset = self.support_offset(&-normal, up);
        self.height_along(up) + Extended::from(offset.dot(up))
    }

    pub fn world_half_extents(&self, up: &Vector<Real>) -> Vector<Real> {
        match self.shape {
            VolumeShape::Capsule { radius } => {
                let segment = (self.half_height - radius).max(0.0);
                up.abs() * segment + Vector::repeat(radius)
            }
            VolumeShape::Box { half_extents } => {
                let rotation = Self::orientation(up).to_rotation_matrix();
                rotation.matrix().abs() * half_extents
            }
        }
    }

    /// Bounds covering the volume at its center and after `motion`.
    pub fn temporal_bounds(&self, motion: &Vector<Real>, up: &Vector<Real>) -> ExtendedBounds {
        let extents = extend(&self.world_half_extents(up));
        let start = ExtendedBounds::around(&self.center, &extents);
        let end = ExtendedBounds::around(&(self.center + extend(motion)), &extents);
        start.union(&end)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtendedBounds {
    pub min: ExtendedPoint,
    pub max: ExtendedPoint,
}

impl ExtendedBounds {
    pub fn around(center: &ExtendedPoint, half_extents: &ExtendedVector) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: ExtendedPoint::from(self.min.coords.inf(&other.min.coords)),
            max: ExtendedPoint::from(self.max.coords.sup(&other.max.coords)),
        }
    }

    pub fn contains(&self, other: &Self) -> bool {
        (0..3).all(|i| self.min[i] <= other.min[i] && self.max[i] >= other.max[i])
    }

    pub fn intersects(&self, other: &Self) -> bool {
        (0..3).all(|i| self.min[i] <= other.max[i] && self.max[i] >= other.min[i])
    }

    pub fn inflated(&self, margin: Extended) -> Self {
        let margin = ExtendedVector::repeat(margin);
        Self {
            min: self.min - margin,
            max: self.max + margin,
        }
    }

    /// Scales the half extents around the center.
    pub fn scaled(&self, factor: Extended) -> Self {
        let center = rapier3d::na::center(&self.min, &self.max);
        let half = (self.max - self.min) * (0.5 * factor);
        Self::around(&center, &half)
    }
}
