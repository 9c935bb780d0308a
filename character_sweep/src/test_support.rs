//! Analytic half-space world used to exercise the resolver without a
//! physics backend. Casts are exact for capsules and boxes against planes.

use rapier3d::math::{Real, Vector};

use crate::math::{extend, height_of, Extended, ExtendedPoint};
use crate::query::{GeometryQuery, SweepPass, SweepRequest, TouchedGeometryCache};
use crate::response::slide_target;
use crate::state::{ObstacleHandle, StepState, Touched};
use crate::volume::{ExtendedBounds, SweptVolume};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlaneKind {
    World,
    Obstacle(ObstacleHandle),
    Controller,
}

/// Free space is `normal . p >= offset`.
#[derive(Clone, Copy, Debug)]
pub struct Plane {
    pub normal: Vector<Real>,
    pub offset: Extended,
    /// Highest point of the surface along up.
    pub top: Extended,
    pub kind: PlaneKind,
    /// Active only while the volume center is at or past this x.
    pub from_x: Extended,
    /// Active only while the volume bottom is below this height.
    pub below: Extended,
}

impl Plane {
    pub fn floor(height: Extended) -> Self {
        Self {
            normal: Vector::y(),
            offset: height,
            top: height,
            kind: PlaneKind::World,
            from_x: Extended::NEG_INFINITY,
            below: Extended::INFINITY,
        }
    }

    pub fn ledge(height: Extended, from_x: Extended) -> Self {
        Self {
            from_x,
            ..Self::floor(height)
        }
    }

    pub fn ceiling(height: Extended) -> Self {
        Self {
            normal: -Vector::y(),
            offset: -height,
            top: height,
            ..Self::floor(0.0)
        }
    }

    /// Wall facing -x at `x`, blocking volumes whose bottom is below `top`.
    pub fn wall(x: Extended, top: Extended) -> Self {
        Self {
            normal: -Vector::x(),
            offset: -x,
            top,
            kind: PlaneKind::World,
            from_x: Extended::NEG_INFINITY,
            below: top,
        }
    }

    /// Wall facing +x at `x`, blocking volumes moving towards -x.
    pub fn back_wall(x: Extended, top: Extended) -> Self {
        Self {
            normal: Vector::x(),
            offset: x,
            ..Self::wall(x, top)
        }
    }

    /// Slope rising towards +x from `foot_x` at `angle_deg`.
    pub fn slope(foot_x: Extended, angle_deg: Real, top: Extended) -> Self {
        let angle = angle_deg.to_radians();
        let normal = Vector::new(-angle.sin(), angle.cos(), 0.0);
        Self {
            normal,
            offset: Extended::from(normal.x) * foot_x,
            top,
            kind: PlaneKind::World,
            from_x: Extended::NEG_INFINITY,
            below: Extended::INFINITY,
        }
    }

    pub fn with_kind(mut self, kind: PlaneKind) -> Self {
        self.kind = kind;
        self
    }

    fn active(&self, volume: &SweptVolume, up: &Vector<Real>) -> bool {
        volume.center.x >= self.from_x && volume.bottom_height(up) < self.below
    }

    fn cast(&self, volume: &SweptVolume, direction: &Vector<Real>, up: &Vector<Real>) -> Option<Extended> {
        let approach = -Extended::from(self.normal.dot(direction));
        if approach <= 1.0e-9 {
            return None;
        }
        let reach = Extended::from(volume.support_distance(&-self.normal, up));
        let gap = volume.center.coords.dot(&extend(&self.normal)) - self.offset - reach;
        Some(gap.max(0.0) / approach)
    }
}

#[derive(Clone, Debug)]
pub struct PlaneWorld {
    pub planes: Vec<Plane>,
    pub up: Vector<Real>,
    pub contact_offset: Real,
    pub prefetches: Vec<ExtendedBounds>,
    pub requests: Vec<SweepRequest>,
    /// Whether each request ran with the normalized response.
    pub normalized: Vec<bool>,
}

impl PlaneWorld {
    pub fn new(planes: Vec<Plane>) -> Self {
        Self {
            planes,
            up: Vector::y(),
            contact_offset: 0.01,
            prefetches: Vec::new(),
            requests: Vec::new(),
            normalized: Vec::new(),
        }
    }

    pub fn passes(&self) -> Vec<SweepPass> {
        self.requests.iter().map(|request| request.pass).collect()
    }

    fn closest(&self, volume: &SweptVolume, direction: &Vector<Real>) -> Option<(Extended, Plane)> {
        self.planes
            .iter()
            .filter(|plane| plane.active(volume, &self.up))
            .filter_map(|plane| plane.cast(volume, direction, &self.up).map(|toi| (toi, *plane)))
            .min_by(|a, b| a.0.total_cmp(&b.0))
    }
}

impl TouchedGeometryCache for PlaneWorld {
    type Obstacles = ();
    type Filters = ();

    fn prefetch(&mut self, bounds: &ExtendedBounds, _: &(), _: &(), _: &Vector<Real>) {
        self.prefetches.push(*bounds);
    }
}

impl GeometryQuery for PlaneWorld {
    fn sweep(
        &mut self,
        volume: &mut SweptVolume,
        request: &SweepRequest,
        _: &(),
        _: &(),
        state: &mut StepState,
    ) -> bool {
        self.requests.push(*request);
        self.normalized.push(state.normalize_response());
        let offset = Extended::from(self.contact_offset);
        let mut target: ExtendedPoint = volume.center + extend(&request.motion);
        let mut moved = false;
        for _ in 0..request.max_iterations {
            let delta = target - volume.center;
            let length = delta.norm();
            if length <= Extended::from(request.min_distance) || length <= 1.0e-9 {
                break;
            }
            let direction = (delta / length).cast::<Real>();
            if direction.dot(&request.motion) <= 0.0 {
                break;
            }
            moved = true;
            let Some((toi, plane)) = self
                .closest(volume, &direction)
                .filter(|(toi, _)| *toi <= length + offset)
            else {
                volume.center = target;
                break;
            };
            volume.center += extend(&direction) * (toi - offset).max(0.0);
            state.record_contact();
            let height = volume.contact_height(&plane.normal, &self.up);
            match plane.kind {
                PlaneKind::World => {
                    match request.pass {
                        SweepPass::Side | SweepPass::Sensor => {
                            state.record_side_contact(plane.normal, height)
                        }
                        SweepPass::Down => state.record_down_contact(plane.normal, height, plane.top),
                        SweepPass::Up => {}
                    }
                    state.set_touched(Touched::Shape {
                        shape: plane.top.to_bits(),
                        actor: None,
                    });
                }
                PlaneKind::Obstacle(handle) => {
                    state.mark_touching_obstacle();
                    state.set_touched(Touched::Obstacle(handle));
                }
                PlaneKind::Controller => state.mark_touching_controller(),
            }
            if request.pass.is_probe() {
                break;
            }
            target = slide_target(
                &volume.center,
                &target,
                &direction,
                &plane.normal,
                state.normalize_response(),
            );
        }
        moved
    }
}

pub fn resting_capsule(x: Extended) -> SweptVolume {
    SweptVolume::capsule(ExtendedPoint::new(x, 1.01, 0.0), 0.5, 1.0)
}

pub fn height(volume: &SweptVolume) -> Extended {
    height_of(&volume.center, &Vector::y())
}
