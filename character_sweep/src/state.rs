//! Per-step context shared between passes and the query engine.

use rapier3d::math::{Real, Vector};

use crate::flags::StepFlags;
use crate::math::Extended;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ObstacleHandle(pub u32);

/// Entity last touched by a sweep that records contacts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Touched {
    #[default]
    None,
    /// Scene geometry; ids are opaque to the resolver.
    Shape { shape: u64, actor: Option<u64> },
    Obstacle(ObstacleHandle),
}

impl Touched {
    pub fn is_none(&self) -> bool {
        matches!(self, Touched::None)
    }
}

/// Per-pass contact cache selector routed to the query engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CacheSlot {
    #[default]
    Up,
    Side,
    Down,
}

impl CacheSlot {
    pub fn index(self) -> usize {
        match self {
            CacheSlot::Up => 0,
            CacheSlot::Side => 1,
            CacheSlot::Down => 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepState {
    flags: StepFlags,
    side_normal: Vector<Real>,
    down_normal: Vector<Real>,
    contact_height: Extended,
    touched_max_height: Extended,
    touched: Touched,
    cache_slot: CacheSlot,
    contacts: u32,
}

impl Default for StepState {
    fn default() -> Self {
        Self::new()
    }
}

impl StepState {
    pub fn new() -> Self {
        Self {
            flags: StepFlags::NONE,
            side_normal: Vector::zeros(),
            down_normal: Vector::zeros(),
            contact_height: 0.0,
            touched_max_height: 0.0,
            touched: Touched::None,
            cache_slot: CacheSlot::Up,
            contacts: 0,
        }
    }

    pub fn flags(&self) -> StepFlags {
        self.flags
    }

    pub fn cache_slot(&self) -> CacheSlot {
        self.cache_slot
    }

    /// Contacts reported by the current sweep.
    pub fn contacts(&self) -> u32 {
        self.contacts
    }

    pub fn normalize_response(&self) -> bool {
        self.flags.contains(StepFlags::NORMALIZE_RESPONSE)
    }

    pub fn touched(&self) -> Touched {
        self.touched
    }

    pub fn contact_height(&self) -> Extended {
        self.contact_height
    }

    pub fn touched_max_height(&self) -> Extended {
        self.touched_max_height
    }

    /// Normal of the world geometry touched by the side or sensor pass.
    pub fn side_contact(&self) -> Option<Vector<Real>> {
        self.flags
            .contains(StepFlags::VALIDATE_TRIANGLE_SIDE)
            .then_some(self.side_normal)
    }

    /// Normal of the world geometry touched by the down pass.
    pub fn down_contact(&self) -> Option<Vector<Real>> {
        self.flags
            .contains(StepFlags::VALIDATE_TRIANGLE_DOWN)
            .then_some(self.down_normal)
    }

    pub fn touching_controller_or_obstacle(&self) -> bool {
        self.flags
            .intersects(StepFlags::TOUCH_OTHER_CONTROLLER | StepFlags::TOUCH_OBSTACLE)
    }

    pub fn record_contact(&mut self) {
        self.contacts = self.contacts.saturating_add(1);
    }

    /// Caches a world-geometry contact for the side slot.
    pub fn record_side_contact(&mut self, normal: Vector<Real>, contact_height: Extended) {
        self.side_normal = normal;
        self.contact_height = contact_height;
        self.flags.insert(StepFlags::VALIDATE_TRIANGLE_SIDE);
    }

    /// Caches a world-geometry contact for the down slot.
    pub fn record_down_contact(
        &mut self,
        normal: Vector<Real>,
        contact_height: Extended,
        touched_max_height: Extended,
    ) {
        self.down_normal = normal;
        self.contact_height = contact_height;
        self.touched_max_height = touched_max_height;
        self.flags.insert(StepFlags::VALIDATE_TRIANGLE_DOWN);
    }

    pub fn set_touched(&mut self, touched: Touched) {
        self.touched = touched;
    }

    pub fn mark_touching_obstacle(&mut self) {
        self.flags.insert(StepFlags::TOUCH_OBSTACLE);
    }

    pub fn mark_touching_controller(&mut self) {
        self.flags.insert(StepFlags::TOUCH_OTHER_CONTROLLER);
    }

    pub(crate) fn flags_mut(&mut self) -> &mut StepFlags {
        &mut self.flags
    }

    /// Touch flags describe the current sweep only.
    pub(crate) fn begin_sweep(&mut self, slot: CacheSlot) {
        self.cache_slot = slot;
        self.contacts = 0;
        self.flags
            .remove(StepFlags::TOUCH_OTHER_CONTROLLER | StepFlags::TOUCH_OBSTACLE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contacts_are_exposed_only_when_validated() {
        let mut state = StepState::new();
        assert!(state.side_contact().is_none());
        state.record_side_contact(Vector::x(), 1.5);
        assert_eq!(state.side_contact(), Some(Vector::x()));
        assert_eq!(state.contact_height(), 1.5);
        assert!(state.down_contact().is_none());
    }

    #[test]
    fn begin_sweep_resets_counter() {
        let mut state = StepState::new();
        state.record_contact();
        state.record_contact();
        assert_eq!(state.contacts(), 2);
        state.begin_sweep(CacheSlot::Down);
        assert_eq!(state.contacts(), 0);
        assert_eq!(state.cache_slot().index(), 2);
    }

    #[test]
    fn begin_sweep_forgets_earlier_touches() {
        let mut state = StepState::new();
        state.mark_touching_obstacle();
        state.mark_touching_controller();
        state.record_side_contact(Vector::x(), 0.5);
        assert!(state.touching_controller_or_obstacle());
        state.begin_sweep(CacheSlot::Down);
        assert!(!state.touching_controller_or_obstacle());
        assert!(state.side_contact().is_some());
    }
}
