//! Bitsets reported by and shared between the sweep passes.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Directions that registered at least one contact during a step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CollisionFlags(pub u8);

impl CollisionFlags {
    pub const NONE: Self = Self(0);
    /// Contact while moving sideways.
    pub const SIDES: Self = Self(1 << 0);
    /// Contact above the volume (ceiling or overhang during the climb).
    pub const UP: Self = Self(1 << 1);
    /// Contact below the volume (support).
    pub const DOWN: Self = Self(1 << 2);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for CollisionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for CollisionFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for CollisionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let mut labels = Vec::new();
        if self.contains(Self::UP) {
            labels.push("up");
        }
        if self.contains(Self::SIDES) {
            labels.push("sides");
        }
        if self.contains(Self::DOWN) {
            labels.push("down");
        }
        write!(f, "{}", labels.join("|"))
    }
}

/// Runtime flags read across passes within one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct StepFlags(pub u16);

impl StepFlags {
    pub const NONE: Self = Self(0);
    pub const IS_MOVING_UP: Self = Self(1 << 0);
    pub const HIT_NON_WALKABLE: Self = Self(1 << 1);
    /// The side (or sensor) pass touched world geometry.
    pub const VALIDATE_TRIANGLE_SIDE: Self = Self(1 << 2);
    /// The down pass touched world geometry.
    pub const VALIDATE_TRIANGLE_DOWN: Self = Self(1 << 3);
    /// Set only while the recovery sweep runs.
    pub const NORMALIZE_RESPONSE: Self = Self(1 << 4);
    pub const TOUCH_OTHER_CONTROLLER: Self = Self(1 << 5);
    pub const TOUCH_OBSTACLE: Self = Self(1 << 6);

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl BitOr for StepFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}
