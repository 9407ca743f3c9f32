//! Category mask selecting which input channel groups a capture touches.

use serde::{Deserialize, Serialize};

/// Bitmask over the six recordable channel groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryMask(pub u8);

impl CategoryMask {
    pub const NONE: CategoryMask = CategoryMask(0);
    pub const POINTERS: CategoryMask = CategoryMask(1);
    pub const BUTTONS: CategoryMask = CategoryMask(1 << 1);
    pub const POINTER_EVENTS: CategoryMask = CategoryMask(1 << 2);
    pub const KEY_EVENTS: CategoryMask = CategoryMask(1 << 3);
    pub const KEYS_PRESSED: CategoryMask = CategoryMask(1 << 4);
    pub const ORIENTATION: CategoryMask = CategoryMask(1 << 5);
    pub const ALL: CategoryMask = CategoryMask(0x3f);

    pub fn contains(self, other: CategoryMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: CategoryMask) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: CategoryMask) {
        self.0 &= !other.0;
    }

    pub fn union(self, other: CategoryMask) -> CategoryMask {
        CategoryMask(self.0 | other.0)
    }

    pub fn intersection(self, other: CategoryMask) -> CategoryMask {
        CategoryMask(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Groups cheap enough to copy wholesale once per frame.
    pub fn frame_copied(self) -> CategoryMask {
        self.intersection(
            Self::POINTERS
                .union(Self::BUTTONS)
                .union(Self::KEYS_PRESSED)
                .union(Self::ORIENTATION),
        )
    }

    /// Groups only observable at native event drain time.
    pub fn event_captured(self) -> CategoryMask {
        self.intersection(Self::KEY_EVENTS.union(Self::POINTER_EVENTS))
    }
}
