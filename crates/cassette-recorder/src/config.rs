//! Capture session configuration.

use cassette_core::mask::CategoryMask;

/// What a capture session records and how coordinates are stored.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Pointer slots tracked per frame. Indices at or above this are
    /// invisible to the recording.
    pub pointer_count: usize,
    /// Store raw pixel coordinates when true, 0..=1 viewport fractions when
    /// false. Fractions survive replay on a differently sized viewport.
    pub absolute_coords: bool,
    pub record_pointers: bool,
    pub record_buttons: bool,
    pub record_pointer_events: bool,
    pub record_key_events: bool,
    pub record_keys_pressed: bool,
    pub record_orientation: bool,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            pointer_count: 3,
            absolute_coords: true,
            record_pointers: true,
            record_buttons: true,
            record_pointer_events: true,
            record_key_events: true,
            record_keys_pressed: true,
            record_orientation: false,
        }
    }
}

impl RecorderConfig {
    /// The category mask the per-category booleans add up to.
    pub fn categories(&self) -> CategoryMask {
        let mut mask = CategoryMask::NONE;
        if self.record_pointers {
            mask.insert(CategoryMask::POINTERS);
        }
        if self.record_buttons {
            mask.insert(CategoryMask::BUTTONS);
        }
        if self.record_pointer_events {
            mask.insert(CategoryMask::POINTER_EVENTS);
        }
        if self.record_key_events {
            mask.insert(CategoryMask::KEY_EVENTS);
        }
        if self.record_keys_pressed {
            mask.insert(CategoryMask::KEYS_PRESSED);
        }
        if self.record_orientation {
            mask.insert(CategoryMask::ORIENTATION);
        }
        mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mask_skips_orientation() {
        let mask = RecorderConfig::default().categories();
        assert!(mask.contains(CategoryMask::POINTERS));
        assert!(mask.contains(CategoryMask::KEY_EVENTS));
        assert!(!mask.contains(CategoryMask::ORIENTATION));
    }

    #[test]
    fn all_off_is_the_empty_mask() {
        let config = RecorderConfig {
            record_pointers: false,
            record_buttons: false,
            record_pointer_events: false,
            record_key_events: false,
            record_keys_pressed: false,
            record_orientation: false,
            ..Default::default()
        };
        assert!(config.categories().is_empty());
    }
}
