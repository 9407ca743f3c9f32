//! Point-in-time image of the whole input state.

use std::collections::HashSet;

use tracing::warn;

use crate::events::{KeyEvent, PointerEvent, PointerEventKind};
use crate::mask::CategoryMask;
use crate::record::DeltaRecord;
use crate::source::InputSource;

/// Backends track at most this many pointers; configuring more wastes memory
/// on slots that never change.
pub const MAX_USEFUL_POINTERS: usize = 20;

/// One captured frame of input state. Produced by the tracker during capture
/// and mutated by the clock thread during replay.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub x: Vec<i32>,
    pub y: Vec<i32>,
    pub delta_x: Vec<i32>,
    pub delta_y: Vec<i32>,
    pub touched: Vec<bool>,
    pub just_touched: bool,
    pub buttons: [bool; 3],
    pub accelerometer: [f32; 3],
    pub pitch: f32,
    pub roll: f32,
    pub azimuth: f32,
    pub rotation_matrix: [f32; 16],
    pub orientation: i32,
    pub pressed_keys: HashSet<u32>,
    pub key_events: Vec<KeyEvent>,
    pub pointer_events: Vec<PointerEvent>,
    pub timestamp_ms: u64,
}

impl Snapshot {
    pub fn new(pointer_count: usize) -> Self {
        let mut snapshot = Self::default();
        snapshot.reset(pointer_count);
        snapshot
    }

    pub fn pointer_count(&self) -> usize {
        self.x.len()
    }

    /// Clears transient state and resizes the pointer arrays. Growing
    /// zero-fills the new slots, shrinking drops the tail; surviving indices
    /// keep their values.
    pub fn reset(&mut self, pointer_count: usize) {
        if pointer_count > MAX_USEFUL_POINTERS {
            warn!(
                pointer_count,
                max = MAX_USEFUL_POINTERS,
                "tracking more pointers than any backend reports"
            );
        }
        self.x.resize(pointer_count, 0);
        self.y.resize(pointer_count, 0);
        self.delta_x.resize(pointer_count, 0);
        self.delta_y.resize(pointer_count, 0);
        self.touched.resize(pointer_count, false);
        self.just_touched = false;
        self.pressed_keys.clear();
        self.key_events.clear();
        self.pointer_events.clear();
        self.timestamp_ms = 0;
    }

    /// Reads the masked channel groups from a live source. Unmasked groups
    /// are left untouched.
    pub fn capture(&mut self, source: &dyn InputSource, mask: CategoryMask, now_ms: u64) {
        self.timestamp_ms = now_ms;
        if mask.contains(CategoryMask::POINTERS) {
            for i in 0..self.pointer_count() {
                self.x[i] = source.pointer_x(i);
                self.y[i] = source.pointer_y(i);
                self.delta_x[i] = source.pointer_delta_x(i);
                self.delta_y[i] = source.pointer_delta_y(i);
                self.touched[i] = source.is_touched(i);
            }
            self.just_touched = source.just_touched();
        }
        if mask.contains(CategoryMask::BUTTONS) {
            for (b, pressed) in self.buttons.iter_mut().enumerate() {
                *pressed = source.is_button_pressed(b);
            }
        }
        if mask.contains(CategoryMask::KEYS_PRESSED) {
            self.pressed_keys = source.pressed_keys();
        }
        if mask.contains(CategoryMask::ORIENTATION) {
            self.accelerometer = source.accelerometer();
            self.pitch = source.pitch();
            self.roll = source.roll();
            self.azimuth = source.azimuth();
            self.rotation_matrix = source.rotation_matrix();
            self.orientation = source.orientation();
        }
        if mask.contains(CategoryMask::KEY_EVENTS) {
            self.key_events = source.drain_key_events();
        }
        if mask.contains(CategoryMask::POINTER_EVENTS) {
            self.pointer_events = source.drain_pointer_events();
        }
    }

    /// Copies the masked channel groups from another snapshot. Pointer arrays
    /// are copied up to the shorter of the two lengths.
    pub fn copy_from(&mut self, other: &Snapshot, mask: CategoryMask) {
        if mask.contains(CategoryMask::POINTERS) {
            let n = self.pointer_count().min(other.pointer_count());
            self.x[..n].copy_from_slice(&other.x[..n]);
            self.y[..n].copy_from_slice(&other.y[..n]);
            self.delta_x[..n].copy_from_slice(&other.delta_x[..n]);
            self.delta_y[..n].copy_from_slice(&other.delta_y[..n]);
            self.touched[..n].copy_from_slice(&other.touched[..n]);
            self.just_touched = other.just_touched;
        }
        if mask.contains(CategoryMask::BUTTONS) {
            self.buttons = other.buttons;
        }
        if mask.contains(CategoryMask::KEYS_PRESSED) {
            self.pressed_keys.clone_from(&other.pressed_keys);
        }
        if mask.contains(CategoryMask::ORIENTATION) {
            self.accelerometer = other.accelerometer;
            self.pitch = other.pitch;
            self.roll = other.roll;
            self.azimuth = other.azimuth;
            self.rotation_matrix = other.rotation_matrix;
            self.orientation = other.orientation;
        }
        if mask.contains(CategoryMask::KEY_EVENTS) {
            self.key_events.clone_from(&other.key_events);
        }
        if mask.contains(CategoryMask::POINTER_EVENTS) {
            self.pointer_events.clone_from(&other.pointer_events);
        }
        self.timestamp_ms = other.timestamp_ms;
    }

    /// Applies one replayed delta. Pointer indices beyond the configured
    /// count are ignored. Coordinates must already be denormalized.
    pub fn apply(&mut self, record: &DeltaRecord) {
        match record {
            DeltaRecord::Accelerometer { x, y, z, .. } => {
                self.accelerometer = [*x, *y, *z];
            }
            DeltaRecord::Orientation {
                pitch,
                roll,
                azimuth,
                orientation,
                rotation_matrix,
                ..
            } => {
                self.pitch = *pitch;
                self.roll = *roll;
                self.azimuth = *azimuth;
                self.orientation = *orientation;
                self.rotation_matrix = *rotation_matrix;
            }
            DeltaRecord::KeyPressed {
                transition,
                key_code,
                ..
            } => {
                use crate::record::KeyTransition;
                match transition {
                    KeyTransition::Press => {
                        self.pressed_keys.insert(*key_code);
                    }
                    KeyTransition::Release => {
                        self.pressed_keys.remove(key_code);
                    }
                }
            }
            DeltaRecord::KeyEvent {
                kind,
                key_code,
                key_char,
                ..
            } => {
                self.key_events.push(KeyEvent {
                    kind: *kind,
                    key_code: *key_code,
                    key_char: *key_char,
                    timestamp_ms: self.timestamp_ms,
                });
            }
            DeltaRecord::PointerEvent {
                kind,
                x,
                y,
                pointer,
                button,
                scroll_amount,
                ..
            } => {
                self.pointer_events.push(PointerEvent {
                    kind: *kind,
                    x: x.round() as i32,
                    y: y.round() as i32,
                    pointer: *pointer,
                    button: *button,
                    scroll_amount: *scroll_amount,
                    timestamp_ms: self.timestamp_ms,
                });
                if *kind == PointerEventKind::Down {
                    if let Some(touched) = self.touched.get_mut(*pointer as usize) {
                        *touched = true;
                    }
                }
            }
            DeltaRecord::Pointer {
                pointer,
                x,
                y,
                delta_x,
                delta_y,
                touched,
                ..
            } => {
                let i = *pointer as usize;
                if i < self.pointer_count() {
                    self.x[i] = x.round() as i32;
                    self.y[i] = y.round() as i32;
                    self.delta_x[i] = delta_x.round() as i32;
                    self.delta_y[i] = delta_y.round() as i32;
                    self.touched[i] = *touched;
                }
            }
            DeltaRecord::Button {
                button0,
                button1,
                button2,
                ..
            } => {
                self.buttons = [*button0, *button1, *button2];
            }
        }
    }

    pub fn pointer_x(&self, pointer: usize) -> i32 {
        self.x.get(pointer).copied().unwrap_or(0)
    }

    pub fn pointer_y(&self, pointer: usize) -> i32 {
        self.y.get(pointer).copied().unwrap_or(0)
    }

    pub fn pointer_delta_x(&self, pointer: usize) -> i32 {
        self.delta_x.get(pointer).copied().unwrap_or(0)
    }

    pub fn pointer_delta_y(&self, pointer: usize) -> i32 {
        self.delta_y.get(pointer).copied().unwrap_or(0)
    }

    pub fn is_touched(&self, pointer: usize) -> bool {
        self.touched.get(pointer).copied().unwrap_or(false)
    }

    pub fn any_touched(&self) -> bool {
        self.touched.iter().any(|t| *t)
    }

    pub fn is_key_pressed(&self, key_code: u32) -> bool {
        self.pressed_keys.contains(&key_code)
    }

    pub fn is_button_pressed(&self, button: usize) -> bool {
        self.buttons.get(button).copied().unwrap_or(false)
    }
}
