//! Persisted data model: delta records, session properties, capabilities and
//! modal text answers.
//!
//! Coordinates travel as `f64` so both absolute pixel values and 0..=1
//! viewport fractions round-trip exactly.

use serde::{Deserialize, Serialize};

use crate::events::{KeyEventKind, PointerEventKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyTransition {
    Press,
    Release,
}

/// One change to the input state, tagged with the milliseconds elapsed since
/// the previous record in the stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "class")]
pub enum DeltaRecord {
    Accelerometer {
        time_delta_ms: u64,
        x: f32,
        y: f32,
        z: f32,
    },
    Orientation {
        time_delta_ms: u64,
        pitch: f32,
        roll: f32,
        azimuth: f32,
        orientation: i32,
        rotation_matrix: [f32; 16],
    },
    KeyPressed {
        time_delta_ms: u64,
        transition: KeyTransition,
        key_code: u32,
    },
    KeyEvent {
        time_delta_ms: u64,
        kind: KeyEventKind,
        key_code: u32,
        key_char: char,
    },
    PointerEvent {
        time_delta_ms: u64,
        kind: PointerEventKind,
        x: f64,
        y: f64,
        pointer: u32,
        button: u32,
        scroll_amount: i32,
    },
    Pointer {
        time_delta_ms: u64,
        pointer: u32,
        x: f64,
        y: f64,
        delta_x: f64,
        delta_y: f64,
        touched: bool,
    },
    Button {
        time_delta_ms: u64,
        button0: bool,
        button1: bool,
        button2: bool,
    },
}

impl DeltaRecord {
    pub fn time_delta_ms(&self) -> u64 {
        match self {
            DeltaRecord::Accelerometer { time_delta_ms, .. }
            | DeltaRecord::Orientation { time_delta_ms, .. }
            | DeltaRecord::KeyPressed { time_delta_ms, .. }
            | DeltaRecord::KeyEvent { time_delta_ms, .. }
            | DeltaRecord::PointerEvent { time_delta_ms, .. }
            | DeltaRecord::Pointer { time_delta_ms, .. }
            | DeltaRecord::Button { time_delta_ms, .. } => *time_delta_ms,
        }
    }

    /// Scales fractional coordinates up to pixels in the given viewport.
    /// Only the coordinate-bearing variants change.
    pub fn denormalize(&mut self, width: u32, height: u32) {
        let (w, h) = (width as f64, height as f64);
        match self {
            DeltaRecord::Pointer {
                x,
                y,
                delta_x,
                delta_y,
                ..
            } => {
                *x *= w;
                *y *= h;
                *delta_x *= w;
                *delta_y *= h;
            }
            DeltaRecord::PointerEvent { x, y, .. } => {
                *x *= w;
                *y *= h;
            }
            _ => {}
        }
    }

    /// Scales pixel coordinates down to viewport fractions.
    pub fn normalize(&mut self, width: u32, height: u32) {
        let w = width.max(1) as f64;
        let h = height.max(1) as f64;
        match self {
            DeltaRecord::Pointer {
                x,
                y,
                delta_x,
                delta_y,
                ..
            } => {
                *x /= w;
                *y /= h;
                *delta_x /= w;
                *delta_y /= h;
            }
            DeltaRecord::PointerEvent { x, y, .. } => {
                *x /= w;
                *y /= h;
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NativeOrientation {
    Landscape,
    Portrait,
}

impl Default for NativeOrientation {
    fn default() -> Self {
        NativeOrientation::Landscape
    }
}

/// Peripheral availability of the machine a session was recorded on.
/// Written once at the start of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StaticCapabilities {
    pub accelerometer: bool,
    pub compass: bool,
    pub hardware_keyboard: bool,
    pub onscreen_keyboard: bool,
    pub vibrator: bool,
    pub multitouch: bool,
    pub native_orientation: NativeOrientation,
}

/// Session-level flags a reader needs before interpreting any delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionProperties {
    pub absolute_coords: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextPromptKind {
    Plain,
    Placeholder,
}

/// The outcome of one modal text prompt. `text: None` records cancellation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextAnswer {
    pub kind: TextPromptKind,
    pub text: Option<String>,
}
