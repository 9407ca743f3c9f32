//! Discrete input events as drained from a host backend's native buffers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyEventKind {
    Down,
    Up,
    Typed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub kind: KeyEventKind,
    pub key_code: u32,
    pub key_char: char,
    pub timestamp_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointerEventKind {
    Down,
    Up,
    Dragged,
    Moved,
    Scrolled,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub kind: PointerEventKind,
    pub x: i32,
    pub y: i32,
    pub pointer: u32,
    pub button: u32,
    pub scroll_amount: i32,
    pub timestamp_ms: u64,
}

impl KeyEvent {
    pub fn down(key_code: u32, timestamp_ms: u64) -> Self {
        Self {
            kind: KeyEventKind::Down,
            key_code,
            key_char: '\0',
            timestamp_ms,
        }
    }

    pub fn up(key_code: u32, timestamp_ms: u64) -> Self {
        Self {
            kind: KeyEventKind::Up,
            key_code,
            key_char: '\0',
            timestamp_ms,
        }
    }

    pub fn typed(key_char: char, timestamp_ms: u64) -> Self {
        Self {
            kind: KeyEventKind::Typed,
            key_code: 0,
            key_char,
            timestamp_ms,
        }
    }
}

impl PointerEvent {
    pub fn new(kind: PointerEventKind, x: i32, y: i32, timestamp_ms: u64) -> Self {
        Self {
            kind,
            x,
            y,
            pointer: 0,
            button: 0,
            scroll_amount: 0,
            timestamp_ms,
        }
    }

    pub fn with_pointer(mut self, pointer: u32) -> Self {
        self.pointer = pointer;
        self
    }

    pub fn with_button(mut self, button: u32) -> Self {
        self.button = button;
        self
    }

    pub fn with_scroll(mut self, amount: i32) -> Self {
        self.scroll_amount = amount;
        self
    }
}
