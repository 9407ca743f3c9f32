//! The seams between a host backend, the capture/replay machinery and
//! application code.
//!
//! `InputSource` is implemented both by the host's raw backend adapter (the
//! bottom of a proxy chain) and by every proxy node stacked on top of it.
//! Default method bodies delegate to the proxied source, so a node only
//! overrides what it intercepts; with no delegate the defaults answer
//! "nothing is happening".

use std::collections::HashSet;
use std::sync::Arc;

use crate::events::{KeyEvent, PointerEvent};
use crate::record::{StaticCapabilities, TextPromptKind};

/// Polled and drained access to one input device stack.
pub trait InputSource: Send + Sync {
    fn pointer_x(&self, pointer: usize) -> i32 {
        self.proxied().map_or(0, |p| p.pointer_x(pointer))
    }

    fn pointer_y(&self, pointer: usize) -> i32 {
        self.proxied().map_or(0, |p| p.pointer_y(pointer))
    }

    fn pointer_delta_x(&self, pointer: usize) -> i32 {
        self.proxied().map_or(0, |p| p.pointer_delta_x(pointer))
    }

    fn pointer_delta_y(&self, pointer: usize) -> i32 {
        self.proxied().map_or(0, |p| p.pointer_delta_y(pointer))
    }

    fn is_touched(&self, pointer: usize) -> bool {
        self.proxied().map_or(false, |p| p.is_touched(pointer))
    }

    fn just_touched(&self) -> bool {
        self.proxied().map_or(false, |p| p.just_touched())
    }

    fn is_button_pressed(&self, button: usize) -> bool {
        self.proxied().map_or(false, |p| p.is_button_pressed(button))
    }

    fn is_key_pressed(&self, key_code: u32) -> bool {
        self.proxied().map_or(false, |p| p.is_key_pressed(key_code))
    }

    fn pressed_keys(&self) -> HashSet<u32> {
        self.proxied().map_or_else(HashSet::new, |p| p.pressed_keys())
    }

    fn accelerometer(&self) -> [f32; 3] {
        self.proxied().map_or([0.0; 3], |p| p.accelerometer())
    }

    fn pitch(&self) -> f32 {
        self.proxied().map_or(0.0, |p| p.pitch())
    }

    fn roll(&self) -> f32 {
        self.proxied().map_or(0.0, |p| p.roll())
    }

    fn azimuth(&self) -> f32 {
        self.proxied().map_or(0.0, |p| p.azimuth())
    }

    fn rotation_matrix(&self) -> [f32; 16] {
        self.proxied().map_or([0.0; 16], |p| p.rotation_matrix())
    }

    fn orientation(&self) -> i32 {
        self.proxied().map_or(0, |p| p.orientation())
    }

    /// Removes and returns the key events buffered since the last drain.
    fn drain_key_events(&self) -> Vec<KeyEvent> {
        self.proxied().map_or_else(Vec::new, |p| p.drain_key_events())
    }

    /// Removes and returns the pointer events buffered since the last drain.
    fn drain_pointer_events(&self) -> Vec<PointerEvent> {
        self.proxied()
            .map_or_else(Vec::new, |p| p.drain_pointer_events())
    }

    fn capabilities(&self) -> StaticCapabilities {
        self.proxied()
            .map_or_else(StaticCapabilities::default, |p| p.capabilities())
    }

    fn viewport_size(&self) -> (u32, u32) {
        self.proxied().map_or((0, 0), |p| p.viewport_size())
    }

    /// Opens a modal text prompt. The listener is answered exactly once,
    /// possibly asynchronously; with no delegate the prompt is cancelled.
    fn request_text(&self, kind: TextPromptKind, title: &str, listener: Arc<dyn TextInputListener>) {
        match self.proxied() {
            Some(p) => p.request_text(kind, title, listener),
            None => listener.canceled(),
        }
    }

    /// The next source down the chain, if this node proxies one.
    fn proxied(&self) -> Option<Arc<dyn InputSource>> {
        None
    }

    /// Re-points this node at a new delegate. Raw backend adapters ignore it.
    fn set_proxied(&self, _delegate: Option<Arc<dyn InputSource>>) {}
}

/// Application-facing event callbacks, dispatched in native drain order.
/// Defaults delegate down the listener chain.
pub trait InputListener: Send + Sync {
    fn key_down(&self, key_code: u32) -> bool {
        self.proxied_listener().map_or(false, |p| p.key_down(key_code))
    }

    fn key_up(&self, key_code: u32) -> bool {
        self.proxied_listener().map_or(false, |p| p.key_up(key_code))
    }

    fn key_typed(&self, character: char) -> bool {
        self.proxied_listener()
            .map_or(false, |p| p.key_typed(character))
    }

    fn touch_down(&self, x: i32, y: i32, pointer: u32, button: u32) -> bool {
        self.proxied_listener()
            .map_or(false, |p| p.touch_down(x, y, pointer, button))
    }

    fn touch_up(&self, x: i32, y: i32, pointer: u32, button: u32) -> bool {
        self.proxied_listener()
            .map_or(false, |p| p.touch_up(x, y, pointer, button))
    }

    fn touch_dragged(&self, x: i32, y: i32, pointer: u32) -> bool {
        self.proxied_listener()
            .map_or(false, |p| p.touch_dragged(x, y, pointer))
    }

    fn mouse_moved(&self, x: i32, y: i32) -> bool {
        self.proxied_listener().map_or(false, |p| p.mouse_moved(x, y))
    }

    fn scrolled(&self, amount: i32) -> bool {
        self.proxied_listener().map_or(false, |p| p.scrolled(amount))
    }

    fn proxied_listener(&self) -> Option<Arc<dyn InputListener>> {
        None
    }

    fn set_proxied_listener(&self, _delegate: Option<Arc<dyn InputListener>>) {}
}

/// Receives the answer to one modal text prompt.
pub trait TextInputListener: Send + Sync {
    fn input(&self, text: &str);
    fn canceled(&self);
}
