//! The substitute input source that replays a recorded session.

use std::collections::VecDeque;
use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use cassette_core::events::{KeyEvent, KeyEventKind, PointerEvent, PointerEventKind};
use cassette_core::proxy::ListenerHandle;
use cassette_core::record::{DeltaRecord, StaticCapabilities, TextPromptKind};
use cassette_core::snapshot::Snapshot;
use cassette_core::source::{InputSource, TextInputListener};

// Pointer slots a backend can report; replayed indices beyond this are
// silently dropped by the snapshot.
const PLAYBACK_POINTERS: usize = 20;

/// Input-chain node answering all polled queries from a snapshot that the
/// player's clock thread mutates in stream order. Hardware-flavored calls it
/// cannot answer from the recording fall through to the proxied live source.
pub struct PlaybackInput {
    state: Mutex<Snapshot>,
    capabilities: StaticCapabilities,
    text: Mutex<VecDeque<Option<String>>>,
    placeholder_text: Mutex<VecDeque<Option<String>>>,
    listeners: Arc<ListenerHandle>,
    proxied: Mutex<Option<Arc<dyn InputSource>>>,
    paused: AtomicBool,
}

impl PlaybackInput {
    pub fn new(
        capabilities: StaticCapabilities,
        text: Vec<Option<String>>,
        placeholder_text: Vec<Option<String>>,
        listeners: Arc<ListenerHandle>,
    ) -> Self {
        Self {
            state: Mutex::new(Snapshot::new(PLAYBACK_POINTERS)),
            capabilities,
            text: Mutex::new(text.into()),
            placeholder_text: Mutex::new(placeholder_text.into()),
            listeners,
            proxied: Mutex::new(None),
            paused: AtomicBool::new(false),
        }
    }

    /// While paused, buffered events stay put, polled state stops changing
    /// and text prompts are canceled without consuming the recorded answers.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Applies one denormalized delta to the live snapshot. Called by the
    /// clock thread.
    pub(crate) fn apply(&self, record: &DeltaRecord) {
        self.state.lock().apply(record);
    }

    /// Frame hook: dispatches the buffered events, key events first, then
    /// pointer events, each in stream order, to the current listener chain
    /// head. Without a listener the frame still reflects touch-downs through
    /// `just_touched`. Event-free frames zero the pointer deltas so polled
    /// movement does not repeat forever.
    pub fn process_events(&self) {
        if self.is_paused() {
            return;
        }
        let listener = self.listeners.current();
        let (key_events, pointer_events) = {
            let mut state = self.state.lock();
            state.just_touched = false;
            let key_events = mem::take(&mut state.key_events);
            let pointer_events = mem::take(&mut state.pointer_events);
            if pointer_events.is_empty() {
                state.delta_x.fill(0);
                state.delta_y.fill(0);
            }
            if listener.is_none() {
                state.just_touched = pointer_events
                    .iter()
                    .any(|e| e.kind == PointerEventKind::Down);
            }
            (key_events, pointer_events)
        };

        let Some(listener) = listener else {
            return;
        };
        for event in &key_events {
            dispatch_key(listener.as_ref(), event);
        }
        for event in &pointer_events {
            dispatch_pointer(listener.as_ref(), event);
        }
    }
}

fn dispatch_key(listener: &dyn cassette_core::source::InputListener, event: &KeyEvent) {
    match event.kind {
        KeyEventKind::Down => {
            listener.key_down(event.key_code);
        }
        KeyEventKind::Up => {
            listener.key_up(event.key_code);
        }
        KeyEventKind::Typed => {
            listener.key_typed(event.key_char);
        }
    }
}

fn dispatch_pointer(listener: &dyn cassette_core::source::InputListener, event: &PointerEvent) {
    match event.kind {
        PointerEventKind::Down => {
            listener.touch_down(event.x, event.y, event.pointer, event.button);
        }
        PointerEventKind::Up => {
            listener.touch_up(event.x, event.y, event.pointer, event.button);
        }
        PointerEventKind::Dragged => {
            listener.touch_dragged(event.x, event.y, event.pointer);
        }
        PointerEventKind::Moved => {
            listener.mouse_moved(event.x, event.y);
        }
        PointerEventKind::Scrolled => {
            listener.scrolled(event.scroll_amount);
        }
    }
}

impl InputSource for PlaybackInput {
    fn pointer_x(&self, pointer: usize) -> i32 {
        self.state.lock().pointer_x(pointer)
    }

    fn pointer_y(&self, pointer: usize) -> i32 {
        self.state.lock().pointer_y(pointer)
    }

    fn pointer_delta_x(&self, pointer: usize) -> i32 {
        self.state.lock().pointer_delta_x(pointer)
    }

    fn pointer_delta_y(&self, pointer: usize) -> i32 {
        self.state.lock().pointer_delta_y(pointer)
    }

    fn is_touched(&self, pointer: usize) -> bool {
        self.state.lock().is_touched(pointer)
    }

    fn just_touched(&self) -> bool {
        self.state.lock().just_touched
    }

    fn is_button_pressed(&self, button: usize) -> bool {
        self.state.lock().is_button_pressed(button)
    }

    fn is_key_pressed(&self, key_code: u32) -> bool {
        self.state.lock().is_key_pressed(key_code)
    }

    fn pressed_keys(&self) -> std::collections::HashSet<u32> {
        self.state.lock().pressed_keys.clone()
    }

    fn accelerometer(&self) -> [f32; 3] {
        self.state.lock().accelerometer
    }

    fn pitch(&self) -> f32 {
        self.state.lock().pitch
    }

    fn roll(&self) -> f32 {
        self.state.lock().roll
    }

    fn azimuth(&self) -> f32 {
        self.state.lock().azimuth
    }

    fn rotation_matrix(&self) -> [f32; 16] {
        self.state.lock().rotation_matrix
    }

    fn orientation(&self) -> i32 {
        self.state.lock().orientation
    }

    fn drain_key_events(&self) -> Vec<KeyEvent> {
        mem::take(&mut self.state.lock().key_events)
    }

    fn drain_pointer_events(&self) -> Vec<PointerEvent> {
        mem::take(&mut self.state.lock().pointer_events)
    }

    /// Answered from the recording, so replay does not depend on the replay
    /// machine's peripherals.
    fn capabilities(&self) -> StaticCapabilities {
        self.capabilities
    }

    /// Answers the prompt from the recorded queue for its kind; an exhausted
    /// queue cancels, like the original session would have seen. A paused
    /// player cancels without consuming an answer.
    fn request_text(
        &self,
        kind: TextPromptKind,
        _title: &str,
        listener: Arc<dyn TextInputListener>,
    ) {
        if self.is_paused() {
            listener.canceled();
            return;
        }
        let queue = match kind {
            TextPromptKind::Plain => &self.text,
            TextPromptKind::Placeholder => &self.placeholder_text,
        };
        match queue.lock().pop_front() {
            Some(Some(answer)) => listener.input(&answer),
            Some(None) | None => listener.canceled(),
        }
    }

    fn proxied(&self) -> Option<Arc<dyn InputSource>> {
        self.proxied.lock().clone()
    }

    fn set_proxied(&self, delegate: Option<Arc<dyn InputSource>>) {
        *self.proxied.lock() = delegate;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cassette_core::record::KeyTransition;
    use cassette_core::source::InputListener;

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        KeyDown(u32),
        Typed(char),
        TouchDown(i32, i32, u32, u32),
        Dragged(i32, i32, u32),
        Scrolled(i32),
    }

    struct Recorder {
        seen: Mutex<Vec<Seen>>,
    }

    impl Recorder {
        fn arc() -> Arc<Recorder> {
            Arc::new(Recorder {
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl InputListener for Recorder {
        fn key_down(&self, key_code: u32) -> bool {
            self.seen.lock().push(Seen::KeyDown(key_code));
            true
        }
        fn key_typed(&self, character: char) -> bool {
            self.seen.lock().push(Seen::Typed(character));
            true
        }
        fn touch_down(&self, x: i32, y: i32, pointer: u32, button: u32) -> bool {
            self.seen.lock().push(Seen::TouchDown(x, y, pointer, button));
            true
        }
        fn touch_dragged(&self, x: i32, y: i32, pointer: u32) -> bool {
            self.seen.lock().push(Seen::Dragged(x, y, pointer));
            true
        }
        fn scrolled(&self, amount: i32) -> bool {
            self.seen.lock().push(Seen::Scrolled(amount));
            true
        }
    }

    fn playback(listeners: Arc<ListenerHandle>) -> PlaybackInput {
        PlaybackInput::new(
            StaticCapabilities::default(),
            Vec::new(),
            Vec::new(),
            listeners,
        )
    }

    #[test]
    fn dispatch_order_is_keys_then_pointers_in_stream_order() {
        let listeners = Arc::new(ListenerHandle::new());
        let input = playback(listeners.clone());
        let recorder = Recorder::arc();
        listeners.set(Some(recorder.clone()));

        input.apply(&DeltaRecord::PointerEvent {
            time_delta_ms: 0,
            kind: PointerEventKind::Down,
            x: 100.0,
            y: 200.0,
            pointer: 0,
            button: 1,
            scroll_amount: 0,
        });
        input.apply(&DeltaRecord::KeyEvent {
            time_delta_ms: 0,
            kind: KeyEventKind::Down,
            key_code: 29,
            key_char: '\0',
        });
        input.apply(&DeltaRecord::KeyEvent {
            time_delta_ms: 0,
            kind: KeyEventKind::Typed,
            key_code: 0,
            key_char: 'a',
        });
        input.apply(&DeltaRecord::PointerEvent {
            time_delta_ms: 0,
            kind: PointerEventKind::Scrolled,
            x: 0.0,
            y: 0.0,
            pointer: 0,
            button: 0,
            scroll_amount: -1,
        });
        input.process_events();

        assert_eq!(
            recorder.seen.lock().as_slice(),
            &[
                Seen::KeyDown(29),
                Seen::Typed('a'),
                Seen::TouchDown(100, 200, 0, 1),
                Seen::Scrolled(-1),
            ]
        );
    }

    #[test]
    fn buffers_are_cleared_after_dispatch() {
        let listeners = Arc::new(ListenerHandle::new());
        let input = playback(listeners.clone());
        listeners.set(Some(Recorder::arc()));
        input.apply(&DeltaRecord::KeyEvent {
            time_delta_ms: 0,
            kind: KeyEventKind::Down,
            key_code: 29,
            key_char: '\0',
        });
        input.process_events();
        assert!(input.drain_key_events().is_empty());
    }

    #[test]
    fn just_touched_fallback_without_listener() {
        let listeners = Arc::new(ListenerHandle::new());
        let input = playback(listeners);
        input.apply(&DeltaRecord::PointerEvent {
            time_delta_ms: 0,
            kind: PointerEventKind::Down,
            x: 10.0,
            y: 10.0,
            pointer: 0,
            button: 0,
            scroll_amount: 0,
        });
        input.process_events();
        assert!(input.just_touched());
        input.process_events();
        assert!(!input.just_touched());
    }

    #[test]
    fn event_free_frame_zeroes_pointer_deltas() {
        let listeners = Arc::new(ListenerHandle::new());
        let input = playback(listeners);
        input.apply(&DeltaRecord::Pointer {
            time_delta_ms: 0,
            pointer: 1,
            x: 50.0,
            y: 60.0,
            delta_x: 5.0,
            delta_y: -3.0,
            touched: true,
        });
        assert_eq!(input.pointer_delta_x(1), 5);
        input.process_events();
        assert_eq!(input.pointer_delta_x(1), 0);
        assert_eq!(input.pointer_delta_y(1), 0);
        assert_eq!(input.pointer_x(1), 50);
        assert!(input.is_touched(1));
    }

    #[test]
    fn polled_state_follows_applied_records() {
        let listeners = Arc::new(ListenerHandle::new());
        let input = playback(listeners);
        input.apply(&DeltaRecord::KeyPressed {
            time_delta_ms: 0,
            transition: KeyTransition::Press,
            key_code: 62,
        });
        input.apply(&DeltaRecord::Button {
            time_delta_ms: 0,
            button0: true,
            button1: false,
            button2: false,
        });
        assert!(input.is_key_pressed(62));
        assert!(input.is_button_pressed(0));
        input.apply(&DeltaRecord::KeyPressed {
            time_delta_ms: 0,
            transition: KeyTransition::Release,
            key_code: 62,
        });
        assert!(!input.is_key_pressed(62));
    }

    #[test]
    fn paused_input_holds_events_until_resumed() {
        let listeners = Arc::new(ListenerHandle::new());
        let input = playback(listeners.clone());
        let recorder = Recorder::arc();
        listeners.set(Some(recorder.clone()));

        input.apply(&DeltaRecord::KeyEvent {
            time_delta_ms: 0,
            kind: KeyEventKind::Down,
            key_code: 29,
            key_char: '\0',
        });
        input.set_paused(true);
        input.process_events();
        assert!(recorder.seen.lock().is_empty());

        input.set_paused(false);
        input.process_events();
        assert_eq!(recorder.seen.lock().as_slice(), &[Seen::KeyDown(29)]);
    }

    #[test]
    fn paused_text_prompt_cancels_without_consuming_an_answer() {
        struct Answer {
            got: Mutex<Vec<Option<String>>>,
        }
        impl TextInputListener for Answer {
            fn input(&self, text: &str) {
                self.got.lock().push(Some(text.to_string()));
            }
            fn canceled(&self) {
                self.got.lock().push(None);
            }
        }

        let listeners = Arc::new(ListenerHandle::new());
        let input = PlaybackInput::new(
            StaticCapabilities::default(),
            vec![Some("Hello".to_string())],
            Vec::new(),
            listeners,
        );
        let answers = Arc::new(Answer {
            got: Mutex::new(Vec::new()),
        });
        input.set_paused(true);
        input.request_text(TextPromptKind::Plain, "a", answers.clone());
        input.set_paused(false);
        input.request_text(TextPromptKind::Plain, "a", answers.clone());
        assert_eq!(
            answers.got.lock().as_slice(),
            &[None, Some("Hello".to_string())]
        );
    }

    #[test]
    fn text_queues_answer_in_order_then_cancel() {
        struct Answer {
            got: Mutex<Vec<Option<String>>>,
        }
        impl TextInputListener for Answer {
            fn input(&self, text: &str) {
                self.got.lock().push(Some(text.to_string()));
            }
            fn canceled(&self) {
                self.got.lock().push(None);
            }
        }

        let listeners = Arc::new(ListenerHandle::new());
        let input = PlaybackInput::new(
            StaticCapabilities::default(),
            vec![Some("Hello".to_string()), None],
            Vec::new(),
            listeners,
        );
        let answers = Arc::new(Answer {
            got: Mutex::new(Vec::new()),
        });
        input.request_text(TextPromptKind::Plain, "a", answers.clone());
        input.request_text(TextPromptKind::Plain, "b", answers.clone());
        input.request_text(TextPromptKind::Plain, "c", answers.clone());
        assert_eq!(
            answers.got.lock().as_slice(),
            &[Some("Hello".to_string()), None, None]
        );
    }
}
