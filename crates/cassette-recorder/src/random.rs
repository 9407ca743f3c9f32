//! Seeded pseudo-random record source for monkey-style replay.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use cassette_core::error::Result;
use cassette_core::events::{KeyEventKind, PointerEventKind};
use cassette_core::record::{
    DeltaRecord, SessionProperties, StaticCapabilities, TextPromptKind,
};

use crate::storage::RecordReader;

#[derive(Debug, Clone)]
pub struct RandomEventConfig {
    pub seed: u64,
    /// Records produced before the stream ends.
    pub event_count: usize,
    /// Viewport the generated absolute coordinates stay inside.
    pub viewport: (u32, u32),
    /// Gap between records is drawn from 1..=this, in milliseconds.
    pub max_gap_ms: u64,
}

impl Default for RandomEventConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            event_count: 100,
            viewport: (800, 600),
            max_gap_ms: 40,
        }
    }
}

/// Generates a plausible stream of pointer gestures and key taps. The same
/// seed always yields the same stream, so a flaky test run can be replayed.
/// Text prompts are never answered; the playback side cancels them.
pub struct RandomEventReader {
    config: RandomEventConfig,
    rng: SmallRng,
    remaining: usize,
    touched: bool,
    x: i32,
    y: i32,
    held_key: Option<u32>,
}

impl RandomEventReader {
    pub fn new(config: RandomEventConfig) -> Self {
        let mut reader = Self {
            rng: SmallRng::seed_from_u64(config.seed),
            remaining: config.event_count,
            touched: false,
            x: config.viewport.0 as i32 / 2,
            y: config.viewport.1 as i32 / 2,
            held_key: None,
            config,
        };
        reader.rewind();
        reader
    }

    fn rewind(&mut self) {
        self.rng = SmallRng::seed_from_u64(self.config.seed);
        self.remaining = self.config.event_count;
        self.touched = false;
        self.x = self.config.viewport.0 as i32 / 2;
        self.y = self.config.viewport.1 as i32 / 2;
        self.held_key = None;
    }

    fn nudge(&mut self) {
        let (w, h) = self.config.viewport;
        self.x = (self.x + self.rng.gen_range(-60..=60)).clamp(0, w as i32 - 1);
        self.y = (self.y + self.rng.gen_range(-60..=60)).clamp(0, h as i32 - 1);
    }

    fn pointer_event(&mut self, kind: PointerEventKind, time_delta_ms: u64) -> DeltaRecord {
        DeltaRecord::PointerEvent {
            time_delta_ms,
            kind,
            x: self.x as f64,
            y: self.y as f64,
            pointer: 0,
            button: 0,
            scroll_amount: 0,
        }
    }

    fn generate(&mut self) -> DeltaRecord {
        let gap = self.rng.gen_range(1..=self.config.max_gap_ms);
        if self.touched {
            // mid-gesture: mostly drag, sometimes release
            if self.rng.gen_bool(0.7) {
                self.nudge();
                self.pointer_event(PointerEventKind::Dragged, gap)
            } else {
                self.touched = false;
                self.pointer_event(PointerEventKind::Up, gap)
            }
        } else if let Some(key_code) = self.held_key.take() {
            DeltaRecord::KeyEvent {
                time_delta_ms: gap,
                kind: KeyEventKind::Up,
                key_code,
                key_char: '\0',
            }
        } else {
            match self.rng.gen_range(0..10) {
                0..=3 => {
                    self.nudge();
                    self.pointer_event(PointerEventKind::Moved, gap)
                }
                4..=6 => {
                    self.touched = true;
                    self.pointer_event(PointerEventKind::Down, gap)
                }
                7..=8 => {
                    let key_code = self.rng.gen_range(29..=54);
                    self.held_key = Some(key_code);
                    DeltaRecord::KeyEvent {
                        time_delta_ms: gap,
                        kind: KeyEventKind::Down,
                        key_code,
                        key_char: '\0',
                    }
                }
                _ => DeltaRecord::PointerEvent {
                    time_delta_ms: gap,
                    kind: PointerEventKind::Scrolled,
                    x: self.x as f64,
                    y: self.y as f64,
                    pointer: 0,
                    button: 0,
                    scroll_amount: if self.rng.gen_bool(0.5) { 1 } else { -1 },
                },
            }
        }
    }
}

impl RecordReader for RandomEventReader {
    fn session_properties(&self) -> SessionProperties {
        SessionProperties {
            absolute_coords: true,
        }
    }

    fn static_capabilities(&self) -> StaticCapabilities {
        StaticCapabilities::default()
    }

    fn next_delta(&mut self) -> Option<Result<DeltaRecord>> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(Ok(self.generate()))
    }

    fn reset(&mut self) -> Result<()> {
        self.rewind();
        Ok(())
    }

    fn text_answers(&self, _kind: TextPromptKind) -> Vec<Option<String>> {
        Vec::new()
    }
}
