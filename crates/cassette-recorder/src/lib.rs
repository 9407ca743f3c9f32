//! cassette-recorder - Capture sessions and timed replay
//!
//! Records everything an application can observe about its input into a
//! stream of delta records, and plays such streams back through a substitute
//! input source with the original pacing.
//!
//! ## Capture
//!
//! [`InputRecorder`] owns a session: a frame-synchronous tracker, a
//! discrete-event grabber spliced into the listener chain, a background
//! diff-encoding thread and a text-prompt interceptor.
//!
//! ## Replay
//!
//! [`InputPlayer`] rewinds a [`storage::RecordReader`] and drives a
//! [`PlaybackInput`] from a clock thread, honoring the recorded gaps.

pub mod config;
pub mod memory;
pub mod playback;
pub mod player;
pub mod processor;
pub mod random;
pub mod session;
pub mod storage;
pub mod text;
pub mod tracker;

pub use config::RecorderConfig;
pub use memory::{MemoryRecordReader, MemoryRecordWriter};
pub use playback::PlaybackInput;
pub use player::{InputPlayer, PlaybackListener};
pub use processor::DiffEncoder;
pub use random::{RandomEventConfig, RandomEventReader};
pub use session::{ErrorCallback, InputRecorder};
pub use storage::{JsonRecordReader, JsonRecordWriter, RecordReader, RecordWriter};
pub use text::TextInputTracker;
pub use tracker::StateTracker;

pub mod prelude {
    pub use crate::config::RecorderConfig;
    pub use crate::memory::{MemoryRecordReader, MemoryRecordWriter};
    pub use crate::playback::PlaybackInput;
    pub use crate::player::{InputPlayer, PlaybackListener};
    pub use crate::session::InputRecorder;
    pub use crate::storage::{JsonRecordReader, JsonRecordWriter, RecordReader, RecordWriter};
}
