//! The capture session facade.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use cassette_core::error::{Error, Result};
use cassette_core::proxy::{InputHandle, ListenerHandle};
use cassette_core::record::SessionProperties;
use cassette_core::source::InputSource;

use crate::config::RecorderConfig;
use crate::storage::{RecordWriter, SharedWriter};
use crate::text::TextInputTracker;
use crate::tracker::StateTracker;

/// Invoked for I/O errors on the capture path. Capture continues degraded
/// after the callback returns.
pub type ErrorCallback = Arc<dyn Fn(&Error) + Send + Sync>;

fn log_error(error: &Error) {
    warn!(error = %error, "capture error");
}

/// One recording session over a host's input chains.
///
/// The host calls [`frame_start`](InputRecorder::frame_start) at the top of
/// every frame, before its backend dispatches native events.
pub struct InputRecorder {
    config: RecorderConfig,
    input: Arc<InputHandle>,
    writer: SharedWriter,
    tracker: StateTracker,
    text: Option<Arc<TextInputTracker>>,
    on_error: ErrorCallback,
    recording: bool,
}

impl InputRecorder {
    pub fn new(
        config: RecorderConfig,
        writer: Box<dyn RecordWriter>,
        input: Arc<InputHandle>,
        listeners: Arc<ListenerHandle>,
    ) -> Self {
        let writer: SharedWriter = Arc::new(Mutex::new(writer));
        let tracker = StateTracker::new(config.clone(), input.clone(), listeners, writer.clone());
        Self {
            config,
            input,
            writer,
            tracker,
            text: None,
            on_error: Arc::new(log_error),
            recording: false,
        }
    }

    /// Replaces the default log-only error callback. Takes effect at the
    /// next start.
    pub fn set_error_callback(&mut self, on_error: ErrorCallback) {
        self.on_error = on_error;
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Opens the writer, emits the session header, installs the text-prompt
    /// interceptor and starts the tracker. Starting while recording is a
    /// warned no-op.
    pub fn start_recording(&mut self) -> Result<()> {
        if self.recording {
            warn!("start_recording while already recording");
            return Ok(());
        }
        let Some(source) = self.input.current() else {
            return Err(Error::invalid_config(
                "cannot start recording: input handle is unset",
            ));
        };
        self.write_header(&source)?;

        let text = Arc::new(TextInputTracker::new(
            self.writer.clone(),
            self.on_error.clone(),
        ));
        let node: Arc<dyn InputSource> = text.clone();
        self.input.install(node);
        self.text = Some(text);

        self.tracker.start(self.on_error.clone());
        self.recording = true;
        info!("recording started");
        Ok(())
    }

    /// Stops the tracker, uninstalls the interceptor, flushes and closes the
    /// writer. Stopping while idle is a warned no-op. When this returns, all
    /// captured data has reached the writer.
    pub fn stop_recording(&mut self) -> Result<()> {
        if !self.recording {
            warn!("stop_recording while not recording");
            return Ok(());
        }
        self.tracker.stop();
        if let Some(text) = self.text.take() {
            let node: Arc<dyn InputSource> = text;
            self.input.uninstall(&node);
        }
        self.recording = false;

        let mut writer = self.writer.lock();
        writer.flush()?;
        writer.close()?;
        info!("recording stopped");
        Ok(())
    }

    /// Frame hook. Cheap when not recording.
    pub fn frame_start(&self) {
        if self.recording {
            self.tracker.frame_start();
        }
    }

    /// Swaps the record sink mid-session. A running session is paused, the
    /// old writer flushed and closed, and capture resumes into the new
    /// writer as a fresh stream with its own header and initial state.
    pub fn set_writer(&mut self, writer: Box<dyn RecordWriter>) -> Result<()> {
        let was_recording = self.recording;
        if was_recording {
            self.tracker.stop();
        }
        {
            let mut current = self.writer.lock();
            if was_recording {
                if let Err(e) = current.flush() {
                    warn!(error = %e, "old writer flush failed during swap");
                    (self.on_error)(&e);
                }
                if let Err(e) = current.close() {
                    warn!(error = %e, "old writer close failed during swap");
                    (self.on_error)(&e);
                }
            }
            *current = writer;
        }
        if was_recording {
            let Some(source) = self.input.current() else {
                self.recording = false;
                return Err(Error::invalid_config(
                    "input handle was unset during writer swap",
                ));
            };
            self.write_header(&source)?;
            self.tracker.start(self.on_error.clone());
        }
        Ok(())
    }

    fn write_header(&self, source: &Arc<dyn InputSource>) -> Result<()> {
        let mut writer = self.writer.lock();
        writer.open()?;
        writer.write_session_properties(&SessionProperties {
            absolute_coords: self.config.absolute_coords,
        })?;
        writer.write_static_capabilities(&source.capabilities())?;
        Ok(())
    }
}

impl Drop for InputRecorder {
    fn drop(&mut self) {
        if self.recording {
            if let Err(e) = self.stop_recording() {
                warn!(error = %e, "failed to stop recording on drop");
            }
        }
    }
}
