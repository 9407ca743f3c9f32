//! Timed replay of a recorded session.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use tracing::{debug, warn};

use cassette_core::error::{Error, Result};
use cassette_core::proxy::{InputHandle, ListenerHandle};
use cassette_core::record::{DeltaRecord, SessionProperties, TextPromptKind};
use cassette_core::source::InputSource;

use crate::playback::PlaybackInput;
use crate::storage::RecordReader;

/// Gaps at or below this are not worth a thread wake; records this close
/// together are applied in one burst.
const MIN_SLEEP_MS: u64 = 10;

/// Lifecycle notifications for one playback run.
pub trait PlaybackListener: Send + Sync {
    fn on_start(&self) {}
    fn on_stop(&self) {}
    /// Pause state toggled mid-run.
    fn on_pause(&self, _paused: bool) {}
    /// The stream ran to its end. Fired exactly once per run, never after
    /// an explicit stop won the race.
    fn on_finish(&self) {}
    /// The stream is malformed; playback aborts.
    fn on_error(&self, _error: &Error) {}
}

struct Clock {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Replays one recording through a [`PlaybackInput`] spliced into the input
/// chain. Pacing runs on a dedicated clock thread; event dispatch stays on
/// the frame thread via [`process_events`](InputPlayer::process_events).
pub struct InputPlayer {
    input: Arc<InputHandle>,
    playback: Arc<PlaybackInput>,
    reader: Arc<Mutex<Box<dyn RecordReader>>>,
    properties: SessionProperties,
    listeners: Vec<Arc<dyn PlaybackListener>>,
    pending_delay: Arc<AtomicU64>,
    clock: Option<Clock>,
}

impl InputPlayer {
    pub fn new(
        reader: Box<dyn RecordReader>,
        input: Arc<InputHandle>,
        listener_handle: Arc<ListenerHandle>,
    ) -> Self {
        let properties = reader.session_properties();
        let playback = Arc::new(PlaybackInput::new(
            reader.static_capabilities(),
            reader.text_answers(TextPromptKind::Plain),
            reader.text_answers(TextPromptKind::Placeholder),
            listener_handle,
        ));
        Self {
            input,
            playback,
            reader: Arc::new(Mutex::new(reader)),
            properties,
            listeners: Vec::new(),
            pending_delay: Arc::new(AtomicU64::new(0)),
            clock: None,
        }
    }

    pub fn add_listener(&mut self, listener: Arc<dyn PlaybackListener>) {
        self.listeners.push(listener);
    }

    pub fn properties(&self) -> SessionProperties {
        self.properties
    }

    /// The substitute source, for hosts that want to poll it directly.
    pub fn playback_input(&self) -> Arc<PlaybackInput> {
        self.playback.clone()
    }

    /// Rewinds the recording, splices the playback source into the chain and
    /// starts the clock thread. Starting a playing player is a warned no-op.
    pub fn start_playback(&mut self) -> Result<()> {
        if self.clock.is_some() {
            warn!("start_playback while already playing");
            return Ok(());
        }
        self.reader.lock().reset()?;
        let node: Arc<dyn InputSource> = self.playback.clone();
        if !self.input.install(node) {
            return Err(Error::invalid_config(
                "cannot start playback: input handle is unset",
            ));
        }

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let reader = self.reader.clone();
        let playback = self.playback.clone();
        let pending_delay = self.pending_delay.clone();
        let denormalize = !self.properties.absolute_coords;
        let listeners: Arc<[Arc<dyn PlaybackListener>]> = self.listeners.clone().into();
        let handle = std::thread::spawn(move || {
            clock_loop(
                reader,
                playback,
                stop_rx,
                pending_delay,
                denormalize,
                listeners,
            )
        });
        self.clock = Some(Clock { stop_tx, handle });
        for listener in &self.listeners {
            listener.on_start();
        }
        debug!("playback started");
        Ok(())
    }

    /// Interrupts the clock thread and joins it, then removes the playback
    /// source from the chain. After this returns the snapshot no longer
    /// changes. Stopping an idle player is a warned no-op.
    pub fn stop_playback(&mut self) {
        let Some(clock) = self.clock.take() else {
            warn!("playback stopped while not playing");
            return;
        };
        let _ = clock.stop_tx.send(());
        if clock.handle.join().is_err() {
            warn!("playback clock thread panicked");
        }
        let node: Arc<dyn InputSource> = self.playback.clone();
        self.input.uninstall(&node);
        for listener in &self.listeners {
            listener.on_stop();
        }
        debug!("playback stopped");
    }

    /// True while the clock thread is alive. A finished stream counts as not
    /// playing even before [`stop_playback`](InputPlayer::stop_playback) is
    /// called.
    pub fn is_playing(&self) -> bool {
        self.clock
            .as_ref()
            .map_or(false, |c| !c.handle.is_finished())
    }

    /// Stretches the next pause by `ms`. Useful to wait out loading screens
    /// the recording did not capture.
    pub fn delay(&self, ms: u64) {
        self.pending_delay.fetch_add(ms, Ordering::AcqRel);
    }

    /// Freezes or resumes the clock and event dispatch. Paused time is not
    /// charged against the recording's gaps; the stream position is kept.
    pub fn set_playback_paused(&self, paused: bool) {
        self.playback.set_paused(paused);
        for listener in &self.listeners {
            listener.on_pause(paused);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.playback.is_paused()
    }

    /// Frame hook: dispatches buffered replayed events to the listener chain.
    pub fn process_events(&self) {
        self.playback.process_events();
    }
}

impl Drop for InputPlayer {
    fn drop(&mut self) {
        if self.clock.is_some() {
            self.stop_playback();
        }
    }
}

fn clock_loop(
    reader: Arc<Mutex<Box<dyn RecordReader>>>,
    playback: Arc<PlaybackInput>,
    stop_rx: Receiver<()>,
    pending_delay: Arc<AtomicU64>,
    denormalize: bool,
    listeners: Arc<[Arc<dyn PlaybackListener>]>,
) {
    // Record that overflowed the burst budget; applied after its gap.
    let mut held: Option<DeltaRecord> = None;
    loop {
        if !wait_while_paused(&playback, &stop_rx) {
            return;
        }
        let mut sleep_ms: u64 = 0;
        loop {
            let record = match held.take() {
                Some(r) => r,
                None => match reader.lock().next_delta() {
                    None => {
                        for listener in listeners.iter() {
                            listener.on_finish();
                        }
                        return;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "malformed record, aborting playback");
                        for listener in listeners.iter() {
                            listener.on_error(&e);
                        }
                        return;
                    }
                    Some(Ok(r)) => r,
                },
            };
            sleep_ms += record.time_delta_ms();
            if sleep_ms > MIN_SLEEP_MS {
                held = Some(record);
                break;
            }
            apply(&playback, record, denormalize);
        }

        sleep_ms += pending_delay.swap(0, Ordering::AcqRel);
        match stop_rx.recv_timeout(Duration::from_millis(sleep_ms)) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {}
        }
        if !wait_while_paused(&playback, &stop_rx) {
            return;
        }
        if let Some(record) = held.take() {
            apply(&playback, record, denormalize);
        }
    }
}

/// Parks the clock while playback is paused. Returns `false` when a stop
/// request ends the wait instead.
fn wait_while_paused(playback: &PlaybackInput, stop_rx: &Receiver<()>) -> bool {
    while playback.is_paused() {
        match stop_rx.recv_timeout(Duration::from_millis(MIN_SLEEP_MS)) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return false,
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
    true
}

fn apply(playback: &PlaybackInput, mut record: DeltaRecord, denormalize: bool) {
    if denormalize {
        // Replay-time viewport, read through the proxied live source.
        let (w, h) = playback.viewport_size();
        if w > 0 && h > 0 {
            record.denormalize(w, h);
        } else {
            warn!("viewport unavailable, applying fractional coordinates as-is");
        }
    }
    playback.apply(&record);
}
