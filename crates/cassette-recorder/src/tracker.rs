//! Frame-synchronous snapshot production and the background processor thread.
//!
//! The frame thread appends one pooled snapshot per frame to a filling
//! buffer. A discrete-event grabber spliced into the listener chain arms at
//! the top of every frame and, on the first event it sees, drains the native
//! event buffers into that frame's snapshot exactly once. The processor
//! thread parks on a condvar, swaps the filling buffer for its drained one
//! when enough snapshots accumulate, and diff-encodes the batch to the
//! record writer without holding the buffer lock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use cassette_core::mask::CategoryMask;
use cassette_core::pool::SnapshotPool;
use cassette_core::proxy::{InputHandle, ListenerHandle};
use cassette_core::snapshot::Snapshot;
use cassette_core::source::{InputListener, InputSource};

use crate::config::RecorderConfig;
use crate::processor::DiffEncoder;
use crate::session::ErrorCallback;
use crate::storage::SharedWriter;

/// Buffered snapshots that wake the processor thread.
pub(crate) const SNAPSHOTS_UNTIL_PROCESS: usize = 20;
const POOL_CAPACITY: usize = 50;

struct Buffer {
    filling: Vec<Snapshot>,
    pool: SnapshotPool,
}

struct Shared {
    buffer: Mutex<Buffer>,
    wake: Condvar,
    stop: AtomicBool,
}

/// Listener-chain node that captures the discrete-event channel groups at
/// native drain time, at most once per frame.
pub struct EventGrabber {
    armed: AtomicBool,
    shared: Arc<Shared>,
    input: Arc<InputHandle>,
    drain_mask: CategoryMask,
    delegate: Mutex<Option<Arc<dyn InputListener>>>,
}

impl EventGrabber {
    fn new(shared: Arc<Shared>, input: Arc<InputHandle>, drain_mask: CategoryMask) -> Self {
        Self {
            armed: AtomicBool::new(false),
            shared,
            input,
            drain_mask,
            delegate: Mutex::new(None),
        }
    }

    /// Arms the grabber for the coming frame. Arming an already armed
    /// grabber has no effect.
    pub fn rearm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::Release);
    }

    /// First event of the frame: drain the native buffers into the frame's
    /// snapshot, then stay disarmed until the next frame.
    fn capture_once(&self) {
        if !self.armed.swap(false, Ordering::AcqRel) {
            return;
        }
        let Some(source) = self.input.current() else {
            return;
        };
        let mut buffer = self.shared.buffer.lock();
        if let Some(snapshot) = buffer.filling.last_mut() {
            let at = snapshot.timestamp_ms;
            snapshot.capture(source.as_ref(), self.drain_mask, at);
        }
    }

    fn forward(&self) -> Option<Arc<dyn InputListener>> {
        self.delegate.lock().clone()
    }
}

impl InputListener for EventGrabber {
    fn key_down(&self, key_code: u32) -> bool {
        self.capture_once();
        self.forward().map_or(false, |p| p.key_down(key_code))
    }

    fn key_up(&self, key_code: u32) -> bool {
        self.capture_once();
        self.forward().map_or(false, |p| p.key_up(key_code))
    }

    fn key_typed(&self, character: char) -> bool {
        self.capture_once();
        self.forward().map_or(false, |p| p.key_typed(character))
    }

    fn touch_down(&self, x: i32, y: i32, pointer: u32, button: u32) -> bool {
        self.capture_once();
        self.forward()
            .map_or(false, |p| p.touch_down(x, y, pointer, button))
    }

    fn touch_up(&self, x: i32, y: i32, pointer: u32, button: u32) -> bool {
        self.capture_once();
        self.forward()
            .map_or(false, |p| p.touch_up(x, y, pointer, button))
    }

    fn touch_dragged(&self, x: i32, y: i32, pointer: u32) -> bool {
        self.capture_once();
        self.forward()
            .map_or(false, |p| p.touch_dragged(x, y, pointer))
    }

    fn mouse_moved(&self, x: i32, y: i32) -> bool {
        self.capture_once();
        self.forward().map_or(false, |p| p.mouse_moved(x, y))
    }

    fn scrolled(&self, amount: i32) -> bool {
        self.capture_once();
        self.forward().map_or(false, |p| p.scrolled(amount))
    }

    fn proxied_listener(&self) -> Option<Arc<dyn InputListener>> {
        self.forward()
    }

    fn set_proxied_listener(&self, delegate: Option<Arc<dyn InputListener>>) {
        *self.delegate.lock() = delegate;
    }
}

/// Owns the snapshot buffers, the grabber and the processor thread for one
/// capture session.
pub struct StateTracker {
    shared: Arc<Shared>,
    grabber: Arc<EventGrabber>,
    input: Arc<InputHandle>,
    listeners: Arc<ListenerHandle>,
    writer: SharedWriter,
    config: RecorderConfig,
    frame_mask: CategoryMask,
    epoch: Instant,
    worker: Option<JoinHandle<()>>,
}

impl StateTracker {
    pub fn new(
        config: RecorderConfig,
        input: Arc<InputHandle>,
        listeners: Arc<ListenerHandle>,
        writer: SharedWriter,
    ) -> Self {
        let shared = Arc::new(Shared {
            buffer: Mutex::new(Buffer {
                filling: Vec::with_capacity(SNAPSHOTS_UNTIL_PROCESS * 2),
                pool: SnapshotPool::new(POOL_CAPACITY),
            }),
            wake: Condvar::new(),
            stop: AtomicBool::new(false),
        });
        let grabber = Arc::new(EventGrabber::new(
            shared.clone(),
            input.clone(),
            config.categories().event_captured(),
        ));
        let frame_mask = config.categories().frame_copied();
        Self {
            shared,
            grabber,
            input,
            listeners,
            writer,
            config,
            frame_mask,
            epoch: Instant::now(),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Installs the grabber and spawns the processor thread. Starting a
    /// running tracker is a warned no-op.
    pub fn start(&mut self, on_error: ErrorCallback) {
        if self.worker.is_some() {
            warn!("state tracker started twice");
            return;
        }
        self.epoch = Instant::now();
        self.shared.stop.store(false, Ordering::Release);
        {
            let mut buffer = self.shared.buffer.lock();
            buffer.filling.clear();
        }

        let node: Arc<dyn InputListener> = self.grabber.clone();
        self.listeners.install(node);

        let shared = self.shared.clone();
        let encoder = DiffEncoder::new(&self.config);
        let writer = self.writer.clone();
        let input = self.input.clone();
        let absolute = self.config.absolute_coords;
        self.worker = Some(std::thread::spawn(move || {
            processor_loop(shared, encoder, writer, input, absolute, on_error)
        }));
        debug!("state tracker started");
    }

    /// Signals the processor, drains whatever is buffered and joins the
    /// thread. Stopping a stopped tracker is a warned no-op. After this
    /// returns no further records reach the writer.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            warn!("state tracker stopped twice");
            return;
        };
        self.grabber.disarm();
        let node: Arc<dyn InputListener> = self.grabber.clone();
        self.listeners.uninstall(&node);
        self.shared.stop.store(true, Ordering::Release);
        self.shared.wake.notify_one();
        if worker.join().is_err() {
            warn!("processor thread panicked");
        }
        debug!("state tracker stopped");
    }

    /// Frame hook. Re-arms the grabber, then captures the cheap channel
    /// groups into a pooled snapshot and appends it to the filling buffer.
    pub fn frame_start(&self) {
        if self.worker.is_none() {
            return;
        }
        self.grabber.rearm();
        let Some(source) = self.input.current() else {
            return;
        };
        let now = self.epoch.elapsed().as_millis() as u64;
        let mut buffer = self.shared.buffer.lock();
        let mut snapshot = buffer.pool.obtain();
        snapshot.reset(self.config.pointer_count);
        snapshot.capture(source.as_ref(), self.frame_mask, now);
        buffer.filling.push(snapshot);
        if buffer.filling.len() >= SNAPSHOTS_UNTIL_PROCESS {
            self.shared.wake.notify_one();
        }
    }
}

impl Drop for StateTracker {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.stop();
        }
    }
}

/// Swaps the filling buffer for the drained batch. While capture is running
/// the newest snapshot stays behind, so a grabber drain racing the swap still
/// lands in the current frame rather than the next one; the final drain on
/// stop takes everything.
fn take_batch(buffer: &mut Buffer, batch: &mut Vec<Snapshot>, stopping: bool) {
    std::mem::swap(&mut buffer.filling, batch);
    if !stopping {
        if let Some(current) = batch.pop() {
            buffer.filling.push(current);
        }
    }
}

fn processor_loop(
    shared: Arc<Shared>,
    mut encoder: DiffEncoder,
    writer: SharedWriter,
    input: Arc<InputHandle>,
    absolute: bool,
    on_error: ErrorCallback,
) {
    let mut batch: Vec<Snapshot> = Vec::new();
    loop {
        let stopping;
        {
            let mut buffer = shared.buffer.lock();
            while buffer.filling.len() < SNAPSHOTS_UNTIL_PROCESS
                && !shared.stop.load(Ordering::Acquire)
            {
                shared.wake.wait(&mut buffer);
            }
            stopping = shared.stop.load(Ordering::Acquire);
            take_batch(&mut buffer, &mut batch, stopping);
        }

        if !batch.is_empty() {
            // Capture-time viewport, only consulted in fractional mode.
            let viewport = if absolute {
                (0, 0)
            } else {
                input.current().map_or((0, 0), |s| s.viewport_size())
            };
            {
                let mut writer = writer.lock();
                for snapshot in &batch {
                    if let Err(e) = encoder.encode(snapshot, viewport, writer.as_mut()) {
                        warn!(error = %e, "failed to encode snapshot, continuing");
                        on_error(&e);
                    }
                }
            }
            let mut buffer = shared.buffer.lock();
            for snapshot in batch.drain(..) {
                buffer.pool.give_back(snapshot);
            }
        }

        if stopping {
            break;
        }
    }
}
