//! Turns buffered snapshots into the minimal stream of delta records.

use cassette_core::error::Result;
use cassette_core::mask::CategoryMask;
use cassette_core::record::{DeltaRecord, KeyTransition};
use cassette_core::snapshot::Snapshot;

use crate::config::RecorderConfig;
use crate::storage::RecordWriter;

/// Stateful change detector. Feed it snapshots in capture order; it writes
/// one delta record per changed channel and per buffered discrete event.
///
/// The milliseconds elapsed since the previous snapshot are a budget carried
/// by the first record emitted for a snapshot; every later record in the same
/// batch gets zero. A snapshot that emits nothing leaves its budget to the
/// next one, so the deltas in the stream always sum to the wall-clock gap
/// between the records around an idle stretch. Replay reconstructs pacing by
/// summing the deltas.
pub struct DiffEncoder {
    mask: CategoryMask,
    pointer_count: usize,
    absolute_coords: bool,
    previous: Option<Snapshot>,
    time_budget: u64,
}

impl DiffEncoder {
    pub fn new(config: &RecorderConfig) -> Self {
        Self {
            mask: config.categories(),
            pointer_count: config.pointer_count,
            absolute_coords: config.absolute_coords,
            previous: None,
            time_budget: 0,
        }
    }

    /// Encodes one snapshot against the running baseline. `viewport` is the
    /// capture-time viewport, used only in fractional-coordinate mode.
    pub fn encode(
        &mut self,
        snapshot: &Snapshot,
        viewport: (u32, u32),
        writer: &mut dyn RecordWriter,
    ) -> Result<()> {
        self.time_budget += match &self.previous {
            Some(prev) => snapshot.timestamp_ms.saturating_sub(prev.timestamp_ms),
            None => 0,
        };

        if self.mask.contains(CategoryMask::BUTTONS) {
            self.encode_buttons(snapshot, writer)?;
        }
        if self.mask.contains(CategoryMask::KEY_EVENTS) {
            self.encode_key_events(snapshot, writer)?;
        }
        if self.mask.contains(CategoryMask::KEYS_PRESSED) {
            self.encode_key_transitions(snapshot, writer)?;
        }
        if self.mask.contains(CategoryMask::ORIENTATION) {
            self.encode_orientation(snapshot, writer)?;
        }
        if self.mask.contains(CategoryMask::POINTERS) {
            self.encode_pointers(snapshot, viewport, writer)?;
        }
        if self.mask.contains(CategoryMask::POINTER_EVENTS) {
            self.encode_pointer_events(snapshot, viewport, writer)?;
        }

        let previous = self
            .previous
            .get_or_insert_with(|| Snapshot::new(self.pointer_count));
        previous.copy_from(snapshot, self.mask.frame_copied());
        Ok(())
    }

    fn take_budget(&mut self) -> u64 {
        std::mem::take(&mut self.time_budget)
    }

    fn encode_buttons(&mut self, snapshot: &Snapshot, writer: &mut dyn RecordWriter) -> Result<()> {
        let changed = match &self.previous {
            Some(prev) => prev.buttons != snapshot.buttons,
            None => true,
        };
        if changed {
            writer.write_delta(&DeltaRecord::Button {
                time_delta_ms: self.take_budget(),
                button0: snapshot.buttons[0],
                button1: snapshot.buttons[1],
                button2: snapshot.buttons[2],
            })?;
        }
        Ok(())
    }

    fn encode_key_events(
        &mut self,
        snapshot: &Snapshot,
        writer: &mut dyn RecordWriter,
    ) -> Result<()> {
        for event in &snapshot.key_events {
            writer.write_delta(&DeltaRecord::KeyEvent {
                time_delta_ms: self.take_budget(),
                kind: event.kind,
                key_code: event.key_code,
                key_char: event.key_char,
            })?;
        }
        Ok(())
    }

    fn encode_key_transitions(
        &mut self,
        snapshot: &Snapshot,
        writer: &mut dyn RecordWriter,
    ) -> Result<()> {
        // Sorted so the stream is deterministic regardless of set order.
        let mut presses: Vec<u32> = match &self.previous {
            Some(prev) => snapshot
                .pressed_keys
                .difference(&prev.pressed_keys)
                .copied()
                .collect(),
            None => snapshot.pressed_keys.iter().copied().collect(),
        };
        presses.sort_unstable();
        let mut releases: Vec<u32> = match &self.previous {
            Some(prev) => prev
                .pressed_keys
                .difference(&snapshot.pressed_keys)
                .copied()
                .collect(),
            None => Vec::new(),
        };
        releases.sort_unstable();

        for key_code in presses {
            writer.write_delta(&DeltaRecord::KeyPressed {
                time_delta_ms: self.take_budget(),
                transition: KeyTransition::Press,
                key_code,
            })?;
        }
        for key_code in releases {
            writer.write_delta(&DeltaRecord::KeyPressed {
                time_delta_ms: self.take_budget(),
                transition: KeyTransition::Release,
                key_code,
            })?;
        }
        Ok(())
    }

    fn encode_orientation(
        &mut self,
        snapshot: &Snapshot,
        writer: &mut dyn RecordWriter,
    ) -> Result<()> {
        let (accel_changed, attitude_changed) = match &self.previous {
            Some(prev) => (
                prev.accelerometer != snapshot.accelerometer,
                prev.pitch != snapshot.pitch
                    || prev.roll != snapshot.roll
                    || prev.azimuth != snapshot.azimuth
                    || prev.orientation != snapshot.orientation
                    || prev.rotation_matrix != snapshot.rotation_matrix,
            ),
            None => (true, true),
        };
        if accel_changed {
            writer.write_delta(&DeltaRecord::Accelerometer {
                time_delta_ms: self.take_budget(),
                x: snapshot.accelerometer[0],
                y: snapshot.accelerometer[1],
                z: snapshot.accelerometer[2],
            })?;
        }
        if attitude_changed {
            writer.write_delta(&DeltaRecord::Orientation {
                time_delta_ms: self.take_budget(),
                pitch: snapshot.pitch,
                roll: snapshot.roll,
                azimuth: snapshot.azimuth,
                orientation: snapshot.orientation,
                rotation_matrix: snapshot.rotation_matrix,
            })?;
        }
        Ok(())
    }

    fn encode_pointers(
        &mut self,
        snapshot: &Snapshot,
        viewport: (u32, u32),
        writer: &mut dyn RecordWriter,
    ) -> Result<()> {
        for i in 0..self.pointer_count.min(snapshot.pointer_count()) {
            let changed = match &self.previous {
                Some(prev) => {
                    prev.pointer_x(i) != snapshot.x[i]
                        || prev.pointer_y(i) != snapshot.y[i]
                        || prev.pointer_delta_x(i) != snapshot.delta_x[i]
                        || prev.pointer_delta_y(i) != snapshot.delta_y[i]
                        || prev.is_touched(i) != snapshot.touched[i]
                }
                None => true,
            };
            if !changed {
                continue;
            }
            let mut record = DeltaRecord::Pointer {
                time_delta_ms: self.take_budget(),
                pointer: i as u32,
                x: snapshot.x[i] as f64,
                y: snapshot.y[i] as f64,
                delta_x: snapshot.delta_x[i] as f64,
                delta_y: snapshot.delta_y[i] as f64,
                touched: snapshot.touched[i],
            };
            if !self.absolute_coords {
                record.normalize(viewport.0, viewport.1);
            }
            writer.write_delta(&record)?;
        }
        Ok(())
    }

    fn encode_pointer_events(
        &mut self,
        snapshot: &Snapshot,
        viewport: (u32, u32),
        writer: &mut dyn RecordWriter,
    ) -> Result<()> {
        for event in &snapshot.pointer_events {
            let mut record = DeltaRecord::PointerEvent {
                time_delta_ms: self.time_budget,
                kind: event.kind,
                x: event.x as f64,
                y: event.y as f64,
                pointer: event.pointer,
                button: event.button,
                scroll_amount: event.scroll_amount,
            };
            self.time_budget = 0;
            if !self.absolute_coords {
                record.normalize(viewport.0, viewport.1);
            }
            writer.write_delta(&record)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRecordWriter;
    use crate::storage::RecordReader;
    use cassette_core::events::{KeyEvent, PointerEvent, PointerEventKind};

    fn drain(writer: &MemoryRecordWriter) -> Vec<DeltaRecord> {
        let mut reader = writer.reader();
        let mut out = Vec::new();
        while let Some(r) = reader.next_delta() {
            out.push(r.unwrap());
        }
        out
    }

    fn open_writer() -> MemoryRecordWriter {
        let mut w = MemoryRecordWriter::new();
        w.open().unwrap();
        w
    }

    fn config() -> RecorderConfig {
        RecorderConfig {
            pointer_count: 2,
            ..Default::default()
        }
    }

    #[test]
    fn unchanged_snapshot_emits_nothing() {
        let mut writer = open_writer();
        let mut encoder = DiffEncoder::new(&config());
        let mut snap = Snapshot::new(2);
        snap.timestamp_ms = 100;
        encoder.encode(&snap, (800, 600), &mut writer).unwrap();
        let initial = writer.delta_count();
        assert!(initial > 0);

        snap.timestamp_ms = 116;
        encoder.encode(&snap, (800, 600), &mut writer).unwrap();
        assert_eq!(writer.delta_count(), initial);
    }

    #[test]
    fn budget_goes_to_first_record_only() {
        let mut writer = open_writer();
        let mut encoder = DiffEncoder::new(&config());
        let mut snap = Snapshot::new(2);
        snap.timestamp_ms = 0;
        encoder.encode(&snap, (800, 600), &mut writer).unwrap();

        let mut writer2 = open_writer();
        snap.timestamp_ms = 500;
        snap.buttons[0] = true;
        snap.x[0] = 10;
        snap.pressed_keys.insert(29);
        encoder.encode(&snap, (800, 600), &mut writer2).unwrap();

        let records = drain(&writer2);
        assert!(records.len() >= 3);
        assert_eq!(records[0].time_delta_ms(), 500);
        for record in &records[1..] {
            assert_eq!(record.time_delta_ms(), 0);
        }
    }

    #[test]
    fn key_transitions_are_press_and_release_only() {
        let mut writer = open_writer();
        let mut encoder = DiffEncoder::new(&config());
        let mut snap = Snapshot::new(2);
        snap.pressed_keys.insert(29);
        snap.pressed_keys.insert(30);
        encoder.encode(&snap, (800, 600), &mut writer).unwrap();

        // held key 29 must not re-emit; 30 released, 31 pressed
        let mut writer2 = open_writer();
        snap.timestamp_ms = 16;
        snap.pressed_keys.remove(&30);
        snap.pressed_keys.insert(31);
        encoder.encode(&snap, (800, 600), &mut writer2).unwrap();

        let transitions: Vec<(KeyTransition, u32)> = drain(&writer2)
            .into_iter()
            .filter_map(|r| match r {
                DeltaRecord::KeyPressed {
                    transition,
                    key_code,
                    ..
                } => Some((transition, key_code)),
                _ => None,
            })
            .collect();
        assert_eq!(
            transitions,
            vec![
                (KeyTransition::Press, 31),
                (KeyTransition::Release, 30)
            ]
        );
    }

    #[test]
    fn discrete_events_emit_one_record_each() {
        let mut writer = open_writer();
        let mut encoder = DiffEncoder::new(&config());
        let mut snap = Snapshot::new(2);
        snap.key_events.push(KeyEvent::down(29, 0));
        snap.key_events.push(KeyEvent::typed('a', 0));
        snap.pointer_events
            .push(PointerEvent::new(PointerEventKind::Down, 100, 200, 0));
        encoder.encode(&snap, (800, 600), &mut writer).unwrap();

        let records = drain(&writer);
        let key_events = records
            .iter()
            .filter(|r| matches!(r, DeltaRecord::KeyEvent { .. }))
            .count();
        let pointer_events = records
            .iter()
            .filter(|r| matches!(r, DeltaRecord::PointerEvent { .. }))
            .count();
        assert_eq!(key_events, 2);
        assert_eq!(pointer_events, 1);
    }

    #[test]
    fn fractional_mode_scales_by_capture_viewport() {
        let mut writer = open_writer();
        let mut encoder = DiffEncoder::new(&RecorderConfig {
            pointer_count: 1,
            absolute_coords: false,
            ..Default::default()
        });
        let mut snap = Snapshot::new(1);
        snap.x[0] = 400;
        snap.y[0] = 150;
        encoder.encode(&snap, (800, 600), &mut writer).unwrap();

        let pointer = drain(&writer)
            .into_iter()
            .find_map(|r| match r {
                DeltaRecord::Pointer { x, y, .. } => Some((x, y)),
                _ => None,
            })
            .unwrap();
        assert_eq!(pointer, (0.5, 0.25));
    }

    #[test]
    fn empty_mask_never_writes() {
        let mut writer = open_writer();
        let mut encoder = DiffEncoder::new(&RecorderConfig {
            record_pointers: false,
            record_buttons: false,
            record_pointer_events: false,
            record_key_events: false,
            record_keys_pressed: false,
            record_orientation: false,
            ..Default::default()
        });
        let mut snap = Snapshot::new(3);
        snap.buttons[0] = true;
        snap.pressed_keys.insert(29);
        snap.key_events.push(KeyEvent::down(29, 0));
        encoder.encode(&snap, (800, 600), &mut writer).unwrap();
        assert_eq!(writer.delta_count(), 0);
    }

    #[test]
    fn idle_snapshots_leave_their_gap_to_the_next_record() {
        let mut writer = open_writer();
        let mut encoder = DiffEncoder::new(&config());
        let mut snap = Snapshot::new(2);
        snap.timestamp_ms = 0;
        encoder.encode(&snap, (800, 600), &mut writer).unwrap();

        // half a second of unchanged frames emits nothing
        let mut writer2 = open_writer();
        snap.timestamp_ms = 250;
        encoder.encode(&snap, (800, 600), &mut writer2).unwrap();
        snap.timestamp_ms = 500;
        encoder.encode(&snap, (800, 600), &mut writer2).unwrap();
        assert_eq!(writer2.delta_count(), 0);

        // the next change must carry the whole pause, not one frame's worth
        snap.timestamp_ms = 516;
        snap.buttons[0] = true;
        encoder.encode(&snap, (800, 600), &mut writer2).unwrap();

        let records = drain(&writer2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].time_delta_ms(), 516);
    }
}
