//! In-memory record backend, mainly for tests and short-lived sessions.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use cassette_core::error::{Error, Result};
use cassette_core::record::{
    DeltaRecord, SessionProperties, StaticCapabilities, TextAnswer, TextPromptKind,
};

use crate::storage::{RecordReader, RecordWriter};

#[derive(Default)]
struct Store {
    open: bool,
    properties: SessionProperties,
    capabilities: StaticCapabilities,
    deltas: Vec<DeltaRecord>,
    text: Vec<TextAnswer>,
}

/// Record writer backed by shared memory. Clones write into the same store,
/// so a test can keep one handle while the session owns another.
#[derive(Clone, Default)]
pub struct MemoryRecordWriter {
    store: Arc<Mutex<Store>>,
}

impl MemoryRecordWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots the current store into an independent reader.
    pub fn reader(&self) -> MemoryRecordReader {
        let store = self.store.lock();
        if store.open {
            warn!("reading back a memory recording that is still open");
        }
        MemoryRecordReader {
            properties: store.properties,
            capabilities: store.capabilities,
            deltas: store.deltas.clone(),
            text: store.text.clone(),
            cursor: 0,
        }
    }

    pub fn delta_count(&self) -> usize {
        self.store.lock().deltas.len()
    }
}

impl RecordWriter for MemoryRecordWriter {
    fn open(&mut self) -> Result<()> {
        let mut store = self.store.lock();
        if store.open {
            warn!("memory record writer opened twice");
        }
        *store = Store {
            open: true,
            ..Default::default()
        };
        Ok(())
    }

    fn write_session_properties(&mut self, properties: &SessionProperties) -> Result<()> {
        self.store.lock().properties = *properties;
        Ok(())
    }

    fn write_static_capabilities(&mut self, capabilities: &StaticCapabilities) -> Result<()> {
        self.store.lock().capabilities = *capabilities;
        Ok(())
    }

    fn write_delta(&mut self, record: &DeltaRecord) -> Result<()> {
        let mut store = self.store.lock();
        if !store.open {
            return Err(Error::writer_closed("write_delta"));
        }
        store.deltas.push(record.clone());
        Ok(())
    }

    fn write_text_answer(&mut self, answer: &TextAnswer) -> Result<()> {
        let mut store = self.store.lock();
        if !store.open {
            return Err(Error::writer_closed("write_text_answer"));
        }
        store.text.push(answer.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.store.lock().open = false;
        Ok(())
    }
}

pub struct MemoryRecordReader {
    properties: SessionProperties,
    capabilities: StaticCapabilities,
    deltas: Vec<DeltaRecord>,
    text: Vec<TextAnswer>,
    cursor: usize,
}

impl RecordReader for MemoryRecordReader {
    fn session_properties(&self) -> SessionProperties {
        self.properties
    }

    fn static_capabilities(&self) -> StaticCapabilities {
        self.capabilities
    }

    fn next_delta(&mut self) -> Option<Result<DeltaRecord>> {
        let record = self.deltas.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(Ok(record))
    }

    fn reset(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn text_answers(&self, kind: TextPromptKind) -> Vec<Option<String>> {
        self.text
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.text.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_writer_rejects_records() {
        let mut writer = MemoryRecordWriter::new();
        let record = DeltaRecord::Button {
            time_delta_ms: 0,
            button0: true,
            button1: false,
            button2: false,
        };
        assert!(writer.write_delta(&record).is_err());
        writer.open().unwrap();
        assert!(writer.write_delta(&record).is_ok());
        writer.close().unwrap();
        assert!(writer.write_delta(&record).is_err());
    }

    #[test]
    fn reader_is_a_snapshot_and_resets() {
        let mut writer = MemoryRecordWriter::new();
        writer.open().unwrap();
        let record = DeltaRecord::Button {
            time_delta_ms: 3,
            button0: false,
            button1: true,
            button2: false,
        };
        writer.write_delta(&record).unwrap();
        writer.close().unwrap();

        let mut reader = writer.reader();
        assert_eq!(reader.next_delta().unwrap().unwrap(), record);
        assert!(reader.next_delta().is_none());
        reader.reset().unwrap();
        assert_eq!(reader.next_delta().unwrap().unwrap(), record);
    }

    #[test]
    fn reopen_discards_previous_session() {
        let mut writer = MemoryRecordWriter::new();
        writer.open().unwrap();
        writer
            .write_delta(&DeltaRecord::Button {
                time_delta_ms: 0,
                button0: true,
                button1: false,
                button2: false,
            })
            .unwrap();
        writer.close().unwrap();
        writer.open().unwrap();
        assert_eq!(writer.delta_count(), 0);
    }
}
