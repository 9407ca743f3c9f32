//! Record persistence: the writer/reader seams and the JSON file backend.
//!
//! A recording is addressed by a stem; the JSON backend stores four sibling
//! streams next to it:
//!
//! - `<stem>.properties.json`: one [`SessionProperties`] object
//! - `<stem>.capabilities.json`: one [`StaticCapabilities`] object
//! - `<stem>.deltas.jsonl`: one [`DeltaRecord`] per line, stream order
//! - `<stem>.text.jsonl`: one [`TextAnswer`] per line, prompt order

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use tracing::debug;

use cassette_core::error::{Error, Result};
use cassette_core::record::{DeltaRecord, SessionProperties, StaticCapabilities, TextAnswer, TextPromptKind};

/// Sink for one capture session, written in stream order by the processor
/// thread and the text interceptor.
pub trait RecordWriter: Send {
    fn open(&mut self) -> Result<()>;
    fn write_session_properties(&mut self, properties: &SessionProperties) -> Result<()>;
    fn write_static_capabilities(&mut self, capabilities: &StaticCapabilities) -> Result<()>;
    fn write_delta(&mut self, record: &DeltaRecord) -> Result<()>;
    fn write_text_answer(&mut self, answer: &TextAnswer) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// Writer shared between the processor thread, the text interceptor and the
/// owning session.
pub type SharedWriter = Arc<Mutex<Box<dyn RecordWriter>>>;

/// Source for one recorded session, consumed in stream order by the player.
pub trait RecordReader: Send {
    fn session_properties(&self) -> SessionProperties;
    fn static_capabilities(&self) -> StaticCapabilities;
    /// The next delta in stream order, `None` at end of stream. A parse
    /// failure is fatal to the stream.
    fn next_delta(&mut self) -> Option<Result<DeltaRecord>>;
    /// Rewinds the delta stream to the beginning.
    fn reset(&mut self) -> Result<()>;
    /// All answers recorded for one prompt kind, in prompt order. `None`
    /// entries are recorded cancellations.
    fn text_answers(&self, kind: TextPromptKind) -> Vec<Option<String>>;
}

fn stream_path(stem: &Path, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}.{}", stem.display(), suffix))
}

/// Picks a timestamped stem for a new recording inside `dir`.
pub fn default_stem(dir: &Path) -> PathBuf {
    dir.join(format!("recording_{}", Local::now().format("%Y%m%d_%H%M%S")))
}

pub struct JsonRecordWriter {
    stem: PathBuf,
    deltas: Option<BufWriter<File>>,
    text: Option<BufWriter<File>>,
}

impl JsonRecordWriter {
    pub fn new(stem: impl Into<PathBuf>) -> Self {
        Self {
            stem: stem.into(),
            deltas: None,
            text: None,
        }
    }

    pub fn stem(&self) -> &Path {
        &self.stem
    }
}

impl RecordWriter for JsonRecordWriter {
    fn open(&mut self) -> Result<()> {
        if let Some(dir) = self.stem.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| Error::io("create recording dir", &e))?;
            }
        }
        let deltas = File::create(stream_path(&self.stem, "deltas.jsonl"))
            .map_err(|e| Error::io("create delta stream", &e))?;
        let text = File::create(stream_path(&self.stem, "text.jsonl"))
            .map_err(|e| Error::io("create text stream", &e))?;
        self.deltas = Some(BufWriter::new(deltas));
        self.text = Some(BufWriter::new(text));
        debug!(stem = %self.stem.display(), "opened json recording");
        Ok(())
    }

    fn write_session_properties(&mut self, properties: &SessionProperties) -> Result<()> {
        let file = File::create(stream_path(&self.stem, "properties.json"))
            .map_err(|e| Error::io("create properties file", &e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), properties)?;
        Ok(())
    }

    fn write_static_capabilities(&mut self, capabilities: &StaticCapabilities) -> Result<()> {
        let file = File::create(stream_path(&self.stem, "capabilities.json"))
            .map_err(|e| Error::io("create capabilities file", &e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), capabilities)?;
        Ok(())
    }

    fn write_delta(&mut self, record: &DeltaRecord) -> Result<()> {
        let writer = self
            .deltas
            .as_mut()
            .ok_or_else(|| Error::writer_closed("write_delta"))?;
        serde_json::to_writer(&mut *writer, record)?;
        writeln!(writer).map_err(|e| Error::io("write delta", &e))?;
        Ok(())
    }

    fn write_text_answer(&mut self, answer: &TextAnswer) -> Result<()> {
        let writer = self
            .text
            .as_mut()
            .ok_or_else(|| Error::writer_closed("write_text_answer"))?;
        serde_json::to_writer(&mut *writer, answer)?;
        writeln!(writer).map_err(|e| Error::io("write text answer", &e))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(w) = self.deltas.as_mut() {
            w.flush().map_err(|e| Error::io("flush delta stream", &e))?;
        }
        if let Some(w) = self.text.as_mut() {
            w.flush().map_err(|e| Error::io("flush text stream", &e))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.flush()?;
        self.deltas = None;
        self.text = None;
        Ok(())
    }
}

pub struct JsonRecordReader {
    stem: PathBuf,
    properties: SessionProperties,
    capabilities: StaticCapabilities,
    deltas: BufReader<File>,
    text: Vec<TextAnswer>,
    line: usize,
}

impl JsonRecordReader {
    pub fn new(stem: impl Into<PathBuf>) -> Result<Self> {
        let stem = stem.into();
        let properties = read_json(&stream_path(&stem, "properties.json"))?;
        let capabilities = read_json(&stream_path(&stem, "capabilities.json"))?;
        let text = read_text_answers(&stream_path(&stem, "text.jsonl"))?;
        let deltas = open_deltas(&stem)?;
        Ok(Self {
            stem,
            properties,
            capabilities,
            deltas,
            text,
            line: 0,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| Error::io("open recording stream", &e))?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn read_text_answers(path: &Path) -> Result<Vec<TextAnswer>> {
    // Text answers are optional; a session without prompts has an empty file
    // or, for foreign recordings, none at all.
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io("open text stream", &e)),
    };
    let mut answers = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| Error::io("read text stream", &e))?;
        if line.trim().is_empty() {
            continue;
        }
        answers.push(serde_json::from_str(&line)?);
    }
    Ok(answers)
}

fn open_deltas(stem: &Path) -> Result<BufReader<File>> {
    let file = File::open(stream_path(stem, "deltas.jsonl"))
        .map_err(|e| Error::io("open delta stream", &e))?;
    Ok(BufReader::new(file))
}

impl RecordReader for JsonRecordReader {
    fn session_properties(&self) -> SessionProperties {
        self.properties
    }

    fn static_capabilities(&self) -> StaticCapabilities {
        self.capabilities
    }

    fn next_delta(&mut self) -> Option<Result<DeltaRecord>> {
        loop {
            let mut line = String::new();
            match self.deltas.read_line(&mut line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(Error::io("read delta stream", &e))),
            }
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|e| {
                Error::malformed_record(format!(
                    "{}.deltas.jsonl line {}: {}",
                    self.stem.display(),
                    self.line,
                    e
                ))
            }));
        }
    }

    fn reset(&mut self) -> Result<()> {
        self.deltas = open_deltas(&self.stem)?;
        self.line = 0;
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
