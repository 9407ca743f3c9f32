//! Input-chain proxy that records the answers to modal text prompts.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use cassette_core::record::{TextAnswer, TextPromptKind};
use cassette_core::source::{InputSource, TextInputListener};

use crate::session::ErrorCallback;
use crate::storage::SharedWriter;

/// Intercepts `request_text` on its way down the chain and tees each answer
/// to the record writer. Cancellation is recorded as an answer of `None`.
/// Every other call passes through untouched.
pub struct TextInputTracker {
    writer: SharedWriter,
    on_error: ErrorCallback,
    proxied: Mutex<Option<Arc<dyn InputSource>>>,
}

impl TextInputTracker {
    pub fn new(writer: SharedWriter, on_error: ErrorCallback) -> Self {
        Self {
            writer,
            on_error,
            proxied: Mutex::new(None),
        }
    }
}

impl InputSource for TextInputTracker {
    fn request_text(
        &self,
        kind: TextPromptKind,
        title: &str,
        listener: Arc<dyn TextInputListener>,
    ) {
        match self.proxied() {
            Some(inner) => {
                let tee: Arc<dyn TextInputListener> = Arc::new(AnswerTee {
                    kind,
                    writer: self.writer.clone(),
                    on_error: self.on_error.clone(),
                    inner: listener,
                });
                inner.request_text(kind, title, tee);
            }
            None => listener.canceled(),
        }
    }

    fn proxied(&self) -> Option<Arc<dyn InputSource>> {
        self.proxied.lock().clone()
    }

    fn set_proxied(&self, delegate: Option<Arc<dyn InputSource>>) {
        *self.proxied.lock() = delegate;
    }
}

struct AnswerTee {
    kind: TextPromptKind,
    writer: SharedWriter,
    on_error: ErrorCallback,
    inner: Arc<dyn TextInputListener>,
}

impl AnswerTee {
    fn record(&self, text: Option<String>) {
        let answer = TextAnswer {
            kind: self.kind,
            text,
        };
        if let Err(e) = self.writer.lock().write_text_answer(&answer) {
            warn!(error = %e, "failed to record text answer");
            (self.on_error)(&e);
        }
    }
}

impl TextInputListener for AnswerTee {
    fn input(&self, text: &str) {
        self.record(Some(text.to_string()));
        self.inner.input(text);
    }

    fn canceled(&self) {
        self.record(None);
        self.inner.canceled();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryRecordWriter;
    use crate::storage::{RecordReader, RecordWriter};

    struct PromptingSource {
        answer: Option<&'static str>,
    }

    impl InputSource for PromptingSource {
        fn request_text(
            &self,
            _kind: TextPromptKind,
            _title: &str,
            listener: Arc<dyn TextInputListener>,
        ) {
            match self.answer {
                Some(text) => listener.input(text),
                None => listener.canceled(),
            }
        }
    }

    struct CollectingListener {
        answers: Mutex<Vec<Option<String>>>,
    }

    impl TextInputListener for CollectingListener {
        fn input(&self, text: &str) {
            self.answers.lock().push(Some(text.to_string()));
        }
        fn canceled(&self) {
            self.answers.lock().push(None);
        }
    }

    fn tracker_over(
        answer: Option<&'static str>,
    ) -> (TextInputTracker, MemoryRecordWriter) {
        let memory = MemoryRecordWriter::new();
        let mut boxed: Box<dyn RecordWriter> = Box::new(memory.clone());
        boxed.open().unwrap();
        let writer: SharedWriter = Arc::new(Mutex::new(boxed));
        let tracker = TextInputTracker::new(writer, Arc::new(|_| {}));
        tracker.set_proxied(Some(Arc::new(PromptingSource { answer })));
        (tracker, memory)
    }

    #[test]
    fn answer_is_recorded_and_forwarded() {
        let (tracker, memory) = tracker_over(Some("Hello"));
        let listener = Arc::new(CollectingListener {
            answers: Mutex::new(Vec::new()),
        });
        tracker.request_text(TextPromptKind::Plain, "name?", listener.clone());

        assert_eq!(
            listener.answers.lock().as_slice(),
            &[Some("Hello".to_string())]
        );
        assert_eq!(
            memory.reader().text_answers(TextPromptKind::Plain),
            vec![Some("Hello".to_string())]
        );
    }

    #[test]
    fn cancellation_is_recorded_as_none() {
        let (tracker, memory) = tracker_over(None);
        let listener = Arc::new(CollectingListener {
            answers: Mutex::new(Vec::new()),
        });
        tracker.request_text(TextPromptKind::Placeholder, "name?", listener.clone());

        assert_eq!(listener.answers.lock().as_slice(), &[None]);
        assert_eq!(
            memory.reader().text_answers(TextPromptKind::Placeholder),
            vec![None]
        );
    }

    #[test]
    fn unproxied_tracker_cancels_without_recording() {
        let memory = MemoryRecordWriter::new();
        let mut boxed: Box<dyn RecordWriter> = Box::new(memory.clone());
        boxed.open().unwrap();
        let tracker = TextInputTracker::new(Arc::new(Mutex::new(boxed)), Arc::new(|_| {}));
        let listener = Arc::new(CollectingListener {
            answers: Mutex::new(Vec::new()),
        });
        tracker.request_text(TextPromptKind::Plain, "name?", listener.clone());

        assert_eq!(listener.answers.lock().as_slice(), &[None]);
        assert!(memory.reader().text_answers(TextPromptKind::Plain).is_empty());
    }
}
