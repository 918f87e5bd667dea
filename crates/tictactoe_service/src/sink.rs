//! Line-delimited JSON event sink.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tictactoe_engine::{EventEnvelope, EventPublisher, GameEvent, PublishError};
use tracing::{debug, instrument};

/// Writes one [`EventEnvelope`] per line to any writer.
pub struct JsonLinesSink<W> {
    topic: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    /// Wraps `writer`; envelopes carry `topic`.
    pub fn new(topic: impl Into<String>, writer: W) -> Self {
        Self {
            topic: topic.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the writer, consuming the sink.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl JsonLinesSink<io::Stderr> {
    /// Sink writing to standard error.
    pub fn stderr(topic: impl Into<String>) -> Self {
        Self::new(topic, io::stderr())
    }
}

impl JsonLinesSink<std::fs::File> {
    /// Sink appending to `path`, creating the file if needed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn append_to(topic: impl Into<String>, path: impl AsRef<Path>) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path.as_ref())?;
        debug!("Opened event file");
        Ok(Self::new(topic, file))
    }
}

impl<W: Write + Send> EventPublisher for JsonLinesSink<W> {
    fn publish(&self, event: &GameEvent) -> Result<(), PublishError> {
        let envelope = EventEnvelope::new(self.topic.clone(), event.clone());
        let mut line = serde_json::to_vec(&envelope)?;
        line.push(b'\n');
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}
