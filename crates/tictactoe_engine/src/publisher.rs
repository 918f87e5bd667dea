//! The event stream capability the registry depends on.

use crate::error::PublishError;
use crate::event::{EventEnvelope, GameEvent};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, instrument};

/// Hands events to a downstream stream.
///
/// Called synchronously while the session is locked, so events for one
/// session reach the publisher in the order their transitions were accepted.
pub trait EventPublisher: Send + Sync {
    /// Publishes one event.
    fn publish(&self, event: &GameEvent) -> Result<(), PublishError>;
}

impl<P: EventPublisher + ?Sized> EventPublisher for Arc<P> {
    fn publish(&self, event: &GameEvent) -> Result<(), PublishError> {
        (**self).publish(event)
    }
}

impl<P: EventPublisher + ?Sized> EventPublisher for Box<P> {
    fn publish(&self, event: &GameEvent) -> Result<(), PublishError> {
        (**self).publish(event)
    }
}

/// Writes every event to the log as JSON.
#[derive(Debug, Clone)]
pub struct TracingPublisher {
    topic: String,
}

impl TracingPublisher {
    /// Creates a publisher that logs under `topic`.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
        }
    }
}

impl EventPublisher for TracingPublisher {
    #[instrument(skip_all, fields(topic = %self.topic, session_id = %event.session_id))]
    fn publish(&self, event: &GameEvent) -> Result<(), PublishError> {
        let envelope = EventEnvelope::new(self.topic.clone(), event.clone());
        let payload = serde_json::to_string(&envelope)?;
        info!(kind = %event.kind, bytes = payload.len(), %payload, "Event");
        Ok(())
    }
}

/// Keeps published events in memory.
///
/// Clones share the same buffer, so a test can hold one clone while the
/// registry owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingPublisher {
    events: Arc<Mutex<Vec<GameEvent>>>,
}

impl RecordingPublisher {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything published so far.
    pub fn events(&self) -> Vec<GameEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of events published so far.
    pub fn len(&self) -> usize {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Returns true if nothing has been published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, event: &GameEvent) -> Result<(), PublishError> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        Ok(())
    }
}
