//! Local outbox that decouples gameplay from the downstream stream.
//!
//! [`OutboxPublisher::publish`] only enqueues onto a bounded queue, so a slow
//! stream never holds a session lock. A single [`OutboxDispatcher`] task
//! drains the queue in enqueue order and forwards each event downstream.
//!
//! Events are never dropped. The dispatcher retries the head of the queue
//! with capped exponential backoff until it is delivered. Once one event
//! has failed `max_attempts` times the outbox is marked stalled and every
//! later `publish` fails, so the registry stops committing transitions the
//! stream has not caught up with. Delivery of the stuck event clears the
//! stall. A full queue or a stopped dispatcher also fails `publish`.

use crate::error::PublishError;
use crate::event::GameEvent;
use crate::publisher::EventPublisher;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, instrument, warn};

/// Default number of events the queue holds before `publish` fails.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Retry policy for forwarding events downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts on one event before the outbox stalls. At least one.
    pub max_attempts: u32,
    /// Wait after the first failure; doubles on each further failure.
    pub backoff: Duration,
    /// Upper bound on the wait between attempts.
    pub max_backoff: Duration,
}

impl RetryPolicy {
    /// Wait after the `attempt`-th consecutive failure, starting at 1.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(5),
        }
    }
}

/// Enqueuing half of the outbox.
#[derive(Debug, Clone)]
pub struct OutboxPublisher {
    tx: mpsc::Sender<GameEvent>,
    stalled: Arc<AtomicBool>,
}

impl OutboxPublisher {
    /// Returns true while the dispatcher is stuck on an undeliverable event.
    pub fn is_stalled(&self) -> bool {
        self.stalled.load(Ordering::SeqCst)
    }
}

/// Draining half of the outbox.
#[derive(Debug)]
pub struct OutboxDispatcher<P> {
    rx: mpsc::Receiver<GameEvent>,
    downstream: Arc<P>,
    policy: RetryPolicy,
    stalled: Arc<AtomicBool>,
}

/// Creates a connected publisher/dispatcher pair forwarding to `downstream`.
///
/// The queue holds at most `capacity` undelivered events.
pub fn outbox<P: EventPublisher + 'static>(
    downstream: P,
    capacity: usize,
    policy: RetryPolicy,
) -> (OutboxPublisher, OutboxDispatcher<P>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let stalled = Arc::new(AtomicBool::new(false));
    (
        OutboxPublisher {
            tx,
            stalled: Arc::clone(&stalled),
        },
        OutboxDispatcher {
            rx,
            downstream: Arc::new(downstream),
            policy,
            stalled,
        },
    )
}

impl EventPublisher for OutboxPublisher {
    fn publish(&self, event: &GameEvent) -> Result<(), PublishError> {
        if self.is_stalled() {
            return Err(PublishError::new(
                "Outbox stalled, downstream is not accepting events",
            ));
        }
        self.tx.try_send(event.clone()).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => PublishError::new("Outbox queue is full"),
            mpsc::error::TrySendError::Closed(_) => {
                PublishError::new("Outbox dispatcher has stopped")
            }
        })
    }
}

impl<P: EventPublisher + 'static> OutboxDispatcher<P> {
    /// Forwards events until every [`OutboxPublisher`] is dropped and the
    /// queue is empty. Returns the number of events delivered.
    #[instrument(skip(self), fields(max_attempts = self.policy.max_attempts))]
    pub async fn run(mut self) -> usize {
        info!("Outbox dispatcher started");
        let mut delivered = 0;
        while let Some(event) = self.rx.recv().await {
            forward(&self.downstream, &self.stalled, self.policy, event).await;
            delivered += 1;
        }
        info!(delivered, "Outbox drained, dispatcher stopping");
        delivered
    }
}

/// Publishes `event` downstream, retrying until it is accepted.
///
/// The downstream call runs on the blocking pool since sinks may do
/// synchronous I/O.
async fn forward<P: EventPublisher + 'static>(
    downstream: &Arc<P>,
    stalled: &AtomicBool,
    policy: RetryPolicy,
    event: GameEvent,
) {
    let event = Arc::new(event);
    let mut failures = 0u32;
    loop {
        let sink = Arc::clone(downstream);
        let pending = Arc::clone(&event);
        let result = tokio::task::spawn_blocking(move || sink.publish(&pending))
            .await
            .unwrap_or_else(|err| Err(PublishError::new(format!("Sink panicked: {}", err))));

        match result {
            Ok(()) => {
                debug!(session_id = %event.session_id, failures, "Event forwarded");
                if stalled.swap(false, Ordering::SeqCst) {
                    info!("Downstream recovered, outbox accepting events again");
                }
                return;
            }
            Err(err) => {
                failures = failures.saturating_add(1);
                if failures == policy.max_attempts.max(1) && !stalled.swap(true, Ordering::SeqCst) {
                    error!(
                        session_id = %event.session_id,
                        kind = %event.kind,
                        error = %err,
                        "Downstream unavailable, outbox stalled"
                    );
                } else {
                    warn!(failures, error = %err, "Downstream publish failed, retrying");
                }
                tokio::time::sleep(policy.delay(failures)).await;
            }
        }
    }
}
