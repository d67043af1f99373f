//! In-memory broker adapter.
//!
//! Suitable for local wiring and tests. Deliveries are at-least-once:
//! rejected-with-requeue messages go back on the queue, and nothing is
//! forgotten until it is acked or dropped without requeue.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::envelope::MessageEnvelope;
use crate::ports::{ConsumeError, MessageConsumer, MessageHandler, MessagePublisher, PublishError};

#[derive(Default)]
struct QueueState {
    pending: VecDeque<MessageEnvelope>,
    handler: Option<MessageHandler>,
    in_flight: HashMap<String, MessageEnvelope>,
    dropped: Vec<MessageEnvelope>,
    dispatcher_running: bool,
}

struct Shared {
    queues: Mutex<HashMap<String, QueueState>>,
    wakeups: Mutex<HashMap<String, Arc<Notify>>>,
    shutdown: CancellationToken,
    /// Number of upcoming publishes to fail, for failure-path tests.
    inject_failures: AtomicU32,
}

/// In-memory message broker implementing both broker ports.
///
/// One dispatcher task per subscribed queue delivers messages to the
/// handler sequentially, preserving queue order. `ack` settles a delivery;
/// `reject(requeue: true)` puts it back at the tail of the queue.
#[derive(Clone)]
pub struct InMemoryBroker {
    shared: Arc<Shared>,
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBroker {
    /// Create an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                queues: Mutex::new(HashMap::new()),
                wakeups: Mutex::new(HashMap::new()),
                shutdown: CancellationToken::new(),
                inject_failures: AtomicU32::new(0),
            }),
        }
    }

    /// Stop all dispatcher tasks. In-flight handler invocations finish.
    pub fn shutdown(&self) {
        self.shared.shutdown.cancel();
    }

    /// Fail the next `count` publishes with a connection error.
    pub fn inject_publish_failures(&self, count: u32) {
        self.shared.inject_failures.store(count, Ordering::SeqCst);
    }

    /// Number of messages waiting in a queue.
    pub async fn queue_depth(&self, queue: &str) -> usize {
        let queues = self.shared.queues.lock().await;
        queues.get(queue).map_or(0, |q| q.pending.len())
    }

    /// Number of unsettled deliveries for a queue.
    pub async fn in_flight_len(&self, queue: &str) -> usize {
        let queues = self.shared.queues.lock().await;
        queues.get(queue).map_or(0, |q| q.in_flight.len())
    }

    /// Messages rejected without requeue on a queue.
    pub async fn dropped(&self, queue: &str) -> Vec<MessageEnvelope> {
        let queues = self.shared.queues.lock().await;
        queues.get(queue).map_or_else(Vec::new, |q| q.dropped.clone())
    }

    async fn wakeup_for(&self, queue: &str) -> Arc<Notify> {
        let mut wakeups = self.shared.wakeups.lock().await;
        wakeups
            .entry(queue.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    fn spawn_dispatcher(&self, queue: String, wakeup: Arc<Notify>) {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            loop {
                let next = {
                    let mut queues = shared.queues.lock().await;
                    let Some(state) = queues.get_mut(&queue) else {
                        break;
                    };
                    match (state.pending.pop_front(), state.handler.clone()) {
                        (Some(envelope), Some(handler)) => {
                            state
                                .in_flight
                                .insert(envelope.message_id.clone(), envelope.clone());
                            Some((envelope, handler))
                        }
                        (Some(envelope), None) => {
                            // Subscriber went away; keep the message.
                            state.pending.push_front(envelope);
                            None
                        }
                        (None, _) => None,
                    }
                };

                match next {
                    Some((envelope, handler)) => {
                        debug!(queue = %queue, message_id = %envelope.message_id, "delivering message");
                        handler(envelope).await;
                    }
                    None => {
                        tokio::select! {
                            () = wakeup.notified() => {}
                            () = shared.shutdown.cancelled() => break,
                        }
                    }
                }
            }
        });
    }
}

#[async_trait]
impl MessagePublisher for InMemoryBroker {
    async fn publish(
        &self,
        envelope: MessageEnvelope,
        routing_key: &str,
    ) -> Result<(), PublishError> {
        let remaining = self.shared.inject_failures.load(Ordering::SeqCst);
        if remaining > 0
            && self
                .shared
                .inject_failures
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            return Err(PublishError::Connection {
                message: "injected failure".to_string(),
            });
        }

        {
            let mut queues = self.shared.queues.lock().await;
            let state = queues.entry(routing_key.to_string()).or_default();
            state.pending.push_back(envelope);
        }
        self.wakeup_for(routing_key).await.notify_one();
        Ok(())
    }
}

#[async_trait]
impl MessageConsumer for InMemoryBroker {
    async fn subscribe(&self, queue: &str, handler: MessageHandler) -> Result<(), ConsumeError> {
        let wakeup = self.wakeup_for(queue).await;
        let start_dispatcher = {
            let mut queues = self.shared.queues.lock().await;
            let state = queues.entry(queue.to_string()).or_default();
            state.handler = Some(handler);
            if state.dispatcher_running {
                false
            } else {
                state.dispatcher_running = true;
                true
            }
        };
        if start_dispatcher {
            self.spawn_dispatcher(queue.to_string(), wakeup.clone());
        }
        wakeup.notify_one();
        Ok(())
    }

    async fn ack(&self, message: &MessageEnvelope) -> Result<(), ConsumeError> {
        let mut queues = self.shared.queues.lock().await;
        for state in queues.values_mut() {
            if state.in_flight.remove(&message.message_id).is_some() {
                return Ok(());
            }
        }
        Err(ConsumeError::NotInFlight {
            message_id: message.message_id.clone(),
        })
    }

    async fn reject(&self, message: &MessageEnvelope, requeue: bool) -> Result<(), ConsumeError> {
        let queue_name = {
            let mut queues = self.shared.queues.lock().await;
            let mut found = None;
            for (name, state) in queues.iter_mut() {
                if let Some(envelope) = state.in_flight.remove(&message.message_id) {
                    if requeue {
                        state.pending.push_back(envelope);
                    } else {
                        state.dropped.push(envelope);
                    }
                    found = Some(name.clone());
                    break;
                }
            }
            found
        };

        match queue_name {
            Some(name) => {
                if requeue {
                    self.wakeup_for(&name).await.notify_one();
                }
                Ok(())
            }
            None => Err(ConsumeError::NotInFlight {
                message_id: message.message_id.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;

    fn capturing_handler(tx: mpsc::UnboundedSender<MessageEnvelope>) -> MessageHandler {
        Arc::new(move |envelope| {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(envelope);
            })
        })
    }

    async fn recv(rx: &mut mpsc::UnboundedReceiver<MessageEnvelope>) -> MessageEnvelope {
        tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for delivery")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn subscribe_then_publish_delivers() {
        let broker = InMemoryBroker::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broker.subscribe("q", capturing_handler(tx)).await.unwrap();

        broker
            .publish(MessageEnvelope::new("m1", "T", "{}"), "q")
            .await
            .unwrap();

        let delivered = recv(&mut rx).await;
        assert_eq!(delivered.message_id, "m1");
        assert_eq!(broker.in_flight_len("q").await, 1);
    }

    #[tokio::test]
    async fn publish_before_subscribe_is_buffered() {
        let broker = InMemoryBroker::new();
        broker
            .publish(MessageEnvelope::new("m1", "T", "{}"), "q")
            .await
            .unwrap();
        assert_eq!(broker.queue_depth("q").await, 1);

        let (tx, mut rx) = mpsc::unbounded_channel();
        broker.subscribe("q", capturing_handler(tx)).await.unwrap();
        let delivered = recv(&mut rx).await;
        assert_eq!(delivered.message_id, "m1");
    }

    #[tokio::test]
    async fn ack_settles_delivery() {
        let broker = InMemoryBroker::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broker.subscribe("q", capturing_handler(tx)).await.unwrap();
        broker
            .publish(MessageEnvelope::new("m1", "T", "{}"), "q")
            .await
            .unwrap();

        let delivered = recv(&mut rx).await;
        broker.ack(&delivered).await.unwrap();
        assert_eq!(broker.in_flight_len("q").await, 0);

        // Second ack of the same delivery is an error.
        assert!(broker.ack(&delivered).await.is_err());
    }

    #[tokio::test]
    async fn reject_with_requeue_redelivers() {
        let broker = InMemoryBroker::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broker.subscribe("q", capturing_handler(tx)).await.unwrap();
        broker
            .publish(MessageEnvelope::new("m1", "T", "{}"), "q")
            .await
            .unwrap();

        let first = recv(&mut rx).await;
        broker.reject(&first, true).await.unwrap();

        let second = recv(&mut rx).await;
        assert_eq!(second.message_id, "m1");
        broker.ack(&second).await.unwrap();
    }

    #[tokio::test]
    async fn reject_without_requeue_drops() {
        let broker = InMemoryBroker::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broker.subscribe("q", capturing_handler(tx)).await.unwrap();
        broker
            .publish(MessageEnvelope::new("m1", "T", "{}"), "q")
            .await
            .unwrap();

        let delivered = recv(&mut rx).await;
        broker.reject(&delivered, false).await.unwrap();

        assert_eq!(broker.in_flight_len("q").await, 0);
        let dropped = broker.dropped("q").await;
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].message_id, "m1");
    }

    #[tokio::test]
    async fn injected_failures_error_then_clear() {
        let broker = InMemoryBroker::new();
        broker.inject_publish_failures(1);

        let err = broker
            .publish(MessageEnvelope::new("m1", "T", "{}"), "q")
            .await;
        assert!(err.is_err());

        broker
            .publish(MessageEnvelope::new("m2", "T", "{}"), "q")
            .await
            .unwrap();
        assert_eq!(broker.queue_depth("q").await, 1);
    }

    #[tokio::test]
    async fn deliveries_preserve_queue_order() {
        let broker = InMemoryBroker::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        broker.subscribe("q", capturing_handler(tx)).await.unwrap();

        for n in 0..5 {
            broker
                .publish(MessageEnvelope::new(format!("m{n}"), "T", "{}"), "q")
                .await
                .unwrap();
        }

        for n in 0..5 {
            let delivered = recv(&mut rx).await;
            assert_eq!(delivered.message_id, format!("m{n}"));
            broker.ack(&delivered).await.unwrap();
        }
    }
}
