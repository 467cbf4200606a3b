//! Event subscriptions and the async error queue.
//!
//! Lifecycle notifications (`Connect`, `Disconnect`, `DisconnectWarning`,
//! `DisconnectError`) and asynchronous protocol/transport error reports
//! are delivered through typed observer lists with explicit subscribe /
//! unsubscribe. Lifecycle events fire synchronously on the task that
//! drives the transition; async errors are queued and delivered one at a
//! time by a dedicated dispatcher task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Depth of the async error queue. Overflow drops the newest report.
const ERROR_QUEUE_DEPTH: usize = 64;

/// Handle returned by a subscription, used to unsubscribe.
pub type SubscriptionId = u64;

/// Callback for lifecycle events.
pub type EventHandler = Arc<dyn Fn() + Send + Sync>;

/// Callback for async error reports.
pub type ErrorHandler = Arc<dyn Fn(&str) + Send + Sync>;

/// Lifecycle event kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// Session established (login accepted).
    Connect,
    /// Session ended, by the user or unexpectedly.
    Disconnect,
    /// Reconnect ladder passed the warning threshold.
    DisconnectWarning,
    /// Reconnect ladder passed the error threshold and gave up.
    DisconnectError,
}

#[derive(Default)]
struct Subscribers {
    connect: Vec<(SubscriptionId, EventHandler)>,
    disconnect: Vec<(SubscriptionId, EventHandler)>,
    warning: Vec<(SubscriptionId, EventHandler)>,
    error: Vec<(SubscriptionId, EventHandler)>,
    async_error: Vec<(SubscriptionId, ErrorHandler)>,
}

impl Subscribers {
    fn list_mut(&mut self, event: ClientEvent) -> &mut Vec<(SubscriptionId, EventHandler)> {
        match event {
            ClientEvent::Connect => &mut self.connect,
            ClientEvent::Disconnect => &mut self.disconnect,
            ClientEvent::DisconnectWarning => &mut self.warning,
            ClientEvent::DisconnectError => &mut self.error,
        }
    }
}

/// Typed observer registry for all client events.
pub(crate) struct EventHub {
    next_id: AtomicU64,
    subscribers: Mutex<Subscribers>,
}

impl EventHub {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(Subscribers::default()),
        }
    }

    pub fn subscribe(&self, event: ClientEvent, handler: impl Fn() + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().list_mut(event).push((id, Arc::new(handler)));
        id
    }

    pub fn subscribe_async_error(&self, handler: impl Fn(&str) + Send + Sync + 'static) -> SubscriptionId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock().async_error.push((id, Arc::new(handler)));
        id
    }

    /// Remove one subscription by id, whichever list it lives in.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut guard = self.lock();
        let subscribers = &mut *guard;
        for list in [
            &mut subscribers.connect,
            &mut subscribers.disconnect,
            &mut subscribers.warning,
            &mut subscribers.error,
        ] {
            if let Some(index) = list.iter().position(|(entry, _)| *entry == id) {
                list.remove(index);
                return true;
            }
        }
        if let Some(index) = subscribers.async_error.iter().position(|(entry, _)| *entry == id) {
            subscribers.async_error.remove(index);
            return true;
        }
        false
    }

    /// Fire a lifecycle event. Handlers are cloned out under the lock and
    /// invoked after it is released.
    pub fn emit(&self, event: ClientEvent) {
        tracing::debug!(?event, "emitting client event");
        let handlers: Vec<EventHandler> = self
            .lock()
            .list_mut(event)
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler();
        }
    }

    fn emit_async_error(&self, description: &str) {
        let handlers: Vec<ErrorHandler> = self
            .lock()
            .async_error
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(description);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Subscribers> {
        self.subscribers.lock().expect("event hub poisoned")
    }
}

/// Producer side of the async error queue.
///
/// Reports are drained by a dispatcher task and delivered through the
/// hub's `AsyncError` subscribers one at a time.
pub(crate) struct AsyncErrorQueue {
    tx: mpsc::Sender<String>,
}

impl AsyncErrorQueue {
    /// Start the dispatcher task for the given hub.
    pub fn start(hub: Arc<EventHub>) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<String>(ERROR_QUEUE_DEPTH);
        let task = tokio::spawn(async move {
            while let Some(description) = rx.recv().await {
                hub.emit_async_error(&description);
            }
            tracing::debug!("async error dispatcher exiting");
        });
        (Self { tx }, task)
    }

    /// Enqueue an error report. Drops the report if the queue is full.
    pub fn push(&self, description: String) {
        if let Err(e) = self.tx.try_send(description) {
            tracing::warn!("async error dropped: {e}");
        }
    }
}
