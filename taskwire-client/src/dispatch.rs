//! Event dispatcher: two-namespace subscriber registries and fan-out.
//!
//! Inbound envelopes are routed by their `type` discriminant. The two
//! reserved task discriminants go to the **task namespace** with a typed
//! [`Task`] payload; every other discriminant goes to the **generic
//! namespace**, keyed by the discriminant string (or the `"message"` fallback
//! when it is absent). The namespaces are fully independent: a generic
//! subscriber to the literal string `"task_created"` never sees task events.
//!
//! Dispatch iterates a snapshot of the matching registry taken at dispatch
//! start, so subscribing or unsubscribing from inside a callback never skips
//! or double-invokes entries in the current pass.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tracing::warn;

use taskwire_proto::{Envelope, Task, TaskEvent};

/// Callback invoked with a task payload.
pub type TaskCallback = Arc<dyn Fn(&Task) + Send + Sync>;

/// Callback invoked with the raw envelope payload.
pub type MessageCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Identifies which registry a subscription lives in.
#[derive(Debug, Clone)]
enum HandleKey {
    Task(TaskEvent),
    Generic(String),
}

/// Handle returned by subscribe, consumed by unsubscribe.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: u64,
    key: HandleKey,
}

/// Two-namespace subscriber registry with synchronous fan-out.
///
/// Registration order is invocation order. Callbacks receive the payload by
/// reference and must not mutate state a later callback in the same pass
/// relies on; that invariant is cooperative, not enforced.
#[derive(Default)]
pub struct Dispatcher {
    next_id: AtomicU64,
    task: Mutex<HashMap<TaskEvent, Vec<(u64, TaskCallback)>>>,
    generic: Mutex<HashMap<String, Vec<(u64, MessageCallback)>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one of the reserved task events.
    pub fn subscribe_task(
        &self,
        event: TaskEvent,
        callback: impl Fn(&Task) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.task)
            .entry(event)
            .or_default()
            .push((id, Arc::new(callback)));
        SubscriptionHandle {
            id,
            key: HandleKey::Task(event),
        }
    }

    /// Subscribe to a generic message discriminant.
    pub fn subscribe(
        &self,
        kind: impl Into<String>,
        callback: impl Fn(&Value) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let kind = kind.into();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.generic)
            .entry(kind.clone())
            .or_default()
            .push((id, Arc::new(callback)));
        SubscriptionHandle {
            id,
            key: HandleKey::Generic(kind),
        }
    }

    /// Remove exactly the registration the handle was issued for.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        match handle.key {
            HandleKey::Task(event) => {
                let mut registry = lock(&self.task);
                if let Some(entries) = registry.get_mut(&event) {
                    entries.retain(|(id, _)| *id != handle.id);
                }
            }
            HandleKey::Generic(kind) => {
                let mut registry = lock(&self.generic);
                if let Some(entries) = registry.get_mut(&kind) {
                    entries.retain(|(id, _)| *id != handle.id);
                }
            }
        }
    }

    /// Route one envelope to every subscriber of its discriminant.
    pub fn dispatch(&self, envelope: &Envelope) {
        match envelope.kind().and_then(TaskEvent::from_discriminant) {
            Some(event) => {
                let Some(raw) = envelope.field("task") else {
                    warn!(kind = event.discriminant(), "task event without task payload; dropping");
                    return;
                };
                match serde_json::from_value::<Task>(raw.clone()) {
                    Ok(task) => self.dispatch_task(event, &task),
                    Err(e) => {
                        warn!(kind = event.discriminant(), error = %e, "malformed task payload; dropping");
                    }
                }
            }
            None => self.dispatch_generic(envelope.dispatch_key(), envelope.value()),
        }
    }

    fn dispatch_task(&self, event: TaskEvent, task: &Task) {
        let snapshot: Vec<(u64, TaskCallback)> = lock(&self.task)
            .get(&event)
            .cloned()
            .unwrap_or_default();
        for (id, callback) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(task))).is_err() {
                warn!(subscription = id, "subscriber panicked during dispatch");
            }
        }
    }

    fn dispatch_generic(&self, key: &str, payload: &Value) {
        let snapshot: Vec<(u64, MessageCallback)> = lock(&self.generic)
            .get(key)
            .cloned()
            .unwrap_or_default();
        for (id, callback) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(payload))).is_err() {
                warn!(subscription = id, "subscriber panicked during dispatch");
            }
        }
    }
}
