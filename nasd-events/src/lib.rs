//! In-process typed event bus (§4.5's "event-driven" push channels), ported
//! from the teacher's `r2e-events::EventBus`: `TypeId`-keyed subscriber
//! lists behind an `RwLock`, dispatch via `Arc<dyn Any>` downcast, and a
//! semaphore bounding concurrently-running handlers so a slow subscriber
//! can't let emitters outrun memory.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{RwLock, Semaphore};

type Handler =
    Arc<dyn Fn(Arc<dyn Any + Send + Sync>) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub const DEFAULT_MAX_CONCURRENCY: usize = 1024;

/// Emitted when a container's observed state changes; the streaming hub's
/// container-event channel is push-driven off this event rather than a
/// fixed cadence.
#[derive(Debug, Clone)]
pub struct ContainerStateChanged {
    pub container_id: String,
    pub previous_state: String,
    pub new_state: String,
}

/// Emitted by a provider when it knows its own cached snapshot is stale,
/// letting the streaming hub push an out-of-cadence update instead of
/// waiting for the next tick.
#[derive(Debug, Clone)]
pub struct ProviderInvalidated {
    pub provider: String,
}

#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<HashMap<TypeId, Vec<Handler>>>>,
    semaphore: Option<Arc<Semaphore>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_concurrency(DEFAULT_MAX_CONCURRENCY)
    }

    pub fn with_concurrency(max_concurrent: usize) -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            semaphore: Some(Arc::new(Semaphore::new(max_concurrent))),
        }
    }

    /// No concurrency limit. Unused in the daemon's own wiring but kept for
    /// parity with the teacher's bus and for tests that don't care about
    /// backpressure.
    pub fn unbounded() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(HashMap::new())),
            semaphore: None,
        }
    }

    pub async fn subscribe<E, F, Fut>(&self, handler: F)
    where
        E: Send + Sync + 'static,
        F: Fn(Arc<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let type_id = TypeId::of::<E>();
        let handler: Handler = Arc::new(move |any| {
            let event = any.downcast::<E>().expect("event type mismatch");
            Box::pin(handler(event))
        });
        let mut handlers = self.handlers.write().await;
        handlers.entry(type_id).or_default().push(handler);
    }

    /// Emit an event, spawning all subscribers as concurrent tasks. Returns
    /// once every handler has been spawned, not once they've completed.
    pub async fn emit<E: Send + Sync + 'static>(&self, event: E) {
        let type_id = TypeId::of::<E>();
        let event = Arc::new(event) as Arc<dyn Any + Send + Sync>;
        let handlers = self.handlers.read().await;
        if let Some(subs) = handlers.get(&type_id) {
            for handler in subs {
                let h = handler.clone();
                let e = event.clone();
                match &self.semaphore {
                    Some(sem) => {
                        let permit = sem.clone().acquire_owned().await.expect("semaphore closed");
                        tokio::spawn(async move {
                            h(e).await;
                            drop(permit);
                        });
                    }
                    None => {
                        tokio::spawn(async move {
                            h(e).await;
                        });
                    }
                }
            }
        }
    }

    /// Emit and wait for every subscriber to complete.
    pub async fn emit_and_wait<E: Send + Sync + 'static>(&self, event: E) {
        let type_id = TypeId::of::<E>();
        let event = Arc::new(event) as Arc<dyn Any + Send + Sync>;
        let handlers = self.handlers.read().await;
        if let Some(subs) = handlers.get(&type_id) {
            let mut tasks = Vec::new();
            for handler in subs {
                let h = handler.clone();
                let e = event.clone();
                match &self.semaphore {
                    Some(sem) => {
                        let permit = sem.clone().acquire_owned().await.expect("semaphore closed");
                        tasks.push(tokio::spawn(async move {
                            h(e).await;
                            drop(permit);
                        }));
                    }
                    None => {
                        tasks.push(tokio::spawn(async move {
                            h(e).await;
                        }));
                    }
                }
            }
            for task in tasks {
                let _ = task.await;
            }
        }
    }

    pub fn concurrency_limit(&self) -> Option<usize> {
        self.semaphore.as_ref().map(|s| s.available_permits())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        bus.subscribe(move |event: Arc<ContainerStateChanged>| {
            let c = c.clone();
            async move {
                if event.new_state == "running" {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            }
        })
        .await;

        bus.emit_and_wait(ContainerStateChanged {
            container_id: "c1".into(),
            previous_state: "created".into(),
            new_state: "running".into(),
        })
        .await;

        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn multiple_subscribers_all_run() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let c = counter.clone();
            bus.subscribe(move |_: Arc<ProviderInvalidated>| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                }
            })
            .await;
        }
        bus.emit_and_wait(ProviderInvalidated {
            provider: "containers".into(),
        })
        .await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn unrelated_event_types_do_not_cross_fire() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let c = counter.clone();
        bus.subscribe(move |_: Arc<ContainerStateChanged>| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        })
        .await;
        bus.emit_and_wait(ProviderInvalidated {
            provider: "containers".into(),
        })
        .await;
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
