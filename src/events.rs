//! Typed publish/subscribe layer over `tokio::sync::broadcast`. Components hold a
//! handle to the bus and subscribe to it; nothing inherits from it.

use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::warn;

use crate::cache::Extras;
use crate::cache::ProjectStatus;

const CHANNEL_CAPACITY: usize = 256;

/// `TranslationStop`/`TranslationManualExport`/`ProjectStatusCheck` and most of the
/// emitted variants below are part of the external bus contract (a UI or other
/// out-of-process subscriber) rather than consumed anywhere in this crate; the
/// scheduler drives start/stop through direct calls instead (see
/// `Translator::request_stop`).
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Event {
    // Consumed by the scheduler.
    TranslationStart { status: ProjectStatus },
    TranslationStop,
    TranslationManualExport,
    ProjectStatusCheck,

    // Emitted by the scheduler / cache manager.
    TranslationUpdate { extras: Extras },
    TranslationStopDone,
    ProjectStatusCheckDone { status: ProjectStatus },
    CacheFileAutoSave,
    AppToastShow { kind: ToastKind, message: String },
    GlossaryRefresh,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Warning,
    Error,
}

#[derive(Clone)]
pub struct EventBus {
    tx: Sender<Event>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> Receiver<Event> {
        self.tx.subscribe()
    }

    /// Publishes to every live subscriber. No subscribers is not an error (matches a
    /// headless session with nothing currently watching toasts/progress).
    pub fn publish(&self, event: Event) {
        if self.tx.send(event).is_err() {
            warn!("published event with no active subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Drains `rx` until `Event::TranslationStopDone`/closed, logging and resuming past
/// lag instead of treating a slow subscriber as fatal.
pub async fn recv_resilient(rx: &mut Receiver<Event>) -> Option<Event> {
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!("event subscriber lagged, skipped {n} events");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(Event::TranslationStopDone);

        assert!(matches!(
            recv_resilient(&mut rx1).await,
            Some(Event::TranslationStopDone)
        ));
        assert!(matches!(
            recv_resilient(&mut rx2).await,
            Some(Event::TranslationStopDone)
        ));
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.publish(Event::CacheFileAutoSave);
    }
}
