//! In-process publish/subscribe for annotation lifecycle and pointer events.
//!
//! Each [`Subscription`] owns the receiving end of its own channel. Dropping
//! it ends the subscription; the bus notices on the next publish and forgets
//! the sender.

use annotator_model::{Annotation, AnnotationType, RecordId};
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// The drawn annotation a pointer event landed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeTarget {
    pub annotation_id: RecordId,
    pub annotation_type: AnnotationType,
    pub page: u32,
}

impl NodeTarget {
    pub fn of(annotation: &Annotation) -> Self {
        Self {
            annotation_id: annotation.id.clone(),
            annotation_type: annotation.annotation_type(),
            page: annotation.page,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum AnnotationEvent {
    Add { annotation: Annotation },
    Remove { annotation: Annotation },
    Click { target: NodeTarget },
    Blur { target: NodeTarget },
    Message { annotation_id: RecordId },
}

#[derive(Debug, Clone, Default)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<Sender<AnnotationEvent>>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).push(sender);
        Subscription { receiver }
    }

    /// Delivers `event` to every live subscriber and returns how many received it.
    pub fn publish(&self, event: AnnotationEvent) -> usize {
        let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sender| sender.send(event.clone()).is_ok());
        subscribers.len()
    }

    /// Number of subscribers seen alive at the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Receiving side of one bus subscription.
#[derive(Debug)]
pub struct Subscription {
    receiver: Receiver<AnnotationEvent>,
}

impl Subscription {
    /// Next pending event, without waiting.
    pub fn try_next(&self) -> Option<AnnotationEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn next_timeout(&self, timeout: Duration) -> Option<AnnotationEvent> {
        match self.receiver.recv_timeout(timeout) {
            Ok(event) => Some(event),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Every event published since the last call.
    pub fn drain(&self) -> Vec<AnnotationEvent> {
        self.receiver.try_iter().collect()
    }
}
