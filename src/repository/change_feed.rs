use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::domain::rsvp::RsvpId;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// Notifications were dropped, listeners should assume anything changed.
    Resync,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub id: Option<RsvpId>,
}

impl ChangeEvent {
    pub fn inserted(id: RsvpId) -> Self {
        Self { kind: ChangeKind::Insert, id: Some(id) }
    }

    pub fn updated(id: RsvpId) -> Self {
        Self { kind: ChangeKind::Update, id: Some(id) }
    }

    pub fn deleted(id: RsvpId) -> Self {
        Self { kind: ChangeKind::Delete, id: Some(id) }
    }

    pub fn resync() -> Self {
        Self { kind: ChangeKind::Resync, id: None }
    }
}

pub type ChangeHandler = Arc<dyn Fn(ChangeEvent) + Send + Sync>;

/// Fan-out of record table changes to every subscriber.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub const DEFAULT_CAPACITY: usize = 64;

    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns how many subscribers will see the event.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Runs `handler` for every event published after this call. Must be
    /// called from within a tokio runtime.
    pub fn subscribe(&self, handler: ChangeHandler) -> Subscription {
        let mut receiver = self.sender.subscribe();
        let id = Uuid::new_v4();

        let task = tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        debug!(
                            subscription = %id,
                            kind = ?event.kind,
                            record = ?event.id,
                            "Change received"
                        );
                        handler(event);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(subscription = %id, skipped, "Change listener lagged behind");
                        handler(ChangeEvent::resync());
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Subscription { id, task: Some(task) }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

/// Handle to a running change listener. Cancelling or dropping it stops
/// further handler calls.
#[derive(Debug)]
pub struct Subscription {
    id: Uuid,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// A handle with no listener behind it, for backends without a feed.
    pub fn inactive() -> Self {
        Self { id: Uuid::new_v4(), task: None }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.stop();
    }
}
