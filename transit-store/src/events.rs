use tokio::sync::broadcast;
use tracing::debug;
use transit_core::push::{PushError, PushTransport};
use transit_shared::Notification;

/// In-process push transport. Each connected client holds a receiver and
/// filters for its own recipient id.
#[derive(Clone)]
pub struct BroadcastPush {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastPush {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.tx.subscribe()
    }
}

impl PushTransport for BroadcastPush {
    fn publish(&self, notification: &Notification) -> Result<usize, PushError> {
        let delivered = self
            .tx
            .send(notification.clone())
            .map_err(|_| PushError::NoSubscribers)?;
        debug!(
            "Pushed notification {} to {} subscriber(s)",
            notification.id, delivered
        );
        Ok(delivered)
    }
}
