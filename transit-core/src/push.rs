use transit_shared::Notification;

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("no live subscribers")]
    NoSubscribers,
    #[error("push transport failed: {0}")]
    Transport(String),
}

/// Broadcast-to-all-subscribers primitive. Fire-and-forget: implementations
/// must not block and callers never retry.
pub trait PushTransport: Send + Sync {
    /// Returns how many subscribers the message was handed to.
    fn publish(&self, notification: &Notification) -> Result<usize, PushError>;
}
