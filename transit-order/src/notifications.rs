use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use transit_core::push::{PushError, PushTransport};
use transit_core::repository::NotificationStore;
use transit_core::StoreResult;
use transit_shared::{CancellationReason, DomainEvent, Notification, NotificationCategory};

/// Turns domain events into per-rider notifications.
///
/// The stored notification is the durable record. The live push that follows
/// is best effort: it is attempted once and its failure is only logged.
#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn NotificationStore>,
    push: Arc<dyn PushTransport>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn NotificationStore>, push: Arc<dyn PushTransport>) -> Self {
        Self { store, push }
    }

    pub async fn notify(
        &self,
        recipient_id: &str,
        category: NotificationCategory,
        title: &str,
        message: &str,
    ) -> StoreResult<Notification> {
        let notification = Notification::new(recipient_id, category, title, message);
        self.store.insert_notification(&notification).await?;

        match self.push.publish(&notification) {
            Ok(_) => {}
            Err(PushError::NoSubscribers) => {
                debug!("No live subscribers for notification {}", notification.id)
            }
            Err(e) => warn!("Push for notification {} failed: {}", notification.id, e),
        }
        Ok(notification)
    }

    /// Newest first.
    pub async fn list_for_rider(&self, rider_id: &str) -> StoreResult<Vec<Notification>> {
        let mut notifications = self.store.notifications_for(rider_id).await?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    /// Idempotent. Returns how many notifications were unread.
    pub async fn mark_all_read(&self, rider_id: &str) -> StoreResult<usize> {
        self.store.mark_all_read(rider_id).await
    }

    /// Consumes events until every sender is dropped.
    pub async fn run(self, mut events: mpsc::UnboundedReceiver<DomainEvent>) {
        info!("Notification dispatcher started");
        while let Some(event) = events.recv().await {
            self.handle(&event).await;
        }
        info!("Notification dispatcher stopped");
    }

    pub async fn handle(&self, event: &DomainEvent) {
        for (recipient, category, title, message) in compose(event) {
            if let Err(e) = self.notify(&recipient, category, &title, &message).await {
                error!(
                    "Failed to record {} notification for {}: {}",
                    event.name(),
                    recipient,
                    e
                );
            }
        }
    }
}

fn compose(event: &DomainEvent) -> Vec<(String, NotificationCategory, String, String)> {
    match event {
        DomainEvent::SeatBooked { booking } => vec![(
            booking.rider_id.clone(),
            NotificationCategory::Booking,
            "Seat booked".to_string(),
            format!(
                "Seat {} on trip {} is held for you. Complete payment to confirm booking {}.",
                booking.seat_number, booking.trip_id, booking.booking_id
            ),
        )],
        DomainEvent::PaymentConfirmed { booking } => vec![(
            booking.rider_id.clone(),
            NotificationCategory::Payment,
            "Payment confirmed".to_string(),
            format!(
                "Booking {} for seat {} on trip {} is confirmed.",
                booking.booking_id, booking.seat_number, booking.trip_id
            ),
        )],
        DomainEvent::BookingCancelled { booking, reason } => {
            let (title, message) = match reason {
                CancellationReason::Rider => (
                    "Booking cancelled",
                    format!(
                        "Booking {} was cancelled and seat {} released.",
                        booking.booking_id, booking.seat_number
                    ),
                ),
                CancellationReason::Expired => (
                    "Booking expired",
                    format!(
                        "Booking {} was not paid in time and seat {} was released.",
                        booking.booking_id, booking.seat_number
                    ),
                ),
            };
            vec![(
                booking.rider_id.clone(),
                NotificationCategory::Cancellation,
                title.to_string(),
                message,
            )]
        }
        DomainEvent::TripStatusChanged {
            trip_id,
            status,
            affected_riders,
        } => affected_riders
            .iter()
            .map(|rider| {
                (
                    rider.clone(),
                    NotificationCategory::TripStatus,
                    format!("Trip {}", status),
                    format!("Trip {} has been marked {}.", trip_id, status),
                )
            })
            .collect(),
    }
}
