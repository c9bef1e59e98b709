use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;
use transit_core::repository::{BookingStore, StatusChange};
use transit_core::StoreError;
use transit_shared::{Booking, PaymentStatus};

/// Booking records keyed by their generated id.
#[derive(Clone)]
pub struct BookingRegistry {
    store: Arc<dyn BookingStore>,
}

impl BookingRegistry {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Writes a fresh pending booking. Ids are random, so a collision is
    /// reported rather than retried.
    pub async fn create(&self, trip_id: &str, rider_id: &str, seat_number: u32) -> Result<Booking, RegistryError> {
        let booking = Booking::pending(trip_id, rider_id, seat_number);
        if !self.store.insert_booking(&booking).await? {
            return Err(RegistryError::DuplicateId(booking.booking_id));
        }
        debug!(booking_id = %booking.booking_id, trip_id, seat_number, "booking recorded");
        Ok(booking)
    }

    pub async fn find_by_id(&self, booking_id: &str) -> Result<Option<Booking>, RegistryError> {
        Ok(self.store.get_booking(booking_id).await?)
    }

    /// Unordered; callers sort for presentation.
    pub async fn find_by_rider(&self, rider_id: &str) -> Result<Vec<Booking>, RegistryError> {
        Ok(self.store.bookings_for_rider(rider_id).await?)
    }

    /// Pending and confirmed bookings on a trip.
    pub async fn active_for_trip(&self, trip_id: &str) -> Result<Vec<Booking>, RegistryError> {
        let bookings = self.store.bookings_for_trip(trip_id).await?;
        Ok(bookings
            .into_iter()
            .filter(|b| b.payment_status.is_active())
            .collect())
    }

    pub async fn pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, RegistryError> {
        let pending = self.store.bookings_with_status(PaymentStatus::Pending).await?;
        Ok(pending
            .into_iter()
            .filter(|b| b.created_at < cutoff)
            .collect())
    }

    /// Compare-and-set on the payment status.
    pub async fn set_payment_status(
        &self,
        booking_id: &str,
        expected: PaymentStatus,
        next: PaymentStatus,
    ) -> Result<StatusChange<Booking, PaymentStatus>, RegistryError> {
        Ok(self.store.transition_booking(booking_id, expected, next).await?)
    }

    pub async fn delete(&self, booking_id: &str) -> Result<bool, RegistryError> {
        Ok(self.store.delete_booking(booking_id).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Booking id collision: {0}")]
    DuplicateId(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
