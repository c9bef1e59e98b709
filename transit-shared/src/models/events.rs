use crate::models::booking::Booking;
use crate::models::trip::TripStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationReason {
    /// The rider cancelled their own pending booking.
    Rider,
    /// Pending for longer than the configured hold.
    Expired,
}

/// Output of every successful booking lifecycle transition.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DomainEvent {
    SeatBooked {
        booking: Booking,
    },
    PaymentConfirmed {
        booking: Booking,
    },
    BookingCancelled {
        booking: Booking,
        reason: CancellationReason,
    },
    TripStatusChanged {
        trip_id: String,
        status: TripStatus,
        affected_riders: Vec<String>,
    },
}

impl DomainEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::SeatBooked { .. } => "seat_booked",
            DomainEvent::PaymentConfirmed { .. } => "payment_confirmed",
            DomainEvent::BookingCancelled { .. } => "booking_cancelled",
            DomainEvent::TripStatusChanged { .. } => "trip_status_changed",
        }
    }
}
