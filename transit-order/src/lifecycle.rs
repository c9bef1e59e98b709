use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use transit_catalog::{LedgerError, TripLedger};
use transit_core::payment::{PaymentAdapter, PaymentOutcome};
use transit_core::repository::StatusChange;
use transit_core::{Capability, CoreError, Principal};
use transit_shared::{Booking, CancellationReason, DomainEvent, PaymentStatus, Trip, TripStatus};

use crate::registry::{BookingRegistry, RegistryError};

/// Sending half of the domain event channel. Emission never fails a
/// transition; a closed channel is only logged.
#[derive(Clone)]
pub struct EventEmitter {
    tx: mpsc::UnboundedSender<DomainEvent>,
}

impl EventEmitter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<DomainEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: DomainEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            warn!("Event channel closed, dropping {}", name);
        }
    }
}

/// Orchestrates seat claims, payment confirmation, cancellation and trip
/// status changes across the trip ledger and the booking registry.
///
/// Seat state per (trip, seat) moves Free -> PendingPayment -> Confirmed, or
/// back to Free on cancellation. Each step that touches both the ledger and
/// the registry undoes its first write if the second one fails.
#[derive(Clone)]
pub struct BookingEngine {
    ledger: TripLedger,
    registry: BookingRegistry,
    payments: Arc<dyn PaymentAdapter>,
    events: EventEmitter,
}

impl BookingEngine {
    pub fn new(
        ledger: TripLedger,
        registry: BookingRegistry,
        payments: Arc<dyn PaymentAdapter>,
        events: EventEmitter,
    ) -> Self {
        Self {
            ledger,
            registry,
            payments,
            events,
        }
    }

    pub async fn book_seat(
        &self,
        rider: &Principal,
        trip_id: &str,
        seat_number: i64,
    ) -> Result<Booking, BookingError> {
        authorize(rider, Capability::BookSeat)?;

        let trip = self.ledger.reserve_seat(trip_id, seat_number).await?;
        // The ledger only accepts seats in 1..=total, so this fits.
        let seat = seat_number as u32;

        let booking = match self.registry.create(&trip.trip_id, &rider.subject, seat).await {
            Ok(booking) => booking,
            Err(e) => {
                error!("Failed to record booking for {} seat {}: {}", trip_id, seat, e);
                if let Err(release_err) = self.ledger.release_seat(trip_id, seat).await {
                    error!(
                        "Compensation failed, seat {} on trip {} stays claimed: {}",
                        seat, trip_id, release_err
                    );
                }
                return Err(e.into());
            }
        };

        info!(
            "Seat {} on trip {} held by {} as {}",
            seat, trip_id, rider.subject, booking.booking_id
        );
        self.events.emit(DomainEvent::SeatBooked {
            booking: booking.clone(),
        });
        Ok(booking)
    }

    pub async fn confirm_payment(
        &self,
        rider: &Principal,
        booking_id: &str,
    ) -> Result<Booking, BookingError> {
        authorize(rider, Capability::ConfirmPayment)?;

        let booking = self.owned_booking(rider, booking_id).await?;
        match booking.payment_status {
            PaymentStatus::Pending => {}
            PaymentStatus::Confirmed => return Err(BookingError::AlreadyConfirmed),
            PaymentStatus::Cancelled => return Err(BookingError::booking_not_found()),
        }

        let receipt = self
            .payments
            .process_payment(&booking)
            .await
            .map_err(|e| BookingError::Unavailable(e.to_string()))?;
        if receipt.outcome == PaymentOutcome::Declined {
            return Err(BookingError::PaymentDeclined(receipt.reference));
        }

        let change = self
            .registry
            .set_payment_status(booking_id, PaymentStatus::Pending, PaymentStatus::Confirmed)
            .await?;
        match change {
            StatusChange::Applied(confirmed) => {
                info!("Booking {} confirmed ({})", booking_id, receipt.reference);
                self.events.emit(DomainEvent::PaymentConfirmed {
                    booking: confirmed.clone(),
                });
                Ok(confirmed)
            }
            StatusChange::Refused(PaymentStatus::Confirmed) => Err(BookingError::AlreadyConfirmed),
            StatusChange::Refused(_) | StatusChange::NotFound => Err(BookingError::booking_not_found()),
        }
    }

    pub async fn cancel_booking(
        &self,
        rider: &Principal,
        booking_id: &str,
    ) -> Result<Booking, BookingError> {
        authorize(rider, Capability::CancelBooking)?;

        let booking = self.owned_booking(rider, booking_id).await?;
        self.cancel_pending(booking, CancellationReason::Rider).await
    }

    /// System-initiated cancellation of an unpaid booking. Returns `None` when
    /// the booking is gone or no longer pending.
    pub async fn expire_booking(&self, booking_id: &str) -> Result<Option<Booking>, BookingError> {
        let Some(booking) = self.registry.find_by_id(booking_id).await? else {
            return Ok(None);
        };
        if booking.payment_status != PaymentStatus::Pending {
            return Ok(None);
        }
        match self.cancel_pending(booking, CancellationReason::Expired).await {
            Ok(cancelled) => Ok(Some(cancelled)),
            // Lost a race against payment or a rider cancel.
            Err(BookingError::CannotCancelConfirmed | BookingError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Moves a trip to `completed` or `cancelled`. Bookings are left in place;
    /// riders holding active bookings are told about the change.
    pub async fn update_trip_status(
        &self,
        actor: &Principal,
        trip_id: &str,
        status: TripStatus,
    ) -> Result<Trip, BookingError> {
        authorize(actor, Capability::UpdateTripStatus)?;

        let trip = self.ledger.set_status(trip_id, status).await?;

        let affected_riders = match self.registry.active_for_trip(trip_id).await {
            Ok(bookings) => bookings
                .into_iter()
                .map(|b| b.rider_id)
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect(),
            Err(e) => {
                warn!("Could not list riders on trip {}: {}", trip_id, e);
                Vec::new()
            }
        };

        info!(
            "{} set trip {} to {} ({} rider(s) affected)",
            actor.subject,
            trip_id,
            status,
            affected_riders.len()
        );
        self.events.emit(DomainEvent::TripStatusChanged {
            trip_id: trip_id.to_string(),
            status,
            affected_riders,
        });
        Ok(trip)
    }

    /// The rider's bookings, newest first.
    pub async fn bookings_for(&self, rider: &Principal) -> Result<Vec<Booking>, BookingError> {
        authorize(rider, Capability::ViewOwnBookings)?;

        let mut bookings = self.registry.find_by_rider(&rider.subject).await?;
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    pub async fn stale_pending(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>, BookingError> {
        Ok(self.registry.pending_older_than(cutoff).await?)
    }

    async fn owned_booking(&self, rider: &Principal, booking_id: &str) -> Result<Booking, BookingError> {
        let booking = self
            .registry
            .find_by_id(booking_id)
            .await?
            .ok_or_else(BookingError::booking_not_found)?;
        if !booking.is_owned_by(&rider.subject) {
            return Err(BookingError::Forbidden(
                "This booking belongs to another rider".to_string(),
            ));
        }
        Ok(booking)
    }

    /// pending -> cancelled, release the seat, then drop the record. The
    /// status flip happens first so a racing confirmation cannot succeed on a
    /// booking whose seat is being given back.
    async fn cancel_pending(
        &self,
        booking: Booking,
        reason: CancellationReason,
    ) -> Result<Booking, BookingError> {
        if booking.payment_status == PaymentStatus::Confirmed {
            return Err(BookingError::CannotCancelConfirmed);
        }
        let booking_id = booking.booking_id.as_str();

        let cancelled = match self
            .registry
            .set_payment_status(booking_id, PaymentStatus::Pending, PaymentStatus::Cancelled)
            .await?
        {
            StatusChange::Applied(b) => b,
            StatusChange::Refused(PaymentStatus::Confirmed) => {
                return Err(BookingError::CannotCancelConfirmed)
            }
            StatusChange::Refused(_) | StatusChange::NotFound => {
                return Err(BookingError::booking_not_found())
            }
        };

        if let Err(e) = self
            .ledger
            .release_seat(&booking.trip_id, booking.seat_number)
            .await
        {
            error!(
                "Failed to release seat {} on trip {} for {}: {}",
                booking.seat_number, booking.trip_id, booking_id, e
            );
            match self
                .registry
                .set_payment_status(booking_id, PaymentStatus::Cancelled, PaymentStatus::Pending)
                .await
            {
                Ok(StatusChange::Applied(_)) => {}
                Ok(other) => error!("Could not restore {} to pending: {:?}", booking_id, other),
                Err(restore_err) => error!("Could not restore {} to pending: {}", booking_id, restore_err),
            }
            return Err(BookingError::Unavailable(e.to_string()));
        }

        // The seat is free and the status is terminal; a leftover record is harmless.
        match self.registry.delete(booking_id).await {
            Ok(true) => {}
            Ok(false) => warn!("Booking {} vanished before deletion", booking_id),
            Err(e) => warn!("Cancelled booking {} could not be deleted: {}", booking_id, e),
        }

        info!("Booking {} cancelled ({:?})", booking_id, reason);
        self.events.emit(DomainEvent::BookingCancelled {
            booking: cancelled.clone(),
            reason,
        });
        Ok(cancelled)
    }
}

fn authorize(principal: &Principal, capability: Capability) -> Result<(), BookingError> {
    principal.authorize(capability).map_err(|e| match e {
        CoreError::Forbidden(msg) => BookingError::Forbidden(msg),
        other => BookingError::Unavailable(other.to_string()),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0}")]
    NotFound(String),

    #[error("Seat already booked")]
    SeatTaken,

    #[error("Invalid seat number")]
    InvalidSeat,

    #[error("{0}")]
    TripNotBookable(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Booking is already confirmed")]
    AlreadyConfirmed,

    #[error("Confirmed bookings cannot be cancelled")]
    CannotCancelConfirmed,

    #[error("Payment declined ({0})")]
    PaymentDeclined(String),

    #[error("{0}")]
    InvalidStatus(String),

    #[error("Booking with this ID already exists")]
    DuplicateBooking(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl BookingError {
    fn booking_not_found() -> Self {
        BookingError::NotFound("Booking not found".to_string())
    }
}

impl From<LedgerError> for BookingError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::TripNotFound(_) => BookingError::NotFound(err.to_string()),
            LedgerError::SeatTaken(_) => BookingError::SeatTaken,
            LedgerError::InvalidSeat(_) => BookingError::InvalidSeat,
            LedgerError::TripNotScheduled { .. } => BookingError::TripNotBookable(err.to_string()),
            LedgerError::StatusFinal { .. } | LedgerError::InvalidStatus(_) => {
                BookingError::InvalidStatus(err.to_string())
            }
            LedgerError::DuplicateTrip(_) | LedgerError::Store(_) => {
                BookingError::Unavailable(err.to_string())
            }
        }
    }
}

impl From<RegistryError> for BookingError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::DuplicateId(id) => BookingError::DuplicateBooking(id),
            RegistryError::Store(e) => BookingError::Unavailable(e.to_string()),
        }
    }
}

impl From<BookingError> for CoreError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::NotFound(msg) => CoreError::NotFound(msg),
            BookingError::Forbidden(msg) => CoreError::Forbidden(msg),
            BookingError::DuplicateBooking(_) => CoreError::Conflict(err.to_string()),
            BookingError::Unavailable(msg) => CoreError::Unavailable(msg),
            other => CoreError::InvalidInput(other.to_string()),
        }
    }
}
