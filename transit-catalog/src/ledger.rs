use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, warn};
use transit_core::repository::{SeatClaim, StatusChange, TripStore};
use transit_core::{CoreError, StoreError};
use transit_shared::{SeatRejection, Trip, TripPlan, TripSchedule, TripStatus};

/// Seat capacity and occupancy per trip.
///
/// The ledger never reads a trip and writes it back: every occupancy or status
/// change is handed to the store as one conditional update.
#[derive(Clone)]
pub struct TripLedger {
    store: Arc<dyn TripStore>,
}

impl TripLedger {
    pub fn new(store: Arc<dyn TripStore>) -> Self {
        Self { store }
    }

    pub async fn get_trip(&self, trip_id: &str) -> Result<Trip, LedgerError> {
        self.store
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| LedgerError::TripNotFound(trip_id.to_string()))
    }

    pub async fn list_trips(&self) -> Result<Vec<Trip>, LedgerError> {
        Ok(self.store.list_trips().await?)
    }

    /// Trips served by any of the given buses, soonest first.
    pub async fn trips_for_buses(&self, ntc_numbers: &[String]) -> Result<Vec<Trip>, LedgerError> {
        if ntc_numbers.is_empty() {
            return Ok(Vec::new());
        }
        let buses: HashSet<&str> = ntc_numbers.iter().map(String::as_str).collect();
        let trips = self.store.list_trips().await?;
        Ok(trips
            .into_iter()
            .filter(|t| buses.contains(t.bus_ntc_no.as_str()))
            .collect())
    }

    pub async fn create_trip(&self, plan: TripPlan) -> Result<Trip, LedgerError> {
        let trip = Trip::new(plan);
        if !self.store.insert_trip(&trip).await? {
            return Err(LedgerError::DuplicateTrip(trip.trip_id));
        }
        info!("Scheduled trip {} with {} seats", trip.trip_id, trip.total_seats);
        Ok(trip)
    }

    /// Claims `seat_number` on a scheduled trip. Seat numbers below one are
    /// rejected before the store is touched.
    pub async fn reserve_seat(&self, trip_id: &str, seat_number: i64) -> Result<Trip, LedgerError> {
        let seat = u32::try_from(seat_number)
            .ok()
            .filter(|s| *s > 0)
            .ok_or(LedgerError::InvalidSeat(seat_number))?;

        match self.store.reserve_seat(trip_id, seat).await? {
            SeatClaim::Reserved(trip) => {
                debug!(trip_id, seat, available = trip.available_seats, "seat reserved");
                Ok(trip)
            }
            SeatClaim::TripNotFound => Err(LedgerError::TripNotFound(trip_id.to_string())),
            SeatClaim::Rejected(SeatRejection::Taken) => Err(LedgerError::SeatTaken(seat)),
            SeatClaim::Rejected(SeatRejection::OutOfRange | SeatRejection::Withdrawn) => {
                Err(LedgerError::InvalidSeat(seat_number))
            }
            SeatClaim::Rejected(SeatRejection::NotScheduled(status)) => {
                Err(LedgerError::TripNotScheduled {
                    trip_id: trip_id.to_string(),
                    status,
                })
            }
        }
    }

    /// Releasing a seat that is not booked succeeds without changing anything.
    pub async fn release_seat(&self, trip_id: &str, seat_number: u32) -> Result<Trip, LedgerError> {
        self.store
            .release_seat(trip_id, seat_number)
            .await?
            .ok_or_else(|| LedgerError::TripNotFound(trip_id.to_string()))
    }

    /// Compare-and-set from `scheduled` into a final status.
    pub async fn set_status(&self, trip_id: &str, status: TripStatus) -> Result<Trip, LedgerError> {
        if !status.is_final() {
            return Err(LedgerError::InvalidStatus(status.to_string()));
        }
        match self.store.transition_trip(trip_id, status).await? {
            StatusChange::Applied(trip) => {
                info!("Trip {} is now {}", trip_id, status);
                Ok(trip)
            }
            StatusChange::Refused(current) => {
                warn!("Trip {} is already {}, refusing {}", trip_id, current, status);
                Err(LedgerError::StatusFinal {
                    trip_id: trip_id.to_string(),
                    status: current,
                })
            }
            StatusChange::NotFound => Err(LedgerError::TripNotFound(trip_id.to_string())),
        }
    }

    /// Rewrites schedule fields only. Occupancy and status are never touched.
    pub async fn reschedule(&self, trip_id: &str, changes: &TripSchedule) -> Result<Trip, LedgerError> {
        self.store
            .reschedule_trip(trip_id, changes)
            .await?
            .ok_or_else(|| LedgerError::TripNotFound(trip_id.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Trip not found")]
    TripNotFound(String),

    #[error("Trip with this ID already exists")]
    DuplicateTrip(String),

    #[error("Seat already booked")]
    SeatTaken(u32),

    #[error("Invalid seat number")]
    InvalidSeat(i64),

    #[error("Trip {trip_id} is {status} and no longer accepts bookings")]
    TripNotScheduled { trip_id: String, status: TripStatus },

    #[error("Trip {trip_id} is already {status}")]
    StatusFinal { trip_id: String, status: TripStatus },

    #[error("Invalid status")]
    InvalidStatus(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<LedgerError> for CoreError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::TripNotFound(_) => CoreError::NotFound(err.to_string()),
            LedgerError::DuplicateTrip(_) => CoreError::Conflict(err.to_string()),
            LedgerError::SeatTaken(_)
            | LedgerError::InvalidSeat(_)
            | LedgerError::TripNotScheduled { .. }
            | LedgerError::StatusFinal { .. }
            | LedgerError::InvalidStatus(_) => CoreError::InvalidInput(err.to_string()),
            LedgerError::Store(e) => e.into(),
        }
    }
}
