use async_trait::async_trait;
use transit_shared::{
    Booking, Bus, Notification, Operator, PaymentStatus, Route, SeatRejection, Trip, TripSchedule,
    TripStatus,
};
use uuid::Uuid;

/// Failure of the storage backend itself, as opposed to a domain refusal.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("corrupt record {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of the atomic seat reservation primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum SeatClaim {
    Reserved(Trip),
    Rejected(SeatRejection),
    TripNotFound,
}

/// Outcome of a compare-and-set on a status field.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusChange<T, S> {
    Applied(T),
    /// The record exists but its current status did not allow the change.
    Refused(S),
    NotFound,
}

/// Trip documents plus their occupancy. Every mutation of occupancy or status
/// is a single conditional update inside the store.
#[async_trait]
pub trait TripStore: Send + Sync {
    /// Returns false when a trip with the same id already exists.
    async fn insert_trip(&self, trip: &Trip) -> StoreResult<bool>;

    async fn get_trip(&self, trip_id: &str) -> StoreResult<Option<Trip>>;

    async fn list_trips(&self) -> StoreResult<Vec<Trip>>;

    /// Adds the seat to the booked set and decrements availability only if
    /// the trip is scheduled and the seat is in range, offered and free.
    async fn reserve_seat(&self, trip_id: &str, seat_number: u32) -> StoreResult<SeatClaim>;

    /// `None` when the trip does not exist. Releasing a free seat is a no-op.
    async fn release_seat(&self, trip_id: &str, seat_number: u32) -> StoreResult<Option<Trip>>;

    async fn transition_trip(
        &self,
        trip_id: &str,
        to: TripStatus,
    ) -> StoreResult<StatusChange<Trip, TripStatus>>;

    async fn reschedule_trip(
        &self,
        trip_id: &str,
        changes: &TripSchedule,
    ) -> StoreResult<Option<Trip>>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Insert-if-absent on the booking id.
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<bool>;

    async fn get_booking(&self, booking_id: &str) -> StoreResult<Option<Booking>>;

    async fn bookings_for_rider(&self, rider_id: &str) -> StoreResult<Vec<Booking>>;

    async fn bookings_for_trip(&self, trip_id: &str) -> StoreResult<Vec<Booking>>;

    async fn bookings_with_status(&self, status: PaymentStatus) -> StoreResult<Vec<Booking>>;

    async fn transition_booking(
        &self,
        booking_id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> StoreResult<StatusChange<Booking, PaymentStatus>>;

    /// Returns false when nothing was deleted.
    async fn delete_booking(&self, booking_id: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()>;

    async fn notifications_for(&self, recipient_id: &str) -> StoreResult<Vec<Notification>>;

    /// Returns how many notifications flipped from unread to read.
    async fn mark_all_read(&self, recipient_id: &str) -> StoreResult<usize>;
}

/// Buses, routes and operator accounts. Natural keys (NTC number, route
/// number, operator email) are unique and immutable.
#[async_trait]
pub trait FleetStore: Send + Sync {
    async fn insert_bus(&self, bus: &Bus) -> StoreResult<bool>;
    async fn get_bus(&self, ntc_no: &str) -> StoreResult<Option<Bus>>;
    async fn list_buses(&self) -> StoreResult<Vec<Bus>>;
    async fn update_bus(&self, bus: &Bus) -> StoreResult<bool>;
    async fn delete_bus(&self, ntc_no: &str) -> StoreResult<bool>;

    async fn insert_route(&self, route: &Route) -> StoreResult<bool>;
    async fn get_route(&self, id: Uuid) -> StoreResult<Option<Route>>;
    async fn list_routes(&self) -> StoreResult<Vec<Route>>;
    async fn update_route(&self, route: &Route) -> StoreResult<bool>;
    async fn delete_route(&self, id: Uuid) -> StoreResult<bool>;

    async fn insert_operator(&self, operator: &Operator) -> StoreResult<bool>;
    async fn get_operator(&self, id: Uuid) -> StoreResult<Option<Operator>>;
    async fn update_operator(&self, operator: &Operator) -> StoreResult<bool>;
    async fn delete_operator(&self, id: Uuid) -> StoreResult<bool>;
}
