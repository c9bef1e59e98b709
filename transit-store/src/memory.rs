use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use transit_core::repository::{
    BookingStore, FleetStore, NotificationStore, SeatClaim, StatusChange, TripStore,
};
use transit_core::StoreResult;
use transit_shared::{
    Booking, Bus, Notification, Operator, PaymentStatus, Route, Trip, TripSchedule, TripStatus,
};
use uuid::Uuid;

/// A thread-safe in-process document store.
///
/// Every trip sits behind its own mutex, so a seat claim only ever waits on
/// claims for the same trip. The outer map lock is held just long enough to
/// look the trip up.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    trips: Arc<RwLock<HashMap<String, Arc<Mutex<Trip>>>>>,
    bookings: Arc<RwLock<HashMap<String, Booking>>>,
    notifications: Arc<RwLock<HashMap<String, Vec<Notification>>>>,
    buses: Arc<RwLock<HashMap<String, Bus>>>,
    routes: Arc<RwLock<HashMap<Uuid, Route>>>,
    operators: Arc<RwLock<HashMap<Uuid, Operator>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn trip_slot(&self, trip_id: &str) -> Option<Arc<Mutex<Trip>>> {
        self.trips.read().await.get(trip_id).cloned()
    }
}

#[async_trait]
impl TripStore for InMemoryStore {
    async fn insert_trip(&self, trip: &Trip) -> StoreResult<bool> {
        let mut trips = self.trips.write().await;
        if trips.contains_key(&trip.trip_id) {
            return Ok(false);
        }
        trips.insert(trip.trip_id.clone(), Arc::new(Mutex::new(trip.clone())));
        Ok(true)
    }

    async fn get_trip(&self, trip_id: &str) -> StoreResult<Option<Trip>> {
        match self.trip_slot(trip_id).await {
            Some(slot) => Ok(Some(slot.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn list_trips(&self) -> StoreResult<Vec<Trip>> {
        let slots: Vec<_> = self.trips.read().await.values().cloned().collect();
        let mut trips = Vec::with_capacity(slots.len());
        for slot in slots {
            trips.push(slot.lock().await.clone());
        }
        trips.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(trips)
    }

    async fn reserve_seat(&self, trip_id: &str, seat_number: u32) -> StoreResult<SeatClaim> {
        let Some(slot) = self.trip_slot(trip_id).await else {
            return Ok(SeatClaim::TripNotFound);
        };
        let mut trip = slot.lock().await;
        match trip.claim_seat(seat_number) {
            Ok(()) => Ok(SeatClaim::Reserved(trip.clone())),
            Err(rejection) => Ok(SeatClaim::Rejected(rejection)),
        }
    }

    async fn release_seat(&self, trip_id: &str, seat_number: u32) -> StoreResult<Option<Trip>> {
        let Some(slot) = self.trip_slot(trip_id).await else {
            return Ok(None);
        };
        let mut trip = slot.lock().await;
        trip.release_seat(seat_number);
        Ok(Some(trip.clone()))
    }

    async fn transition_trip(
        &self,
        trip_id: &str,
        to: TripStatus,
    ) -> StoreResult<StatusChange<Trip, TripStatus>> {
        let Some(slot) = self.trip_slot(trip_id).await else {
            return Ok(StatusChange::NotFound);
        };
        let mut trip = slot.lock().await;
        match trip.transition(to) {
            Ok(()) => Ok(StatusChange::Applied(trip.clone())),
            Err(current) => Ok(StatusChange::Refused(current)),
        }
    }

    async fn reschedule_trip(
        &self,
        trip_id: &str,
        changes: &TripSchedule,
    ) -> StoreResult<Option<Trip>> {
        let Some(slot) = self.trip_slot(trip_id).await else {
            return Ok(None);
        };
        let mut trip = slot.lock().await;
        trip.apply_schedule(changes);
        Ok(Some(trip.clone()))
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<bool> {
        let mut bookings = self.bookings.write().await;
        if bookings.contains_key(&booking.booking_id) {
            return Ok(false);
        }
        bookings.insert(booking.booking_id.clone(), booking.clone());
        Ok(true)
    }

    async fn get_booking(&self, booking_id: &str) -> StoreResult<Option<Booking>> {
        Ok(self.bookings.read().await.get(booking_id).cloned())
    }

    async fn bookings_for_rider(&self, rider_id: &str) -> StoreResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| b.rider_id == rider_id)
            .cloned()
            .collect())
    }

    async fn bookings_for_trip(&self, trip_id: &str) -> StoreResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| b.trip_id == trip_id)
            .cloned()
            .collect())
    }

    async fn bookings_with_status(&self, status: PaymentStatus) -> StoreResult<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .filter(|b| b.payment_status == status)
            .cloned()
            .collect())
    }

    async fn transition_booking(
        &self,
        booking_id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> StoreResult<StatusChange<Booking, PaymentStatus>> {
        let mut bookings = self.bookings.write().await;
        let Some(booking) = bookings.get_mut(booking_id) else {
            return Ok(StatusChange::NotFound);
        };
        if booking.payment_status != from {
            return Ok(StatusChange::Refused(booking.payment_status));
        }
        booking.set_status(to);
        Ok(StatusChange::Applied(booking.clone()))
    }

    async fn delete_booking(&self, booking_id: &str) -> StoreResult<bool> {
        Ok(self.bookings.write().await.remove(booking_id).is_some())
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        self.notifications
            .write()
            .await
            .entry(notification.recipient_id.clone())
            .or_default()
            .push(notification.clone());
        Ok(())
    }

    async fn notifications_for(&self, recipient_id: &str) -> StoreResult<Vec<Notification>> {
        let notifications = self.notifications.read().await;
        Ok(notifications
            .get(recipient_id)
            .map(|list| list.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    async fn mark_all_read(&self, recipient_id: &str) -> StoreResult<usize> {
        let mut notifications = self.notifications.write().await;
        let mut flipped = 0;
        if let Some(list) = notifications.get_mut(recipient_id) {
            for notification in list.iter_mut().filter(|n| !n.read) {
                notification.read = true;
                flipped += 1;
            }
        }
        Ok(flipped)
    }
}

#[async_trait]
impl FleetStore for InMemoryStore {
    async fn insert_bus(&self, bus: &Bus) -> StoreResult<bool> {
        let mut buses = self.buses.write().await;
        if buses.contains_key(&bus.ntc_no) {
            return Ok(false);
        }
        buses.insert(bus.ntc_no.clone(), bus.clone());
        Ok(true)
    }

    async fn get_bus(&self, ntc_no: &str) -> StoreResult<Option<Bus>> {
        Ok(self.buses.read().await.get(ntc_no).cloned())
    }

    async fn list_buses(&self) -> StoreResult<Vec<Bus>> {
        let mut buses: Vec<Bus> = self.buses.read().await.values().cloned().collect();
        buses.sort_by(|a, b| a.ntc_no.cmp(&b.ntc_no));
        Ok(buses)
    }

    async fn update_bus(&self, bus: &Bus) -> StoreResult<bool> {
        let mut buses = self.buses.write().await;
        match buses.get_mut(&bus.ntc_no) {
            Some(existing) => {
                *existing = bus.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_bus(&self, ntc_no: &str) -> StoreResult<bool> {
        Ok(self.buses.write().await.remove(ntc_no).is_some())
    }

    async fn insert_route(&self, route: &Route) -> StoreResult<bool> {
        let mut routes = self.routes.write().await;
        if routes.values().any(|r| r.number == route.number) {
            return Ok(false);
        }
        routes.insert(route.id, route.clone());
        Ok(true)
    }

    async fn get_route(&self, id: Uuid) -> StoreResult<Option<Route>> {
        Ok(self.routes.read().await.get(&id).cloned())
    }

    async fn list_routes(&self) -> StoreResult<Vec<Route>> {
        let mut routes: Vec<Route> = self.routes.read().await.values().cloned().collect();
        routes.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(routes)
    }

    async fn update_route(&self, route: &Route) -> StoreResult<bool> {
        let mut routes = self.routes.write().await;
        match routes.get_mut(&route.id) {
            Some(existing) => {
                *existing = route.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_route(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.routes.write().await.remove(&id).is_some())
    }

    async fn insert_operator(&self, operator: &Operator) -> StoreResult<bool> {
        let mut operators = self.operators.write().await;
        let email = operator.email.expose().to_lowercase();
        if operators
            .values()
            .any(|o| o.email.expose().to_lowercase() == email)
        {
            return Ok(false);
        }
        operators.insert(operator.id, operator.clone());
        Ok(true)
    }

    async fn get_operator(&self, id: Uuid) -> StoreResult<Option<Operator>> {
        Ok(self.operators.read().await.get(&id).cloned())
    }

    async fn update_operator(&self, operator: &Operator) -> StoreResult<bool> {
        let mut operators = self.operators.write().await;
        match operators.get_mut(&operator.id) {
            Some(existing) => {
                *existing = operator.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_operator(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.operators.write().await.remove(&id).is_some())
    }
}
