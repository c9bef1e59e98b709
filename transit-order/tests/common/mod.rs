#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::mpsc;
use transit_catalog::TripLedger;
use transit_core::payment::MockPaymentAdapter;
use transit_core::push::{PushError, PushTransport};
use transit_core::repository::{BookingStore, SeatClaim, StatusChange, TripStore};
use transit_core::{Principal, Role, StoreError, StoreResult};
use transit_order::{BookingEngine, BookingRegistry, EventEmitter};
use transit_shared::{
    Booking, DomainEvent, Notification, PaymentStatus, Trip, TripPlan, TripSchedule, TripStatus,
};
use transit_store::InMemoryStore;
use uuid::Uuid;

pub struct Harness {
    pub engine: BookingEngine,
    pub ledger: TripLedger,
    pub registry: BookingRegistry,
    pub events: mpsc::UnboundedReceiver<DomainEvent>,
}

impl Harness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self::with_stores(store.clone(), store)
    }

    pub fn with_stores(trips: Arc<dyn TripStore>, bookings: Arc<dyn BookingStore>) -> Self {
        let ledger = TripLedger::new(trips);
        let registry = BookingRegistry::new(bookings);
        let (emitter, events) = EventEmitter::channel();
        let engine = BookingEngine::new(
            ledger.clone(),
            registry.clone(),
            Arc::new(MockPaymentAdapter),
            emitter,
        );
        Self {
            engine,
            ledger,
            registry,
            events,
        }
    }

    pub async fn trip(&self, trip_id: &str, total: u32) -> Trip {
        self.ledger.create_trip(plan(trip_id, total)).await.unwrap()
    }

    pub fn drain_events(&mut self) -> Vec<DomainEvent> {
        let mut out = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            out.push(event);
        }
        out
    }
}

pub fn plan(trip_id: &str, total: u32) -> TripPlan {
    let start = Utc::now() + Duration::hours(6);
    TripPlan {
        trip_id: trip_id.to_string(),
        route_id: Uuid::new_v4(),
        bus_ntc_no: "NTC-1001".to_string(),
        start_time: start,
        end_time: start + Duration::hours(3),
        service_date: start.date_naive(),
        total_seats: total,
        withdrawn_seats: BTreeSet::new(),
    }
}

pub fn rider(name: &str) -> Principal {
    Principal::new(name, Role::Commuter)
}

pub fn operator() -> Principal {
    Principal::new("operator-1", Role::Operator)
}

fn injected() -> StoreError {
    StoreError::Backend("injected failure".to_string())
}

/// Booking store whose inserts fail while `fail_inserts` is set, or report an
/// id collision while `reject_inserts` is set.
#[derive(Default)]
pub struct FlakyBookings {
    pub inner: InMemoryStore,
    pub fail_inserts: AtomicBool,
    pub reject_inserts: AtomicBool,
}

#[async_trait]
impl BookingStore for FlakyBookings {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<bool> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(injected());
        }
        if self.reject_inserts.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inner.insert_booking(booking).await
    }

    async fn get_booking(&self, booking_id: &str) -> StoreResult<Option<Booking>> {
        self.inner.get_booking(booking_id).await
    }

    async fn bookings_for_rider(&self, rider_id: &str) -> StoreResult<Vec<Booking>> {
        self.inner.bookings_for_rider(rider_id).await
    }

    async fn bookings_for_trip(&self, trip_id: &str) -> StoreResult<Vec<Booking>> {
        self.inner.bookings_for_trip(trip_id).await
    }

    async fn bookings_with_status(&self, status: PaymentStatus) -> StoreResult<Vec<Booking>> {
        self.inner.bookings_with_status(status).await
    }

    async fn transition_booking(
        &self,
        booking_id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> StoreResult<StatusChange<Booking, PaymentStatus>> {
        self.inner.transition_booking(booking_id, from, to).await
    }

    async fn delete_booking(&self, booking_id: &str) -> StoreResult<bool> {
        self.inner.delete_booking(booking_id).await
    }
}

/// Trip store whose seat releases fail while `fail_releases` is set.
#[derive(Default)]
pub struct FlakyTrips {
    pub inner: InMemoryStore,
    pub fail_releases: AtomicBool,
}

#[async_trait]
impl TripStore for FlakyTrips {
    async fn insert_trip(&self, trip: &Trip) -> StoreResult<bool> {
        self.inner.insert_trip(trip).await
    }

    async fn get_trip(&self, trip_id: &str) -> StoreResult<Option<Trip>> {
        self.inner.get_trip(trip_id).await
    }

    async fn list_trips(&self) -> StoreResult<Vec<Trip>> {
        self.inner.list_trips().await
    }

    async fn reserve_seat(&self, trip_id: &str, seat_number: u32) -> StoreResult<SeatClaim> {
        self.inner.reserve_seat(trip_id, seat_number).await
    }

    async fn release_seat(&self, trip_id: &str, seat_number: u32) -> StoreResult<Option<Trip>> {
        if self.fail_releases.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.inner.release_seat(trip_id, seat_number).await
    }

    async fn transition_trip(
        &self,
        trip_id: &str,
        to: TripStatus,
    ) -> StoreResult<StatusChange<Trip, TripStatus>> {
        self.inner.transition_trip(trip_id, to).await
    }

    async fn reschedule_trip(
        &self,
        trip_id: &str,
        changes: &TripSchedule,
    ) -> StoreResult<Option<Trip>> {
        self.inner.reschedule_trip(trip_id, changes).await
    }
}

/// Push transport that is always down.
pub struct BrokenPush;

impl PushTransport for BrokenPush {
    fn publish(&self, _notification: &Notification) -> Result<usize, PushError> {
        Err(PushError::Transport("socket closed".to_string()))
    }
}
