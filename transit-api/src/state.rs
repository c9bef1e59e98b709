use std::sync::Arc;

use tokio::sync::mpsc;
use transit_catalog::{FleetService, TripLedger};
use transit_core::payment::MockPaymentAdapter;
use transit_core::repository::{BookingStore, FleetStore, NotificationStore, TripStore};
use transit_order::{BookingEngine, BookingRegistry, EventEmitter, NotificationDispatcher};
use transit_shared::DomainEvent;
use transit_store::BroadcastPush;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: chrono::Duration,
}

#[derive(Clone)]
pub struct AppState {
    pub engine: BookingEngine,
    pub fleet: FleetService,
    pub notifications: NotificationDispatcher,
    pub push: BroadcastPush,
    pub auth: AuthConfig,
}

impl AppState {
    /// Wires every component over one store. The returned receiver must be
    /// handed to `NotificationDispatcher::run`.
    pub fn build<S>(
        store: Arc<S>,
        push: BroadcastPush,
        auth: AuthConfig,
    ) -> (Self, mpsc::UnboundedReceiver<DomainEvent>)
    where
        S: TripStore + BookingStore + NotificationStore + FleetStore + 'static,
    {
        let trips: Arc<dyn TripStore> = store.clone();
        let bookings: Arc<dyn BookingStore> = store.clone();
        let notes: Arc<dyn NotificationStore> = store.clone();
        let fleet_store: Arc<dyn FleetStore> = store;

        let ledger = TripLedger::new(trips);
        let (emitter, events) = EventEmitter::channel();
        let engine = BookingEngine::new(
            ledger.clone(),
            BookingRegistry::new(bookings),
            Arc::new(MockPaymentAdapter),
            emitter,
        );

        let state = Self {
            engine,
            fleet: FleetService::new(fleet_store, ledger),
            notifications: NotificationDispatcher::new(notes, Arc::new(push.clone())),
            push,
            auth,
        };
        (state, events)
    }
}
