use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use transit_core::repository::FleetStore;
use transit_core::{CoreError, StoreError};
use transit_shared::pii::Masked;
use transit_shared::{Bus, BusType, Operator, Route, Trip, TripPlan, TripSchedule};
use uuid::Uuid;

use crate::ledger::{LedgerError, TripLedger};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBus {
    pub ntc_no: String,
    pub bus_no: String,
    pub driver_id: String,
    pub conductor_id: String,
    pub bus_type: BusType,
    pub bus_name: String,
    pub route_id: Uuid,
}

/// The NTC number is the bus's identity and cannot be changed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusUpdate {
    pub bus_no: Option<String>,
    pub driver_id: Option<String>,
    pub conductor_id: Option<String>,
    pub bus_type: Option<BusType>,
    pub bus_name: Option<String>,
    pub route_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoute {
    pub number: String,
    pub start: String,
    pub end: String,
    pub total_distance: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteUpdate {
    pub start: Option<String>,
    pub end: Option<String>,
    pub total_distance: Option<String>,
}

/// Every present field must match.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuery {
    pub route_id: Option<Uuid>,
    pub start: Option<String>,
    pub end: Option<String>,
}

impl RouteQuery {
    fn matches(&self, route: &Route) -> bool {
        self.route_id.map_or(true, |id| id == route.id)
            && self.start.as_deref().map_or(true, |s| s == route.start)
            && self.end.as_deref().map_or(true, |e| e == route.end)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOperator {
    pub email: Masked<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorUpdate {
    pub name: Option<String>,
}

/// Administrative management of buses, routes, operators and trip schedules.
#[derive(Clone)]
pub struct FleetService {
    store: Arc<dyn FleetStore>,
    ledger: TripLedger,
}

impl FleetService {
    pub fn new(store: Arc<dyn FleetStore>, ledger: TripLedger) -> Self {
        Self { store, ledger }
    }

    // Buses

    pub async fn add_bus(&self, input: NewBus) -> Result<Bus, FleetError> {
        if input.ntc_no.trim().is_empty() {
            return Err(FleetError::InvalidInput("NTC number is required".to_string()));
        }
        self.require_route(input.route_id).await?;

        let now = Utc::now();
        let bus = Bus {
            ntc_no: input.ntc_no,
            bus_no: input.bus_no,
            driver_id: input.driver_id,
            conductor_id: input.conductor_id,
            bus_type: input.bus_type,
            bus_name: input.bus_name,
            route_id: input.route_id,
            created_at: now,
            updated_at: now,
        };
        if !self.store.insert_bus(&bus).await? {
            return Err(FleetError::DuplicateBus(bus.ntc_no));
        }
        info!("Registered bus {}", bus.ntc_no);
        Ok(bus)
    }

    pub async fn list_buses(&self) -> Result<Vec<Bus>, FleetError> {
        Ok(self.store.list_buses().await?)
    }

    pub async fn get_bus(&self, ntc_no: &str) -> Result<Bus, FleetError> {
        self.store
            .get_bus(ntc_no)
            .await?
            .ok_or_else(|| FleetError::BusNotFound(ntc_no.to_string()))
    }

    pub async fn update_bus(&self, ntc_no: &str, changes: BusUpdate) -> Result<Bus, FleetError> {
        let mut bus = self.get_bus(ntc_no).await?;
        if let Some(route_id) = changes.route_id {
            self.require_route(route_id).await?;
            bus.route_id = route_id;
        }
        if let Some(v) = changes.bus_no {
            bus.bus_no = v;
        }
        if let Some(v) = changes.driver_id {
            bus.driver_id = v;
        }
        if let Some(v) = changes.conductor_id {
            bus.conductor_id = v;
        }
        if let Some(v) = changes.bus_type {
            bus.bus_type = v;
        }
        if let Some(v) = changes.bus_name {
            bus.bus_name = v;
        }
        bus.updated_at = Utc::now();

        if !self.store.update_bus(&bus).await? {
            return Err(FleetError::BusNotFound(ntc_no.to_string()));
        }
        Ok(bus)
    }

    pub async fn delete_bus(&self, ntc_no: &str) -> Result<(), FleetError> {
        if !self.store.delete_bus(ntc_no).await? {
            return Err(FleetError::BusNotFound(ntc_no.to_string()));
        }
        info!("Removed bus {}", ntc_no);
        Ok(())
    }

    // Routes

    pub async fn create_route(&self, input: NewRoute) -> Result<Route, FleetError> {
        if input.number.trim().is_empty() {
            return Err(FleetError::InvalidInput("Route number is required".to_string()));
        }
        let now = Utc::now();
        let route = Route {
            id: Uuid::new_v4(),
            number: input.number,
            start: input.start,
            end: input.end,
            total_distance: input.total_distance,
            created_at: now,
            updated_at: now,
        };
        if !self.store.insert_route(&route).await? {
            return Err(FleetError::DuplicateRoute(route.number));
        }
        info!("Created route {} ({} -> {})", route.number, route.start, route.end);
        Ok(route)
    }

    pub async fn search_routes(&self, query: &RouteQuery) -> Result<Vec<Route>, FleetError> {
        let routes = self.store.list_routes().await?;
        Ok(routes.into_iter().filter(|r| query.matches(r)).collect())
    }

    pub async fn update_route(&self, id: Uuid, changes: RouteUpdate) -> Result<Route, FleetError> {
        let mut route = self.require_route(id).await?;
        if let Some(v) = changes.start {
            route.start = v;
        }
        if let Some(v) = changes.end {
            route.end = v;
        }
        if let Some(v) = changes.total_distance {
            route.total_distance = v;
        }
        route.updated_at = Utc::now();

        if !self.store.update_route(&route).await? {
            return Err(FleetError::RouteNotFound(id));
        }
        Ok(route)
    }

    pub async fn delete_route(&self, id: Uuid) -> Result<(), FleetError> {
        if !self.store.delete_route(id).await? {
            return Err(FleetError::RouteNotFound(id));
        }
        Ok(())
    }

    // Operators

    pub async fn add_operator(&self, input: NewOperator) -> Result<Operator, FleetError> {
        let email = input.email.expose().trim();
        if !email.contains('@') {
            return Err(FleetError::InvalidInput("A valid email is required".to_string()));
        }
        let now = Utc::now();
        let operator = Operator {
            id: Uuid::new_v4(),
            email: Masked(email.to_string()),
            name: input.name,
            created_at: now,
            updated_at: now,
        };
        if !self.store.insert_operator(&operator).await? {
            return Err(FleetError::DuplicateOperator);
        }
        info!("Added operator {} ({})", operator.id, operator.email);
        Ok(operator)
    }

    pub async fn update_operator(&self, id: Uuid, changes: OperatorUpdate) -> Result<Operator, FleetError> {
        let mut operator = self
            .store
            .get_operator(id)
            .await?
            .ok_or(FleetError::OperatorNotFound(id))?;
        if changes.name.is_some() {
            operator.name = changes.name;
        }
        operator.updated_at = Utc::now();

        if !self.store.update_operator(&operator).await? {
            return Err(FleetError::OperatorNotFound(id));
        }
        Ok(operator)
    }

    pub async fn delete_operator(&self, id: Uuid) -> Result<(), FleetError> {
        if !self.store.delete_operator(id).await? {
            return Err(FleetError::OperatorNotFound(id));
        }
        info!("Removed operator {}", id);
        Ok(())
    }

    // Trips

    pub async fn schedule_trip(&self, plan: TripPlan) -> Result<Trip, FleetError> {
        self.require_route(plan.route_id).await?;
        self.get_bus(&plan.bus_ntc_no).await?;

        if plan.trip_id.trim().is_empty() {
            return Err(FleetError::InvalidInput("Trip ID is required".to_string()));
        }
        if plan.total_seats == 0 {
            return Err(FleetError::InvalidInput("Total seats must be positive".to_string()));
        }
        if plan
            .withdrawn_seats
            .iter()
            .any(|s| *s == 0 || *s > plan.total_seats)
        {
            return Err(FleetError::InvalidInput(
                "Withdrawn seats must lie within the trip's seat range".to_string(),
            ));
        }
        if plan.end_time <= plan.start_time {
            return Err(FleetError::InvalidInput("End time must be after start time".to_string()));
        }

        Ok(self.ledger.create_trip(plan).await?)
    }

    pub async fn list_trips(&self) -> Result<Vec<Trip>, FleetError> {
        Ok(self.ledger.list_trips().await?)
    }

    pub async fn reschedule_trip(&self, trip_id: &str, changes: TripSchedule) -> Result<Trip, FleetError> {
        let current = self.ledger.get_trip(trip_id).await?;
        if let Some(route_id) = changes.route_id {
            self.require_route(route_id).await?;
        }
        if let Some(bus) = &changes.bus_ntc_no {
            self.get_bus(bus).await?;
        }
        let start = changes.start_time.unwrap_or(current.start_time);
        let end = changes.end_time.unwrap_or(current.end_time);
        if end <= start {
            return Err(FleetError::InvalidInput("End time must be after start time".to_string()));
        }

        Ok(self.ledger.reschedule(trip_id, &changes).await?)
    }

    pub async fn operator_buses(&self, operator_id: &str) -> Result<Vec<Bus>, FleetError> {
        let mut buses = self.store.list_buses().await?;
        buses.retain(|b| b.driver_id == operator_id);
        Ok(buses)
    }

    /// Trips run by buses the operator drives.
    pub async fn operator_trips(&self, operator_id: &str) -> Result<Vec<Trip>, FleetError> {
        let buses: Vec<String> = self
            .operator_buses(operator_id)
            .await?
            .into_iter()
            .map(|b| b.ntc_no)
            .collect();
        Ok(self.ledger.trips_for_buses(&buses).await?)
    }

    async fn require_route(&self, id: Uuid) -> Result<Route, FleetError> {
        self.store
            .get_route(id)
            .await?
            .ok_or(FleetError::RouteNotFound(id))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    #[error("Bus not found")]
    BusNotFound(String),

    #[error("Route not found")]
    RouteNotFound(Uuid),

    #[error("Operator not found")]
    OperatorNotFound(Uuid),

    #[error("Bus with this NTC number already exists.")]
    DuplicateBus(String),

    #[error("Route number already exists")]
    DuplicateRoute(String),

    #[error("Operator with this email already exists")]
    DuplicateOperator,

    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<FleetError> for CoreError {
    fn from(err: FleetError) -> Self {
        match err {
            FleetError::BusNotFound(_)
            | FleetError::RouteNotFound(_)
            | FleetError::OperatorNotFound(_) => CoreError::NotFound(err.to_string()),
            FleetError::DuplicateBus(_)
            | FleetError::DuplicateRoute(_)
            | FleetError::DuplicateOperator => CoreError::Conflict(err.to_string()),
            FleetError::InvalidInput(msg) => CoreError::InvalidInput(msg),
            FleetError::Ledger(e) => e.into(),
            FleetError::Store(e) => e.into(),
        }
    }
}
