use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use transit_catalog::fleet::{
    BusUpdate, NewBus, NewOperator, NewRoute, OperatorUpdate, RouteQuery, RouteUpdate,
};
use transit_core::{Capability, Principal};
use transit_shared::{Bus, Trip, TripPlan, TripSchedule, TripStatus};
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{JsonBody, PathParam, QueryParams};
use crate::state::AppState;

type Created = (StatusCode, Json<Value>);

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/buses", get(list_buses).post(add_bus))
        .route("/buses/{ntc_no}", get(get_bus).put(update_bus).delete(delete_bus))
        .route("/routes", get(search_routes).post(create_route))
        .route("/routes/{id}", put(update_route).delete(delete_route))
        .route("/trips", get(list_trips).post(add_trip))
        .route("/trips/{trip_id}", put(update_trip))
        .route("/trips/{trip_id}/cancel", put(cancel_trip))
        .route("/operators", post(add_operator))
        .route("/operators/{id}", put(update_operator).delete(delete_operator))
}

// Buses

async fn list_buses(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
) -> Result<Json<Vec<Bus>>, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    Ok(Json(state.fleet.list_buses().await?))
}

async fn add_bus(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    JsonBody(req): JsonBody<NewBus>,
) -> Result<Created, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    let bus = state.fleet.add_bus(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Bus added successfully", "bus": bus })),
    ))
}

async fn get_bus(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    PathParam(ntc_no): PathParam<String>,
) -> Result<Json<Bus>, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    Ok(Json(state.fleet.get_bus(&ntc_no).await?))
}

async fn update_bus(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    PathParam(ntc_no): PathParam<String>,
    JsonBody(req): JsonBody<BusUpdate>,
) -> Result<Json<Value>, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    let bus = state.fleet.update_bus(&ntc_no, req).await?;
    Ok(Json(json!({ "message": "Bus updated successfully", "bus": bus })))
}

async fn delete_bus(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    PathParam(ntc_no): PathParam<String>,
) -> Result<Json<Value>, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    state.fleet.delete_bus(&ntc_no).await?;
    Ok(Json(json!({ "message": "Bus deleted successfully" })))
}

// Routes

async fn search_routes(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    QueryParams(query): QueryParams<RouteQuery>,
) -> Result<Json<Value>, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    Ok(Json(json!(state.fleet.search_routes(&query).await?)))
}

async fn create_route(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    JsonBody(req): JsonBody<NewRoute>,
) -> Result<Created, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    let route = state.fleet.create_route(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Route created successfully", "route": route })),
    ))
}

async fn update_route(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(req): JsonBody<RouteUpdate>,
) -> Result<Json<Value>, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    let route = state.fleet.update_route(id, req).await?;
    Ok(Json(json!({ "message": "Route updated successfully", "route": route })))
}

async fn delete_route(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Value>, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    state.fleet.delete_route(id).await?;
    Ok(Json(json!({ "message": "Route deleted successfully" })))
}

// Trips

async fn list_trips(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
) -> Result<Json<Vec<Trip>>, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    Ok(Json(state.fleet.list_trips().await?))
}

async fn add_trip(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    JsonBody(plan): JsonBody<TripPlan>,
) -> Result<Created, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    let trip = state.fleet.schedule_trip(plan).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Trip added successfully", "trip": trip })),
    ))
}

async fn update_trip(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    PathParam(trip_id): PathParam<String>,
    JsonBody(changes): JsonBody<TripSchedule>,
) -> Result<Json<Value>, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    let trip = state.fleet.reschedule_trip(&trip_id, changes).await?;
    Ok(Json(json!({ "message": "Trip updated successfully", "trip": trip })))
}

async fn cancel_trip(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    PathParam(trip_id): PathParam<String>,
) -> Result<Json<Value>, AppError> {
    admin.authorize(Capability::ManageFleet)?;
    let trip = state
        .engine
        .update_trip_status(&admin, &trip_id, TripStatus::Cancelled)
        .await?;
    Ok(Json(json!({ "message": "Trip cancelled successfully", "trip": trip })))
}

// Operators

async fn add_operator(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    JsonBody(req): JsonBody<NewOperator>,
) -> Result<Created, AppError> {
    admin.authorize(Capability::ManageOperators)?;
    let operator = state.fleet.add_operator(req).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Operator added successfully", "operator": operator })),
    ))
}

async fn update_operator(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    PathParam(id): PathParam<Uuid>,
    JsonBody(req): JsonBody<OperatorUpdate>,
) -> Result<Json<Value>, AppError> {
    admin.authorize(Capability::ManageOperators)?;
    let operator = state.fleet.update_operator(id, req).await?;
    Ok(Json(json!({ "message": "Operator updated successfully", "operator": operator })))
}

async fn delete_operator(
    State(state): State<AppState>,
    Extension(admin): Extension<Principal>,
    PathParam(id): PathParam<Uuid>,
) -> Result<Json<Value>, AppError> {
    admin.authorize(Capability::ManageOperators)?;
    state.fleet.delete_operator(id).await?;
    Ok(Json(json!({ "message": "Operator deleted successfully" })))
}
