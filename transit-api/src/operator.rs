use axum::{
    extract::State,
    routing::{get, put},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use transit_core::{Capability, Principal};
use transit_shared::{Bus, Trip, TripStatus};

use crate::error::AppError;
use crate::extract::{JsonBody, PathParam};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct StatusUpdate {
    status: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/my-buses", get(my_buses))
        .route("/my-trips", get(my_trips))
        .route("/trips", get(my_trips))
        .route("/trips/{trip_id}/status", put(update_status))
}

async fn my_buses(
    State(state): State<AppState>,
    Extension(operator): Extension<Principal>,
) -> Result<Json<Vec<Bus>>, AppError> {
    operator.authorize(Capability::ViewAssignedTrips)?;
    Ok(Json(state.fleet.operator_buses(&operator.subject).await?))
}

async fn my_trips(
    State(state): State<AppState>,
    Extension(operator): Extension<Principal>,
) -> Result<Json<Vec<Trip>>, AppError> {
    operator.authorize(Capability::ViewAssignedTrips)?;
    Ok(Json(state.fleet.operator_trips(&operator.subject).await?))
}

async fn update_status(
    State(state): State<AppState>,
    Extension(operator): Extension<Principal>,
    PathParam(trip_id): PathParam<String>,
    JsonBody(req): JsonBody<StatusUpdate>,
) -> Result<Json<Value>, AppError> {
    operator.authorize(Capability::UpdateTripStatus)?;
    let status = req
        .status
        .parse::<TripStatus>()
        .ok()
        .filter(TripStatus::is_final)
        .ok_or_else(|| AppError::ValidationError("Invalid status".to_string()))?;

    let trip = state
        .engine
        .update_trip_status(&operator, &trip_id, status)
        .await?;
    Ok(Json(json!({ "message": "Trip status updated successfully", "trip": trip })))
}
