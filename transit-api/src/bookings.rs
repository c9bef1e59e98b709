use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use transit_core::Principal;

use crate::error::AppError;
use crate::extract::JsonBody;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookSeatRequest {
    trip_id: String,
    seat_number: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookingRef {
    booking_id: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/book", post(book_seat))
        .route("/bookings", get(my_bookings))
        .route("/pay", post(pay))
        .route("/cancel-booking", post(cancel_booking))
}

async fn book_seat(
    State(state): State<AppState>,
    Extension(rider): Extension<Principal>,
    JsonBody(req): JsonBody<BookSeatRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let booking = state
        .engine
        .book_seat(&rider, &req.trip_id, req.seat_number)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Seat booked successfully", "booking": booking })),
    ))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(rider): Extension<Principal>,
) -> Result<Json<Value>, AppError> {
    let bookings = state.engine.bookings_for(&rider).await?;
    Ok(Json(json!(bookings)))
}

async fn pay(
    State(state): State<AppState>,
    Extension(rider): Extension<Principal>,
    JsonBody(req): JsonBody<BookingRef>,
) -> Result<Json<Value>, AppError> {
    let booking = state.engine.confirm_payment(&rider, &req.booking_id).await?;
    Ok(Json(json!({ "message": "Payment confirmed", "booking": booking })))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(rider): Extension<Principal>,
    JsonBody(req): JsonBody<BookingRef>,
) -> Result<Json<Value>, AppError> {
    state.engine.cancel_booking(&rider, &req.booking_id).await?;
    Ok(Json(json!({ "message": "Booking cancelled successfully" })))
}
