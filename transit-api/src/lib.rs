use axum::{
    http::Method,
    middleware::from_fn_with_state,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod notifications;
pub mod operator;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    let authenticated = from_fn_with_state(state.clone(), middleware::require_auth);

    let commuter = bookings::routes()
        .merge(notifications::routes())
        .route_layer(authenticated.clone());
    let operator = operator::routes().route_layer(authenticated.clone());
    let admin = admin::routes().route_layer(authenticated);

    Router::new()
        .route("/", get(welcome))
        .nest("/api/auth", auth::routes())
        .nest("/api/commuter", commuter)
        .nest("/api/operator", operator)
        .nest("/api/admin", admin)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn welcome() -> Json<Value> {
    Json(json!({ "message": "Welcome to the NTC Seat Reservation API" }))
}
