use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;
use transit_api::{app, auth::issue_token, state::AuthConfig, AppState};
use transit_core::Role;
use transit_store::{BroadcastPush, InMemoryStore};

struct TestApp {
    router: Router,
    auth: AuthConfig,
}

impl TestApp {
    fn new() -> Self {
        let auth = AuthConfig {
            secret: "test-secret".to_string(),
            expiration: chrono::Duration::hours(1),
        };
        let (state, events) = AppState::build(
            Arc::new(InMemoryStore::new()),
            BroadcastPush::new(16),
            auth.clone(),
        );
        tokio::spawn(state.notifications.clone().run(events));
        Self {
            router: app(state),
            auth,
        }
    }

    fn token(&self, subject: &str, role: Role) -> String {
        issue_token(&self.auth, subject, role).unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn send_raw(&self, uri: &str, token: &str, body: &'static str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    /// Creates a route, a bus driven by `driver_id` and a trip. Returns the trip id.
    async fn seed_trip(&self, admin: &str, driver_id: &str, total_seats: u32) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/admin/routes",
                Some(admin),
                Some(json!({ "number": "01", "start": "Colombo", "end": "Kandy", "totalDistance": "115 km" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let route_id = body["route"]["id"].as_str().unwrap().to_string();

        let (status, _) = self
            .send(
                Method::POST,
                "/api/admin/buses",
                Some(admin),
                Some(json!({
                    "ntcNo": "NTC-1001",
                    "busNo": "NB-1234",
                    "driverId": driver_id,
                    "conductorId": "conductor-1",
                    "busType": "AC",
                    "busName": "Hill Express",
                    "routeId": route_id,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let start = Utc::now() + chrono::Duration::hours(4);
        let (status, body) = self
            .send(
                Method::POST,
                "/api/admin/trips",
                Some(admin),
                Some(json!({
                    "tripId": "TRIP-001",
                    "routeId": route_id,
                    "busNtcNo": "NTC-1001",
                    "startTime": start.to_rfc3339(),
                    "endTime": (start + chrono::Duration::hours(3)).to_rfc3339(),
                    "serviceDate": start.date_naive().to_string(),
                    "totalSeats": total_seats,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["trip"]["availableSeats"], json!(total_seats));
        "TRIP-001".to_string()
    }
}

#[tokio::test]
async fn test_welcome_and_guest_token() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["message"].as_str().unwrap().contains("Welcome"));

    let (status, body) = app.send(Method::POST, "/api/auth/guest", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(Method::GET, "/api/commuter/bookings", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_authentication_and_role_gating() {
    let app = TestApp::new();
    let book = json!({ "tripId": "TRIP-001", "seatNumber": 1 });

    let (status, _) = app
        .send(Method::POST, "/api/commuter/book", None, Some(book.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(Method::POST, "/api/commuter/book", Some("not-a-jwt"), Some(book.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let operator = app.token("operator-1", Role::Operator);
    let (status, body) = app
        .send(Method::POST, "/api/commuter/book", Some(&operator), Some(book))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("Commuter"));

    let rider = app.token("rider-1", Role::Commuter);
    let (status, _) = app
        .send(Method::GET, "/api/admin/buses", Some(&rider), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_booking_payment_and_cancellation_flow() {
    let app = TestApp::new();
    let admin = app.token("admin-1", Role::Admin);
    let trip_id = app.seed_trip(&admin, "operator-1", 5).await;
    let alice = app.token("alice", Role::Commuter);
    let bob = app.token("bob", Role::Commuter);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/commuter/book",
            Some(&alice),
            Some(json!({ "tripId": trip_id, "seatNumber": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["booking"]["paymentStatus"], "pending");
    let booking_id = body["booking"]["bookingId"].as_str().unwrap().to_string();

    let (status, body) = app
        .send(
            Method::POST,
            "/api/commuter/book",
            Some(&bob),
            Some(json!({ "tripId": trip_id, "seatNumber": 3 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Seat already booked");

    for seat in [0, 6] {
        let (status, body) = app
            .send(
                Method::POST,
                "/api/commuter/book",
                Some(&bob),
                Some(json!({ "tripId": trip_id, "seatNumber": seat })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid seat number");
    }

    let (status, _) = app
        .send(
            Method::POST,
            "/api/commuter/book",
            Some(&bob),
            Some(json!({ "tripId": "TRIP-404", "seatNumber": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/commuter/pay",
            Some(&bob),
            Some(json!({ "bookingId": booking_id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/commuter/pay",
            Some(&alice),
            Some(json!({ "bookingId": booking_id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["booking"]["paymentStatus"], "confirmed");

    let (status, _) = app
        .send(
            Method::POST,
            "/api/commuter/pay",
            Some(&alice),
            Some(json!({ "bookingId": booking_id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/commuter/cancel-booking",
            Some(&alice),
            Some(json!({ "bookingId": booking_id })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Bob books and cancels a pending seat; it becomes free again.
    let (_, body) = app
        .send(
            Method::POST,
            "/api/commuter/book",
            Some(&bob),
            Some(json!({ "tripId": trip_id, "seatNumber": 4 })),
        )
        .await;
    let bob_booking = body["booking"]["bookingId"].as_str().unwrap().to_string();
    let (status, _) = app
        .send(
            Method::POST,
            "/api/commuter/cancel-booking",
            Some(&bob),
            Some(json!({ "bookingId": bob_booking })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, trips) = app.send(Method::GET, "/api/admin/trips", Some(&admin), None).await;
    assert_eq!(trips[0]["availableSeats"], 4);
    assert_eq!(trips[0]["bookedSeats"], json!([3]));

    let (_, bookings) = app
        .send(Method::GET, "/api/commuter/bookings", Some(&bob), None)
        .await;
    assert_eq!(bookings, json!([]));
}

#[tokio::test]
async fn test_notifications_are_recorded_and_marked_read() {
    let app = TestApp::new();
    let admin = app.token("admin-1", Role::Admin);
    let trip_id = app.seed_trip(&admin, "operator-1", 5).await;
    let alice = app.token("alice", Role::Commuter);

    let (_, body) = app
        .send(
            Method::POST,
            "/api/commuter/book",
            Some(&alice),
            Some(json!({ "tripId": trip_id, "seatNumber": 1 })),
        )
        .await;
    let booking_id = body["booking"]["bookingId"].as_str().unwrap().to_string();
    app.send(
        Method::POST,
        "/api/commuter/pay",
        Some(&alice),
        Some(json!({ "bookingId": booking_id })),
    )
    .await;

    // The dispatcher runs on its own task.
    let mut notes = Value::Null;
    for _ in 0..50 {
        let (_, body) = app
            .send(Method::GET, "/api/commuter/notifications", Some(&alice), None)
            .await;
        if body.as_array().map(|a| a.len()) == Some(2) {
            notes = body;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let notes = notes.as_array().expect("two notifications");
    let categories: Vec<&str> = notes.iter().map(|n| n["category"].as_str().unwrap()).collect();
    assert!(categories.contains(&"booking"));
    assert!(categories.contains(&"payment"));
    assert!(notes.iter().all(|n| n["read"] == false));

    let (status, body) = app
        .send(Method::POST, "/api/commuter/notifications/mark-read", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["updated"], 2);

    let (_, body) = app
        .send(Method::GET, "/api/commuter/notifications", Some(&alice), None)
        .await;
    assert!(body.as_array().unwrap().iter().all(|n| n["read"] == true));
}

#[tokio::test]
async fn test_operator_trip_status_updates() {
    let app = TestApp::new();
    let admin = app.token("admin-1", Role::Admin);
    let trip_id = app.seed_trip(&admin, "operator-1", 5).await;
    let operator = app.token("operator-1", Role::Operator);
    let stranger = app.token("operator-2", Role::Operator);

    let (status, body) = app
        .send(Method::GET, "/api/operator/trips", Some(&operator), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["tripId"], trip_id);
    let (_, body) = app
        .send(Method::GET, "/api/operator/trips", Some(&stranger), None)
        .await;
    assert_eq!(body, json!([]));

    let (status, body) = app
        .send(Method::GET, "/api/operator/my-trips", Some(&operator), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["tripId"], trip_id);
    let (status, body) = app
        .send(Method::GET, "/api/operator/my-buses", Some(&operator), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["ntcNo"], "NTC-1001");
    let (_, body) = app
        .send(Method::GET, "/api/operator/my-buses", Some(&stranger), None)
        .await;
    assert_eq!(body, json!([]));

    let uri = format!("/api/operator/trips/{}/status", trip_id);
    let (status, body) = app
        .send(Method::PUT, &uri, Some(&operator), Some(json!({ "status": "boarding" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid status");

    let (status, _) = app
        .send(
            Method::PUT,
            "/api/operator/trips/TRIP-404/status",
            Some(&operator),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(Method::PUT, &uri, Some(&operator), Some(json!({ "status": "completed" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trip"]["status"], "completed");

    let (status, _) = app
        .send(Method::PUT, &uri, Some(&operator), Some(json!({ "status": "cancelled" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_fleet_conflicts_and_cancel() {
    let app = TestApp::new();
    let admin = app.token("admin-1", Role::Admin);
    let trip_id = app.seed_trip(&admin, "operator-1", 5).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/admin/routes",
            Some(&admin),
            Some(json!({ "number": "01", "start": "A", "end": "B", "totalDistance": "1 km" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Route number already exists");

    let (status, _) = app
        .send(Method::GET, "/api/admin/buses/NTC-404", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .send(Method::GET, "/api/admin/routes?end=Kandy", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/admin/operators",
            Some(&admin),
            Some(json!({ "email": "driver@example.com", "name": "Driver" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["operator"]["email"], "driver@example.com");
    let (status, _) = app
        .send(
            Method::POST,
            "/api/admin/operators",
            Some(&admin),
            Some(json!({ "email": "driver@example.com" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let uri = format!("/api/admin/trips/{}/cancel", trip_id);
    let (status, body) = app.send(Method::PUT, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["trip"]["status"], "cancelled");

    let rider = app.token("alice", Role::Commuter);
    let (status, _) = app
        .send(
            Method::POST,
            "/api/commuter/book",
            Some(&rider),
            Some(json!({ "tripId": trip_id, "seatNumber": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_bodies_use_error_contract() {
    let app = TestApp::new();
    let admin = app.token("admin-1", Role::Admin);
    let trip_id = app.seed_trip(&admin, "operator-1", 5).await;
    let rider = app.token("alice", Role::Commuter);

    for body in [
        json!({ "tripId": trip_id }),
        json!({ "tripId": trip_id, "seatNumber": "3" }),
        json!({ "tripId": trip_id, "seatNumber": 2.5 }),
    ] {
        let (status, body) = app
            .send(Method::POST, "/api/commuter/book", Some(&rider), Some(body))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["error"].as_str().unwrap();
        assert!(!message.contains("seatNumber"));
    }

    let (status, body) = app
        .send_raw("/api/commuter/book", &rider, "{\"tripId\": ")
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Request body is not valid JSON");

    let (status, body) = app
        .send(Method::PUT, "/api/admin/routes/not-a-uuid", Some(&admin), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid path parameter");

    // Nothing was booked by the rejected requests.
    let (_, body) = app
        .send(Method::GET, "/api/commuter/bookings", Some(&rider), None)
        .await;
    assert_eq!(body, json!([]));
}

#[test]
fn test_token_expiry_out_of_range_is_an_error() {
    let auth = AuthConfig {
        secret: "test-secret".to_string(),
        expiration: chrono::Duration::MAX,
    };
    assert!(issue_token(&auth, "alice", Role::Commuter).is_err());
}
