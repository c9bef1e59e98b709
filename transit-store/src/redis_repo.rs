use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::info;
use transit_core::repository::{
    BookingStore, FleetStore, NotificationStore, SeatClaim, StatusChange, TripStore,
};
use transit_core::{StoreError, StoreResult};
use transit_shared::{
    Booking, Bus, Notification, Operator, PaymentStatus, Route, SeatRejection, Trip, TripSchedule,
    TripStatus,
};
use uuid::Uuid;

// Trips live in a hash (`doc`, `status`, `total`, `available`, `updated_at`)
// with the booked and withdrawn seats in two sets next to it. Each kind of key
// has its own prefix followed by the raw id, so an id containing `:` can never
// address another record's key. Every
// occupancy or status change is one Lua script, so Redis applies it atomically
// per trip without any client-side lock.

const INSERT_TRIP: &str = r#"
if redis.call("EXISTS", KEYS[1]) == 1 then
    return 0
end
redis.call("HSET", KEYS[1], "doc", ARGV[1], "status", ARGV[2], "total", ARGV[3], "available", ARGV[3], "updated_at", ARGV[4])
for i = 6, #ARGV do
    redis.call("SADD", KEYS[2], ARGV[i])
end
redis.call("SADD", KEYS[3], ARGV[5])
return 1
"#;

const READ_TRIP: &str = r#"
local h = redis.call("HMGET", KEYS[1], "doc", "status", "available", "updated_at")
if not h[1] then
    return {}
end
local booked = redis.call("SMEMBERS", KEYS[2])
local withdrawn = redis.call("SMEMBERS", KEYS[3])
return {h[1], h[2], h[3], h[4], table.concat(booked, ","), table.concat(withdrawn, ",")}
"#;

const RESERVE_SEAT: &str = r#"
local status = redis.call("HGET", KEYS[1], "status")
if not status then
    return "missing"
end
if status ~= "scheduled" then
    return "status:" .. status
end
local total = tonumber(redis.call("HGET", KEYS[1], "total"))
local seat = tonumber(ARGV[1])
if seat < 1 or seat > total then
    return "range"
end
if redis.call("SISMEMBER", KEYS[3], ARGV[1]) == 1 then
    return "withdrawn"
end
if redis.call("SADD", KEYS[2], ARGV[1]) == 0 then
    return "taken"
end
redis.call("HINCRBY", KEYS[1], "available", -1)
redis.call("HSET", KEYS[1], "updated_at", ARGV[2])
return "ok"
"#;

const RELEASE_SEAT: &str = r#"
if redis.call("EXISTS", KEYS[1]) == 0 then
    return -1
end
if redis.call("SREM", KEYS[2], ARGV[1]) == 1 then
    redis.call("HINCRBY", KEYS[1], "available", 1)
    redis.call("HSET", KEYS[1], "updated_at", ARGV[2])
    return 1
end
return 0
"#;

// Shared by trips and bookings: compare-and-set on the `status` field.
// KEYS[2]/KEYS[3] are optional status index sets the member moves between.
const TRANSITION_STATUS: &str = r#"
local status = redis.call("HGET", KEYS[1], "status")
if not status then
    return "missing"
end
if status ~= ARGV[1] then
    return status
end
redis.call("HSET", KEYS[1], "status", ARGV[2], "updated_at", ARGV[3])
if #KEYS == 3 then
    redis.call("SMOVE", KEYS[2], KEYS[3], ARGV[4])
end
return "applied"
"#;

const REPLACE_DOC_FIELD: &str = r#"
if redis.call("EXISTS", KEYS[1]) == 0 then
    return 0
end
redis.call("HSET", KEYS[1], "doc", ARGV[1], "updated_at", ARGV[2])
return 1
"#;

const INSERT_BOOKING: &str = r#"
if redis.call("EXISTS", KEYS[1]) == 1 then
    return 0
end
redis.call("HSET", KEYS[1], "doc", ARGV[1], "status", ARGV[2], "updated_at", ARGV[3])
for i = 2, #KEYS do
    redis.call("SADD", KEYS[i], ARGV[4])
end
return 1
"#;

const DELETE_INDEXED: &str = r#"
if redis.call("DEL", KEYS[1]) == 0 then
    return 0
end
for i = 2, #KEYS do
    redis.call("SREM", KEYS[i], ARGV[1])
end
return 1
"#;

// KEYS[1] doc, KEYS[2] index set, optional KEYS[3] unique-value claim.
const INSERT_DOC: &str = r#"
if #KEYS == 3 then
    if not redis.call("SET", KEYS[3], ARGV[2], "NX") then
        return 0
    end
end
if not redis.call("SET", KEYS[1], ARGV[1], "NX") then
    if #KEYS == 3 then
        redis.call("DEL", KEYS[3])
    end
    return 0
end
redis.call("SADD", KEYS[2], ARGV[2])
return 1
"#;

// KEYS[1] doc, KEYS[2] index set, optional KEYS[3] unique-value claim to drop.
const DELETE_DOC: &str = r#"
if redis.call("DEL", KEYS[1]) == 0 then
    return 0
end
redis.call("SREM", KEYS[2], ARGV[1])
if #KEYS == 3 then
    redis.call("DEL", KEYS[3])
end
return 1
"#;

struct Scripts {
    insert_trip: Script,
    read_trip: Script,
    reserve_seat: Script,
    release_seat: Script,
    transition_status: Script,
    replace_doc_field: Script,
    insert_booking: Script,
    delete_indexed: Script,
    insert_doc: Script,
    delete_doc: Script,
}

impl Scripts {
    fn load() -> Self {
        Self {
            insert_trip: Script::new(INSERT_TRIP),
            read_trip: Script::new(READ_TRIP),
            reserve_seat: Script::new(RESERVE_SEAT),
            release_seat: Script::new(RELEASE_SEAT),
            transition_status: Script::new(TRANSITION_STATUS),
            replace_doc_field: Script::new(REPLACE_DOC_FIELD),
            insert_booking: Script::new(INSERT_BOOKING),
            delete_indexed: Script::new(DELETE_INDEXED),
            insert_doc: Script::new(INSERT_DOC),
            delete_doc: Script::new(DELETE_DOC),
        }
    }
}

/// Redis-backed document store.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    scripts: std::sync::Arc<Scripts>,
}

fn backend(err: redis::RedisError) -> StoreError {
    StoreError::Backend(err.to_string())
}

fn corrupt(key: &str, reason: impl ToString) -> StoreError {
    StoreError::Corrupt {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn to_json<T: Serialize>(key: &str, value: &T) -> StoreResult<String> {
    serde_json::to_string(value).map_err(|e| corrupt(key, e))
}

fn from_json<T: DeserializeOwned>(key: &str, raw: &str) -> StoreResult<T> {
    serde_json::from_str(raw).map_err(|e| corrupt(key, e))
}

fn parse_time(key: &str, raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| corrupt(key, e))
}

fn parse_seats(key: &str, raw: &str) -> StoreResult<BTreeSet<u32>> {
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u32>().map_err(|e| corrupt(key, e)))
        .collect()
}

fn parse_payment_status(key: &str, raw: &str) -> StoreResult<PaymentStatus> {
    match raw {
        "pending" => Ok(PaymentStatus::Pending),
        "confirmed" => Ok(PaymentStatus::Confirmed),
        "cancelled" => Ok(PaymentStatus::Cancelled),
        other => Err(corrupt(key, format!("unknown payment status {}", other))),
    }
}

fn trip_key(trip_id: &str) -> String {
    format!("trip:{}", trip_id)
}

fn booked_key(trip_id: &str) -> String {
    format!("trip-booked:{}", trip_id)
}

fn withdrawn_key(trip_id: &str) -> String {
    format!("trip-withdrawn:{}", trip_id)
}

fn booking_key(booking_id: &str) -> String {
    format!("booking:{}", booking_id)
}

fn rider_bookings_key(rider_id: &str) -> String {
    format!("rider-bookings:{}", rider_id)
}

fn trip_bookings_key(trip_id: &str) -> String {
    format!("trip-bookings:{}", trip_id)
}

fn status_index_key(status: PaymentStatus) -> String {
    format!("booking-status:{}", status)
}

fn notifications_key(recipient_id: &str) -> String {
    format!("rider-notifications:{}", recipient_id)
}

fn notification_key(id: &str) -> String {
    format!("notification:{}", id)
}

const TRIPS_INDEX: &str = "trips";
const BUSES_INDEX: &str = "buses";
const ROUTES_INDEX: &str = "routes";
const OPERATORS_INDEX: &str = "operators";

impl RedisStore {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!("Connected to Redis store");
        Ok(Self {
            conn,
            scripts: std::sync::Arc::new(Scripts::load()),
        })
    }

    async fn read_trip(&self, trip_id: &str) -> StoreResult<Option<Trip>> {
        let mut conn = self.conn.clone();
        let key = trip_key(trip_id);
        let parts: Vec<String> = self
            .scripts
            .read_trip
            .key(&key)
            .key(booked_key(trip_id))
            .key(withdrawn_key(trip_id))
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;

        let [doc, status, available, updated_at, booked, withdrawn] = match <[String; 6]>::try_from(parts) {
            Ok(fields) => fields,
            Err(parts) if parts.is_empty() => return Ok(None),
            Err(parts) => return Err(corrupt(&key, format!("expected 6 fields, got {}", parts.len()))),
        };

        let mut trip: Trip = from_json(&key, &doc)?;
        trip.status = status.parse::<TripStatus>().map_err(|e| corrupt(&key, e))?;
        trip.available_seats = available.parse().map_err(|e| corrupt(&key, e))?;
        trip.updated_at = parse_time(&key, &updated_at)?;
        trip.booked_seats = parse_seats(&key, &booked)?;
        trip.withdrawn_seats = parse_seats(&key, &withdrawn)?;
        Ok(Some(trip))
    }

    async fn read_booking(&self, booking_id: &str) -> StoreResult<Option<Booking>> {
        let mut conn = self.conn.clone();
        let key = booking_key(booking_id);
        let fields: Vec<Option<String>> = redis::cmd("HMGET")
            .arg(&key)
            .arg("doc")
            .arg("status")
            .arg("updated_at")
            .query_async(&mut conn)
            .await
            .map_err(backend)?;

        let (Some(doc), Some(status), Some(updated_at)) = (
            fields.first().cloned().flatten(),
            fields.get(1).cloned().flatten(),
            fields.get(2).cloned().flatten(),
        ) else {
            return Ok(None);
        };

        let mut booking: Booking = from_json(&key, &doc)?;
        booking.payment_status = parse_payment_status(&key, &status)?;
        booking.updated_at = parse_time(&key, &updated_at)?;
        Ok(Some(booking))
    }

    async fn read_bookings(&self, index_key: &str) -> StoreResult<Vec<Booking>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(index_key).await.map_err(backend)?;
        let mut bookings = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(booking) = self.read_booking(&id).await? {
                bookings.push(booking);
            }
        }
        Ok(bookings)
    }

    async fn insert_doc<T: Serialize + Sync>(
        &self,
        key: &str,
        index: &str,
        id: &str,
        unique_claim: Option<String>,
        value: &T,
    ) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let json = to_json(key, value)?;
        let mut invocation = self.scripts.insert_doc.key(key);
        invocation.key(index);
        if let Some(claim) = unique_claim {
            invocation.key(claim);
        }
        let inserted: i64 = invocation
            .arg(json)
            .arg(id)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(inserted == 1)
    }

    async fn get_doc<T: DeserializeOwned>(&self, key: &str) -> StoreResult<Option<T>> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(key).await.map_err(backend)?;
        raw.map(|r| from_json(key, &r)).transpose()
    }

    async fn list_docs<T: DeserializeOwned>(&self, index: &str, prefix: &str) -> StoreResult<Vec<T>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(index).await.map_err(backend)?;
        let mut docs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(doc) = self.get_doc(&format!("{}:{}", prefix, id)).await? {
                docs.push(doc);
            }
        }
        Ok(docs)
    }

    async fn replace_doc<T: Serialize + Sync>(&self, key: &str, value: &T) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let json = to_json(key, value)?;
        // SET .. XX only writes when the document already exists.
        let written: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(json)
            .arg("XX")
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(written.is_some())
    }

    async fn delete_doc(
        &self,
        key: &str,
        index: &str,
        id: &str,
        unique_claim: Option<String>,
    ) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let mut invocation = self.scripts.delete_doc.key(key);
        invocation.key(index);
        if let Some(claim) = unique_claim {
            invocation.key(claim);
        }
        let deleted: i64 = invocation
            .arg(id)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(deleted == 1)
    }
}

#[async_trait]
impl TripStore for RedisStore {
    async fn insert_trip(&self, trip: &Trip) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let key = trip_key(&trip.trip_id);
        let withdrawn: Vec<u32> = trip.withdrawn_seats.iter().copied().collect();
        let inserted: i64 = self
            .scripts
            .insert_trip
            .key(&key)
            .key(withdrawn_key(&trip.trip_id))
            .key(TRIPS_INDEX)
            .arg(to_json(&key, trip)?)
            .arg(trip.status.as_str())
            .arg(trip.total_seats)
            .arg(trip.updated_at.to_rfc3339())
            .arg(&trip.trip_id)
            .arg(withdrawn)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(inserted == 1)
    }

    async fn get_trip(&self, trip_id: &str) -> StoreResult<Option<Trip>> {
        self.read_trip(trip_id).await
    }

    async fn list_trips(&self) -> StoreResult<Vec<Trip>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn.smembers(TRIPS_INDEX).await.map_err(backend)?;
        let mut trips = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(trip) = self.read_trip(&id).await? {
                trips.push(trip);
            }
        }
        trips.sort_by(|a, b| a.start_time.cmp(&b.start_time));
        Ok(trips)
    }

    async fn reserve_seat(&self, trip_id: &str, seat_number: u32) -> StoreResult<SeatClaim> {
        let mut conn = self.conn.clone();
        let key = trip_key(trip_id);
        let outcome: String = self
            .scripts
            .reserve_seat
            .key(&key)
            .key(booked_key(trip_id))
            .key(withdrawn_key(trip_id))
            .arg(seat_number)
            .arg(Utc::now().to_rfc3339())
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;

        let rejection = match outcome.as_str() {
            "ok" => {
                return match self.read_trip(trip_id).await? {
                    Some(trip) => Ok(SeatClaim::Reserved(trip)),
                    None => Err(corrupt(&key, "trip vanished after reservation")),
                };
            }
            "missing" => return Ok(SeatClaim::TripNotFound),
            "range" => SeatRejection::OutOfRange,
            "withdrawn" => SeatRejection::Withdrawn,
            "taken" => SeatRejection::Taken,
            other => match other.strip_prefix("status:") {
                Some(status) => SeatRejection::NotScheduled(
                    status.parse().map_err(|e| corrupt(&key, e))?,
                ),
                None => return Err(corrupt(&key, format!("unexpected reserve outcome {}", other))),
            },
        };
        Ok(SeatClaim::Rejected(rejection))
    }

    async fn release_seat(&self, trip_id: &str, seat_number: u32) -> StoreResult<Option<Trip>> {
        let mut conn = self.conn.clone();
        let released: i64 = self
            .scripts
            .release_seat
            .key(trip_key(trip_id))
            .key(booked_key(trip_id))
            .arg(seat_number)
            .arg(Utc::now().to_rfc3339())
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        if released < 0 {
            return Ok(None);
        }
        self.read_trip(trip_id).await
    }

    async fn transition_trip(
        &self,
        trip_id: &str,
        to: TripStatus,
    ) -> StoreResult<StatusChange<Trip, TripStatus>> {
        if !to.is_final() {
            return Ok(match self.read_trip(trip_id).await? {
                Some(trip) => StatusChange::Refused(trip.status),
                None => StatusChange::NotFound,
            });
        }
        let mut conn = self.conn.clone();
        let key = trip_key(trip_id);
        let outcome: String = self
            .scripts
            .transition_status
            .key(&key)
            .arg(TripStatus::Scheduled.as_str())
            .arg(to.as_str())
            .arg(Utc::now().to_rfc3339())
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;

        match outcome.as_str() {
            "applied" => match self.read_trip(trip_id).await? {
                Some(trip) => Ok(StatusChange::Applied(trip)),
                None => Ok(StatusChange::NotFound),
            },
            "missing" => Ok(StatusChange::NotFound),
            current => Ok(StatusChange::Refused(
                current.parse().map_err(|e| corrupt(&key, e))?,
            )),
        }
    }

    async fn reschedule_trip(
        &self,
        trip_id: &str,
        changes: &TripSchedule,
    ) -> StoreResult<Option<Trip>> {
        let Some(mut trip) = self.read_trip(trip_id).await? else {
            return Ok(None);
        };
        trip.apply_schedule(changes);
        let mut conn = self.conn.clone();
        let key = trip_key(trip_id);
        let replaced: i64 = self
            .scripts
            .replace_doc_field
            .key(&key)
            .arg(to_json(&key, &trip)?)
            .arg(trip.updated_at.to_rfc3339())
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        if replaced == 0 {
            return Ok(None);
        }
        self.read_trip(trip_id).await
    }
}

#[async_trait]
impl BookingStore for RedisStore {
    async fn insert_booking(&self, booking: &Booking) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let key = booking_key(&booking.booking_id);
        let inserted: i64 = self
            .scripts
            .insert_booking
            .key(&key)
            .key(rider_bookings_key(&booking.rider_id))
            .key(trip_bookings_key(&booking.trip_id))
            .key(status_index_key(booking.payment_status))
            .arg(to_json(&key, booking)?)
            .arg(booking.payment_status.as_str())
            .arg(booking.updated_at.to_rfc3339())
            .arg(&booking.booking_id)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(inserted == 1)
    }

    async fn get_booking(&self, booking_id: &str) -> StoreResult<Option<Booking>> {
        self.read_booking(booking_id).await
    }

    async fn bookings_for_rider(&self, rider_id: &str) -> StoreResult<Vec<Booking>> {
        self.read_bookings(&rider_bookings_key(rider_id)).await
    }

    async fn bookings_for_trip(&self, trip_id: &str) -> StoreResult<Vec<Booking>> {
        self.read_bookings(&trip_bookings_key(trip_id)).await
    }

    async fn bookings_with_status(&self, status: PaymentStatus) -> StoreResult<Vec<Booking>> {
        self.read_bookings(&status_index_key(status)).await
    }

    async fn transition_booking(
        &self,
        booking_id: &str,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> StoreResult<StatusChange<Booking, PaymentStatus>> {
        let mut conn = self.conn.clone();
        let key = booking_key(booking_id);
        let outcome: String = self
            .scripts
            .transition_status
            .key(&key)
            .key(status_index_key(from))
            .key(status_index_key(to))
            .arg(from.as_str())
            .arg(to.as_str())
            .arg(Utc::now().to_rfc3339())
            .arg(booking_id)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;

        match outcome.as_str() {
            "applied" => match self.read_booking(booking_id).await? {
                Some(booking) => Ok(StatusChange::Applied(booking)),
                None => Ok(StatusChange::NotFound),
            },
            "missing" => Ok(StatusChange::NotFound),
            current => Ok(StatusChange::Refused(parse_payment_status(&key, current)?)),
        }
    }

    async fn delete_booking(&self, booking_id: &str) -> StoreResult<bool> {
        let Some(booking) = self.read_booking(booking_id).await? else {
            return Ok(false);
        };
        let mut conn = self.conn.clone();
        let deleted: i64 = self
            .scripts
            .delete_indexed
            .key(booking_key(booking_id))
            .key(rider_bookings_key(&booking.rider_id))
            .key(trip_bookings_key(&booking.trip_id))
            .key(status_index_key(PaymentStatus::Pending))
            .key(status_index_key(PaymentStatus::Confirmed))
            .key(status_index_key(PaymentStatus::Cancelled))
            .arg(booking_id)
            .invoke_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(deleted == 1)
    }
}

#[async_trait]
impl NotificationStore for RedisStore {
    async fn insert_notification(&self, notification: &Notification) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let id = notification.id.to_string();
        let key = notification_key(&id);
        let _: () = redis::pipe()
            .atomic()
            .set(&key, to_json(&key, notification)?)
            .ignore()
            .lpush(notifications_key(&notification.recipient_id), &id)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        Ok(())
    }

    async fn notifications_for(&self, recipient_id: &str) -> StoreResult<Vec<Notification>> {
        let mut conn = self.conn.clone();
        let ids: Vec<String> = conn
            .lrange(notifications_key(recipient_id), 0, -1)
            .await
            .map_err(backend)?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = ids.iter().map(|id| notification_key(id)).collect();
        let raw: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(backend)?;
        keys.iter()
            .zip(raw)
            .filter_map(|(key, doc)| doc.map(|d| from_json(key, &d)))
            .collect()
    }

    async fn mark_all_read(&self, recipient_id: &str) -> StoreResult<usize> {
        let unread: Vec<Notification> = self
            .notifications_for(recipient_id)
            .await?
            .into_iter()
            .filter(|n| !n.read)
            .collect();
        if unread.is_empty() {
            return Ok(0);
        }
        let mut pipe = redis::pipe();
        pipe.atomic();
        for mut notification in unread.iter().cloned() {
            notification.read = true;
            let key = notification_key(&notification.id.to_string());
            pipe.set(&key, to_json(&key, &notification)?).ignore();
        }
        let mut conn = self.conn.clone();
        let _: () = pipe.query_async(&mut conn).await.map_err(backend)?;
        Ok(unread.len())
    }
}

#[async_trait]
impl FleetStore for RedisStore {
    async fn insert_bus(&self, bus: &Bus) -> StoreResult<bool> {
        let key = format!("bus:{}", bus.ntc_no);
        self.insert_doc(&key, BUSES_INDEX, &bus.ntc_no, None, bus).await
    }

    async fn get_bus(&self, ntc_no: &str) -> StoreResult<Option<Bus>> {
        self.get_doc(&format!("bus:{}", ntc_no)).await
    }

    async fn list_buses(&self) -> StoreResult<Vec<Bus>> {
        let mut buses: Vec<Bus> = self.list_docs(BUSES_INDEX, "bus").await?;
        buses.sort_by(|a, b| a.ntc_no.cmp(&b.ntc_no));
        Ok(buses)
    }

    async fn update_bus(&self, bus: &Bus) -> StoreResult<bool> {
        self.replace_doc(&format!("bus:{}", bus.ntc_no), bus).await
    }

    async fn delete_bus(&self, ntc_no: &str) -> StoreResult<bool> {
        self.delete_doc(&format!("bus:{}", ntc_no), BUSES_INDEX, ntc_no, None)
            .await
    }

    async fn insert_route(&self, route: &Route) -> StoreResult<bool> {
        let id = route.id.to_string();
        let claim = format!("route-number:{}", route.number);
        self.insert_doc(&format!("route:{}", id), ROUTES_INDEX, &id, Some(claim), route)
            .await
    }

    async fn get_route(&self, id: Uuid) -> StoreResult<Option<Route>> {
        self.get_doc(&format!("route:{}", id)).await
    }

    async fn list_routes(&self) -> StoreResult<Vec<Route>> {
        let mut routes: Vec<Route> = self.list_docs(ROUTES_INDEX, "route").await?;
        routes.sort_by(|a, b| a.number.cmp(&b.number));
        Ok(routes)
    }

    async fn update_route(&self, route: &Route) -> StoreResult<bool> {
        self.replace_doc(&format!("route:{}", route.id), route).await
    }

    async fn delete_route(&self, id: Uuid) -> StoreResult<bool> {
        let Some(route) = self.get_route(id).await? else {
            return Ok(false);
        };
        let id = id.to_string();
        let claim = format!("route-number:{}", route.number);
        self.delete_doc(&format!("route:{}", id), ROUTES_INDEX, &id, Some(claim))
            .await
    }

    async fn insert_operator(&self, operator: &Operator) -> StoreResult<bool> {
        let id = operator.id.to_string();
        let claim = format!("operator-email:{}", operator.email.expose().to_lowercase());
        self.insert_doc(&format!("operator:{}", id), OPERATORS_INDEX, &id, Some(claim), operator)
            .await
    }

    async fn get_operator(&self, id: Uuid) -> StoreResult<Option<Operator>> {
        self.get_doc(&format!("operator:{}", id)).await
    }

    async fn update_operator(&self, operator: &Operator) -> StoreResult<bool> {
        self.replace_doc(&format!("operator:{}", operator.id), operator)
            .await
    }

    async fn delete_operator(&self, id: Uuid) -> StoreResult<bool> {
        let Some(operator) = self.get_operator(id).await? else {
            return Ok(false);
        };
        let id = id.to_string();
        let claim = format!("operator-email:{}", operator.email.expose().to_lowercase());
        self.delete_doc(&format!("operator:{}", id), OPERATORS_INDEX, &id, Some(claim))
            .await
    }
}
