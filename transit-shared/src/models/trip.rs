use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Trip lifecycle status. Only scheduled trips accept seat claims.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Scheduled => "scheduled",
            TripStatus::Cancelled => "cancelled",
            TripStatus::Completed => "completed",
        }
    }

    /// Cancelled and completed trips never change status again.
    pub fn is_final(&self) -> bool {
        !matches!(self, TripStatus::Scheduled)
    }
}

impl fmt::Display for TripStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown trip status: {0}")]
pub struct UnknownTripStatus(pub String);

impl FromStr for TripStatus {
    type Err = UnknownTripStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(TripStatus::Scheduled),
            "cancelled" => Ok(TripStatus::Cancelled),
            "completed" => Ok(TripStatus::Completed),
            other => Err(UnknownTripStatus(other.to_string())),
        }
    }
}

/// Why a seat claim was refused by the trip itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatRejection {
    OutOfRange,
    Withdrawn,
    Taken,
    NotScheduled(TripStatus),
}

/// A single scheduled run of a bus along a route, with its seat inventory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub trip_id: String,
    pub route_id: Uuid,
    pub bus_ntc_no: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub service_date: NaiveDate,
    pub total_seats: u32,
    pub available_seats: u32,
    pub booked_seats: BTreeSet<u32>,
    pub withdrawn_seats: BTreeSet<u32>,
    pub status: TripStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything an administrator supplies when scheduling a trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPlan {
    pub trip_id: String,
    pub route_id: Uuid,
    pub bus_ntc_no: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub service_date: NaiveDate,
    pub total_seats: u32,
    #[serde(default)]
    pub withdrawn_seats: BTreeSet<u32>,
}

/// Schedule fields an administrator may change after creation.
/// Occupancy and status are deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripSchedule {
    pub route_id: Option<Uuid>,
    pub bus_ntc_no: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub service_date: Option<NaiveDate>,
}

impl Trip {
    pub fn new(plan: TripPlan) -> Self {
        let now = Utc::now();
        Self {
            trip_id: plan.trip_id,
            route_id: plan.route_id,
            bus_ntc_no: plan.bus_ntc_no,
            start_time: plan.start_time,
            end_time: plan.end_time,
            service_date: plan.service_date,
            total_seats: plan.total_seats,
            available_seats: plan.total_seats,
            booked_seats: BTreeSet::new(),
            withdrawn_seats: plan.withdrawn_seats,
            status: TripStatus::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn seat_in_range(&self, seat_number: u32) -> bool {
        (1..=self.total_seats).contains(&seat_number)
    }

    /// Claim a seat: status, range, withdrawal and occupancy are all checked
    /// before anything is mutated.
    pub fn claim_seat(&mut self, seat_number: u32) -> Result<(), SeatRejection> {
        if self.status != TripStatus::Scheduled {
            return Err(SeatRejection::NotScheduled(self.status));
        }
        if !self.seat_in_range(seat_number) {
            return Err(SeatRejection::OutOfRange);
        }
        if self.withdrawn_seats.contains(&seat_number) {
            return Err(SeatRejection::Withdrawn);
        }
        if !self.booked_seats.insert(seat_number) {
            return Err(SeatRejection::Taken);
        }
        self.available_seats -= 1;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Returns false when the seat was not booked; nothing changes then.
    pub fn release_seat(&mut self, seat_number: u32) -> bool {
        if !self.booked_seats.remove(&seat_number) {
            return false;
        }
        self.available_seats += 1;
        self.updated_at = Utc::now();
        true
    }

    /// Move a scheduled trip into a final status. On refusal the current
    /// status is handed back.
    pub fn transition(&mut self, to: TripStatus) -> Result<(), TripStatus> {
        if self.status.is_final() || !to.is_final() {
            return Err(self.status);
        }
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn apply_schedule(&mut self, changes: &TripSchedule) {
        if let Some(route_id) = changes.route_id {
            self.route_id = route_id;
        }
        if let Some(bus) = &changes.bus_ntc_no {
            self.bus_ntc_no = bus.clone();
        }
        if let Some(start) = changes.start_time {
            self.start_time = start;
        }
        if let Some(end) = changes.end_time {
            self.end_time = end;
        }
        if let Some(date) = changes.service_date {
            self.service_date = date;
        }
        self.updated_at = Utc::now();
    }

    /// `available + |booked| == total`, with every booked seat in range.
    pub fn occupancy_balanced(&self) -> bool {
        self.available_seats as usize + self.booked_seats.len() == self.total_seats as usize
            && self.booked_seats.iter().all(|s| self.seat_in_range(*s))
    }
}
