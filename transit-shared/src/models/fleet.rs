use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pii::Masked;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BusType {
    #[serde(rename = "AC")]
    Ac,
    #[serde(rename = "Semi")]
    Semi,
    #[serde(rename = "Non-AC")]
    NonAc,
}

/// A registered vehicle, keyed by its NTC registration number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bus {
    pub ntc_no: String,
    pub bus_no: String,
    pub driver_id: String,
    pub conductor_id: String,
    pub bus_type: BusType,
    pub bus_name: String,
    pub route_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: Uuid,
    pub number: String,
    pub start: String,
    pub end: String,
    pub total_distance: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An operator account. `id` is the subject the operator authenticates as.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Operator {
    pub id: Uuid,
    pub email: Masked<String>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
