use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Append-only audit record of a user-submitted reading at a coordinate.
/// Distinct from [`super::MapCell`]: submitting a measurement never mutates
/// the cached map by itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMeasurement {
    /// Row id, assigned by the store on insert.
    pub id: Option<i64>,
    pub x: i32,
    pub y: i32,
    pub sensor: String,
    pub strength: i32,
    pub recorded_at: DateTime<Utc>,
}
