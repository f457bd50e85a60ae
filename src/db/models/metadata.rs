use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::remote::MapBounds;

/// Singleton record describing the rectangle the last successful full sync
/// populated. Absent until the first full sync completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMetadata {
    pub width: i32,
    pub height: i32,
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub last_synced: DateTime<Utc>,
}

impl MapMetadata {
    pub const SINGLETON_ID: i32 = 0;

    pub fn from_bounds(bounds: &MapBounds, at: DateTime<Utc>) -> Self {
        Self {
            width: bounds.max_x - bounds.min_x + 1,
            height: bounds.max_y - bounds.min_y + 1,
            min_x: bounds.min_x,
            max_x: bounds.max_x,
            min_y: bounds.min_y,
            max_y: bounds.max_y,
            last_synced: at,
        }
    }
}

/// Coordinate bounds usable for input validation, derived from metadata when
/// present or from the cached cells otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinateRanges {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl CoordinateRanges {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}
