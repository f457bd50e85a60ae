//! Cached map cell model.
//!
//! One cell per (x, y) coordinate. Strengths are always concrete integers in
//! storage; a remote reading that omits a strength is normalized to 0 before
//! it gets here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapCell {
    pub x: i32,
    pub y: i32,
    pub strength1: i32,
    pub strength2: i32,
    pub strength3: i32,
    /// True when the cell was entered by the user rather than synced from the
    /// remote source.
    pub is_custom: bool,
    pub last_updated: DateTime<Utc>,
}

impl MapCell {
    /// Zero-strength filler for a coordinate the remote source never reported.
    pub fn placeholder(x: i32, y: i32, at: DateTime<Utc>) -> Self {
        Self {
            x,
            y,
            strength1: 0,
            strength2: 0,
            strength3: 0,
            is_custom: false,
            last_updated: at,
        }
    }

    pub fn strengths(&self) -> [i32; 3] {
        [self.strength1, self.strength2, self.strength3]
    }

    /// Whether any sensor observed an actual signal here. Placeholder cells
    /// report false and are excluded from nearest-match candidacy.
    pub fn has_signal(&self) -> bool {
        self.strengths().iter().any(|&s| s > 0)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    #[test]
    fn serializes_with_camel_case_keys_and_round_trips() {
        let cell = MapCell {
            x: 1,
            y: 2,
            strength1: -40,
            strength2: 0,
            strength3: 7,
            is_custom: true,
            last_updated: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        };

        let json = serde_json::to_value(&cell).unwrap();
        assert_eq!(json["isCustom"], true);
        assert_eq!(json["lastUpdated"], "2024-05-01T12:00:00Z");
        assert_eq!(json["strength1"], -40);

        let back: MapCell = serde_json::from_value(json).unwrap();
        assert_eq!(back, cell);
    }

    #[test]
    fn placeholder_has_no_signal() {
        let cell = MapCell::placeholder(3, 4, Utc::now());

        assert_eq!(cell.strengths(), [0, 0, 0]);
        assert!(!cell.is_custom);
        assert!(!cell.has_signal());
    }
}
