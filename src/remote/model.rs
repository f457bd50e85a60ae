use serde::{Deserialize, Serialize};

/// Inclusive rectangle reported by the remote map source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl MapBounds {
    pub fn width(&self) -> i32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y + 1
    }
}

/// One cell as reported by the remote source. Strengths are nullable on the
/// wire; the sync engine normalizes missing values to 0 before storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCell {
    pub x: i32,
    pub y: i32,
    pub strength1: Option<i32>,
    pub strength2: Option<i32>,
    pub strength3: Option<i32>,
}
