//! Nearest-match resolver: find the cached cell whose readings are closest
//! to a user-submitted vector.

use serde::{Deserialize, Serialize};

use crate::db::MapCell;

/// A user-submitted 3-sensor reading vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub strength1: i32,
    pub strength2: i32,
    pub strength3: i32,
}

impl Reading {
    pub fn new(strength1: i32, strength2: i32, strength3: i32) -> Self {
        Self {
            strength1,
            strength2,
            strength3,
        }
    }

    fn components(&self) -> [i32; 3] {
        [self.strength1, self.strength2, self.strength3]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearestMatch {
    pub cell: MapCell,
    pub distance: f64,
}

fn euclidean_distance(reading: Reading, cell: &MapCell) -> f64 {
    let sum: i64 = reading
        .components()
        .iter()
        .zip(cell.strengths().iter())
        .map(|(&r, &s)| {
            let diff = i64::from(r) - i64::from(s);
            diff * diff
        })
        .sum();
    (sum as f64).sqrt()
}

/// Scan `cells` for the minimum-Euclidean-distance match to `reading`.
///
/// Cells without any positive strength are excluded up front: all-zero cells
/// are placeholders meaning "no signal observed", not a literal zero signal.
/// Ties keep the first candidate in iteration order, so results are
/// deterministic for the store's fixed (x asc, y desc) ordering. Returns
/// `None` when no cell qualifies; callers treat that as a normal outcome.
pub fn find_nearest(cells: &[MapCell], reading: Reading) -> Option<NearestMatch> {
    let mut best: Option<NearestMatch> = None;

    for cell in cells.iter().filter(|cell| cell.has_signal()) {
        let distance = euclidean_distance(reading, cell);
        match &best {
            Some(current) if distance >= current.distance => {}
            _ => {
                best = Some(NearestMatch {
                    cell: cell.clone(),
                    distance,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn cell(x: i32, y: i32, strengths: [i32; 3]) -> MapCell {
        MapCell {
            x,
            y,
            strength1: strengths[0],
            strength2: strengths[1],
            strength3: strengths[2],
            is_custom: false,
            last_updated: Utc::now(),
        }
    }

    #[test]
    fn exact_match_wins_with_zero_distance() {
        let cells = vec![cell(0, 0, [10, 0, 30]), cell(0, 1, [16, 0, 30])];

        let result = find_nearest(&cells, Reading::new(16, 0, 30)).unwrap();

        assert_eq!((result.cell.x, result.cell.y), (0, 1));
        assert_eq!(result.distance, 0.0);
    }

    #[test]
    fn placeholder_cells_are_never_candidates() {
        let cells = vec![cell(2, 2, [0, 0, 0]), cell(5, 5, [100, 100, 100])];

        // The all-zero cell is numerically closest to an all-zero query but
        // must be filtered out before any distance is computed.
        let result = find_nearest(&cells, Reading::new(0, 0, 0)).unwrap();

        assert_eq!((result.cell.x, result.cell.y), (5, 5));
    }

    #[test]
    fn no_candidates_yields_none() {
        let cells = vec![cell(0, 0, [0, 0, 0]), cell(0, 1, [0, -3, 0])];

        assert!(find_nearest(&cells, Reading::new(10, 10, 10)).is_none());
    }

    #[test]
    fn tie_keeps_first_in_iteration_order() {
        let cells = vec![cell(0, 0, [10, 0, 0]), cell(0, 1, [0, 10, 0])];

        // Both are distance 10 from the origin query direction chosen here.
        let result = find_nearest(&cells, Reading::new(5, 5, 0)).unwrap();

        assert_eq!((result.cell.x, result.cell.y), (0, 0));
    }

    #[test]
    fn negative_strengths_do_not_qualify_but_still_measure() {
        let cells = vec![cell(1, 1, [-60, 0, 5])];

        // One positive component makes the cell a candidate; the negative
        // component participates in the distance as-is.
        let result = find_nearest(&cells, Reading::new(-60, 0, 5)).unwrap();

        assert_eq!(result.distance, 0.0);
    }
}
