use std::{collections::HashMap, sync::Arc};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::{
    db::{Database, MapCell, MapMetadata},
    remote::{MapBounds, MapSource, RemoteCell},
};

/// Outcome counts of a successful full sync, mirroring what gets logged.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub total_cells: usize,
    pub fetched_cells: usize,
    pub filled_cells: usize,
    pub failed_columns: Vec<i32>,
    pub synced_at: DateTime<Utc>,
}

/// Orchestrates fetches from the remote source and write-through to the
/// local store.
///
/// The guarantee: after a successful [`fetch_and_cache_map`], the store holds
/// exactly one cell for every (x, y) in the remote-reported rectangle, with
/// zero-strength placeholders standing in for anything the remote failed to
/// report. Consumers never have to handle holes.
///
/// [`fetch_and_cache_map`]: SyncEngine::fetch_and_cache_map
#[derive(Clone)]
pub struct SyncEngine {
    db: Database,
    source: Arc<dyn MapSource>,
    // Serializes full syncs, column refreshes and cache clears so their
    // fetch/clear/write steps never interleave.
    sync_lock: Arc<Mutex<()>>,
}

fn normalize_cell(remote: RemoteCell, at: DateTime<Utc>) -> MapCell {
    MapCell {
        x: remote.x,
        y: remote.y,
        strength1: remote.strength1.unwrap_or(0),
        strength2: remote.strength2.unwrap_or(0),
        strength3: remote.strength3.unwrap_or(0),
        is_custom: false,
        last_updated: at,
    }
}

impl SyncEngine {
    pub fn new(db: Database, source: Arc<dyn MapSource>) -> Self {
        Self {
            db,
            source,
            sync_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Full sync: fetch bounds, fetch every column, reconcile into a dense
    /// rectangle and replace the cache atomically.
    ///
    /// A bounds fetch failure fails the whole call with nothing written.
    /// Individual column failures are logged and zero-filled, not surfaced.
    pub async fn fetch_and_cache_map(&self) -> Result<SyncReport> {
        self.fetch_and_cache_map_with_cancel(&CancellationToken::new())
            .await
    }

    /// Like [`fetch_and_cache_map`], but abortable. A cancelled sync writes
    /// nothing: the token is checked between column fetches and again before
    /// the single commit, so no partial rectangle is ever observable.
    ///
    /// [`fetch_and_cache_map`]: SyncEngine::fetch_and_cache_map
    pub async fn fetch_and_cache_map_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let _guard = self.sync_lock.lock().await;
        let started_at = Utc::now();

        info!("Starting full map sync");
        let bounds = self
            .source
            .bounds()
            .await
            .context("failed to fetch map bounds")?;
        info!(
            "Map bounds received: x=[{}..{}] y=[{}..{}]",
            bounds.min_x, bounds.max_x, bounds.min_y, bounds.max_y
        );

        let mut reported: HashMap<(i32, i32), MapCell> = HashMap::new();
        let mut failed_columns = Vec::new();

        for x in bounds.min_x..=bounds.max_x {
            if cancel.is_cancelled() {
                bail!("map sync cancelled");
            }

            match self.source.column(x).await {
                Ok(cells) => {
                    debug!("Column x={x} reported {} cells", cells.len());
                    for cell in cells {
                        reported.insert((cell.x, cell.y), normalize_cell(cell, started_at));
                    }
                }
                Err(err) => {
                    // One bad column does not abort the sync; its cells get
                    // zero-filled below.
                    warn!("Failed to fetch column x={x}: {err}");
                    failed_columns.push(x);
                }
            }
        }

        let (cells, filled_cells) = densify(&bounds, &mut reported, started_at);
        let total_cells = cells.len();
        let fetched_cells = total_cells - filled_cells;

        if cancel.is_cancelled() {
            bail!("map sync cancelled");
        }

        let metadata = MapMetadata::from_bounds(&bounds, started_at);
        self.db
            .replace_map(cells, metadata)
            .await
            .context("failed to write synced map")?;

        info!(
            "Map sync complete: {total_cells} cells ({fetched_cells} from remote, \
             {filled_cells} zero-filled, {} failed columns)",
            failed_columns.len()
        );

        Ok(SyncReport {
            total_cells,
            fetched_cells,
            filled_cells,
            failed_columns,
            synced_at: started_at,
        })
    }

    /// Refresh one column: fetch bounds for the y range, fetch the column,
    /// densify over [min_y, max_y] and replace the stored column.
    ///
    /// Unlike the full sync there is no fallback here, so either fetch
    /// failing fails the call; the stored column is left untouched.
    pub async fn refresh_column(&self, x: i32) -> Result<Vec<MapCell>> {
        let _guard = self.sync_lock.lock().await;
        let refreshed_at = Utc::now();

        info!("Refreshing column x={x}");
        let bounds = self
            .source
            .bounds()
            .await
            .context("failed to fetch map bounds")?;
        let reported = self
            .source
            .column(x)
            .await
            .with_context(|| format!("failed to fetch column x={x}"))?;
        let reported_count = reported.len();

        let by_y: HashMap<i32, RemoteCell> =
            reported.into_iter().map(|cell| (cell.y, cell)).collect();

        let mut cells = Vec::with_capacity(bounds.height().max(0) as usize);
        for y in bounds.min_y..=bounds.max_y {
            match by_y.get(&y) {
                // Pin the requested x: this call must only ever touch its
                // own column, whatever the remote put in the x field.
                Some(remote) => cells.push(MapCell {
                    x,
                    ..normalize_cell(remote.clone(), refreshed_at)
                }),
                None => cells.push(MapCell::placeholder(x, y, refreshed_at)),
            }
        }

        self.db
            .replace_column(x, cells.clone())
            .await
            .with_context(|| format!("failed to write column x={x}"))?;

        info!(
            "Column x={x} refreshed with {} cells ({reported_count} from remote)",
            cells.len()
        );
        Ok(cells)
    }

    /// Whether a full sync has ever completed. Says nothing about per-column
    /// freshness.
    pub async fn is_map_cached(&self) -> Result<bool> {
        Ok(self.db.metadata().await?.is_some())
    }

    /// Drop all cached cells and metadata, forcing a clean re-sync.
    pub async fn clear_cache(&self) -> Result<()> {
        let _guard = self.sync_lock.lock().await;
        info!("Clearing cached map data");
        self.db.clear_map().await
    }
}

/// Expand the reported cells into a dense rectangle over the bounds. Returns
/// the cells in (x asc, y asc) build order plus the number of zero-filled
/// placeholders. Reported cells outside the bounds are dropped.
fn densify(
    bounds: &MapBounds,
    reported: &mut HashMap<(i32, i32), MapCell>,
    at: DateTime<Utc>,
) -> (Vec<MapCell>, usize) {
    let capacity = (bounds.width().max(0) as usize) * (bounds.height().max(0) as usize);
    let mut cells = Vec::with_capacity(capacity);
    let mut filled = 0;

    for x in bounds.min_x..=bounds.max_x {
        for y in bounds.min_y..=bounds.max_y {
            match reported.remove(&(x, y)) {
                Some(cell) => cells.push(cell),
                None => {
                    cells.push(MapCell::placeholder(x, y, at));
                    filled += 1;
                }
            }
        }
    }

    (cells, filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(x: i32, y: i32, s1: Option<i32>, s2: Option<i32>, s3: Option<i32>) -> RemoteCell {
        RemoteCell {
            x,
            y,
            strength1: s1,
            strength2: s2,
            strength3: s3,
        }
    }

    #[test]
    fn normalize_turns_missing_strengths_into_zero() {
        let at = Utc::now();
        let cell = normalize_cell(remote(3, 4, Some(12), None, Some(-70)), at);

        assert_eq!(cell.strengths(), [12, 0, -70]);
        assert!(!cell.is_custom);
        assert_eq!(cell.last_updated, at);
    }

    #[test]
    fn densify_fills_every_gap_in_the_rectangle() {
        let bounds = MapBounds {
            min_x: 0,
            max_x: 2,
            min_y: 0,
            max_y: 1,
        };
        let at = Utc::now();
        let mut reported = HashMap::new();
        reported.insert((1, 0), normalize_cell(remote(1, 0, Some(5), None, None), at));

        let (cells, filled) = densify(&bounds, &mut reported, at);

        assert_eq!(cells.len(), 6);
        assert_eq!(filled, 5);
        let hit = cells.iter().find(|c| (c.x, c.y) == (1, 0)).unwrap();
        assert_eq!(hit.strength1, 5);
        for cell in cells.iter().filter(|c| (c.x, c.y) != (1, 0)) {
            assert_eq!(cell.strengths(), [0, 0, 0]);
        }
    }

    #[test]
    fn densify_drops_out_of_bounds_reports() {
        let bounds = MapBounds {
            min_x: 0,
            max_x: 0,
            min_y: 0,
            max_y: 0,
        };
        let at = Utc::now();
        let mut reported = HashMap::new();
        reported.insert((5, 5), normalize_cell(remote(5, 5, Some(9), None, None), at));

        let (cells, filled) = densify(&bounds, &mut reported, at);

        assert_eq!(cells.len(), 1);
        assert_eq!(filled, 1);
        assert_eq!((cells[0].x, cells[0].y), (0, 0));
    }
}
