//! Public facade over the store and sync engine.
//!
//! UI-facing collaborators only ever talk to [`MapCache`]: reads and
//! subscriptions come straight from the local store, never the network, and
//! sync entry points delegate to the engine. The `Database` handle is
//! constructed once at process start and injected here; there is no hidden
//! global instance.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use chrono::Utc;
use log::debug;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{
    db::{
        connection::ChangeKind, CoordinateRanges, Database, MapCell, MapMetadata, UserMeasurement,
    },
    locate::{find_nearest, NearestMatch, Reading},
    remote::MapSource,
    sync::{SyncEngine, SyncReport},
};

/// Result of checking a user-entered coordinate against the cached bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateValidation {
    Valid,
    /// No metadata and no cells to derive a range from; sync first.
    MapNotLoaded,
    /// The coordinate falls outside the known rectangle.
    OutOfRange(CoordinateRanges),
}

/// Live view over the cached cells (all of them, or one column).
///
/// The first `next()` yields the current snapshot; every later `next()`
/// completes after a store mutation and yields a fresh snapshot. Updates are
/// coalesced, never missed.
pub struct CellsSubscription {
    db: Database,
    rx: watch::Receiver<u64>,
    column: Option<i32>,
    primed: bool,
}

impl CellsSubscription {
    pub async fn next(&mut self) -> Result<Vec<MapCell>> {
        if self.primed {
            self.rx
                .changed()
                .await
                .map_err(|_| anyhow!("cell store closed"))?;
        }
        self.primed = true;

        match self.column {
            Some(x) => self.db.column_cells(x).await,
            None => self.db.all_cells().await,
        }
    }
}

/// Live view over the singleton metadata record.
pub struct MetadataSubscription {
    db: Database,
    rx: watch::Receiver<u64>,
    primed: bool,
}

impl MetadataSubscription {
    pub async fn next(&mut self) -> Result<Option<MapMetadata>> {
        if self.primed {
            self.rx
                .changed()
                .await
                .map_err(|_| anyhow!("metadata store closed"))?;
        }
        self.primed = true;

        self.db.metadata().await
    }
}

/// Live view over the measurement audit log, newest first.
pub struct MeasurementsSubscription {
    db: Database,
    rx: watch::Receiver<u64>,
    cell: Option<(i32, i32)>,
    primed: bool,
}

impl MeasurementsSubscription {
    pub async fn next(&mut self) -> Result<Vec<UserMeasurement>> {
        if self.primed {
            self.rx
                .changed()
                .await
                .map_err(|_| anyhow!("measurement store closed"))?;
        }
        self.primed = true;

        match self.cell {
            Some((x, y)) => self.db.measurements_for_cell(x, y).await,
            None => self.db.measurements().await,
        }
    }
}

#[derive(Clone)]
pub struct MapCache {
    db: Database,
    engine: SyncEngine,
}

impl MapCache {
    pub fn new(db: Database, source: Arc<dyn MapSource>) -> Self {
        let engine = SyncEngine::new(db.clone(), source);
        Self { db, engine }
    }

    // ---- live views -----------------------------------------------------

    /// All cached cells, (x asc, y desc), re-emitted after every mutation.
    pub fn observe_all_cells(&self) -> CellsSubscription {
        CellsSubscription {
            db: self.db.clone(),
            rx: self.db.subscribe(ChangeKind::Cells),
            column: None,
            primed: false,
        }
    }

    /// One column's cells, y descending.
    pub fn observe_column(&self, x: i32) -> CellsSubscription {
        CellsSubscription {
            db: self.db.clone(),
            rx: self.db.subscribe(ChangeKind::Cells),
            column: Some(x),
            primed: false,
        }
    }

    pub fn observe_metadata(&self) -> MetadataSubscription {
        MetadataSubscription {
            db: self.db.clone(),
            rx: self.db.subscribe(ChangeKind::Metadata),
            primed: false,
        }
    }

    pub fn observe_measurements(&self) -> MeasurementsSubscription {
        MeasurementsSubscription {
            db: self.db.clone(),
            rx: self.db.subscribe(ChangeKind::Measurements),
            cell: None,
            primed: false,
        }
    }

    pub fn observe_measurements_for_cell(&self, x: i32, y: i32) -> MeasurementsSubscription {
        MeasurementsSubscription {
            db: self.db.clone(),
            rx: self.db.subscribe(ChangeKind::Measurements),
            cell: Some((x, y)),
            primed: false,
        }
    }

    // ---- one-shot reads -------------------------------------------------

    pub async fn all_cells(&self) -> Result<Vec<MapCell>> {
        self.db.all_cells().await
    }

    pub async fn column_cells(&self, x: i32) -> Result<Vec<MapCell>> {
        self.db.column_cells(x).await
    }

    pub async fn cell_at(&self, x: i32, y: i32) -> Result<Option<MapCell>> {
        self.db.cell_at(x, y).await
    }

    pub async fn metadata(&self) -> Result<Option<MapMetadata>> {
        self.db.metadata().await
    }

    pub async fn is_cached(&self) -> Result<bool> {
        self.engine.is_map_cached().await
    }

    // ---- sync entry points ----------------------------------------------

    pub async fn fetch_and_cache_map(&self) -> Result<SyncReport> {
        self.engine.fetch_and_cache_map().await
    }

    pub async fn fetch_and_cache_map_with_cancel(
        &self,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        self.engine.fetch_and_cache_map_with_cancel(cancel).await
    }

    pub async fn refresh_column(&self, x: i32) -> Result<Vec<MapCell>> {
        self.engine.refresh_column(x).await
    }

    pub async fn clear_cache(&self) -> Result<()> {
        self.engine.clear_cache().await
    }

    // ---- user edits -----------------------------------------------------

    /// Upsert a user-entered cell. Existing data at (x, y) is replaced whole;
    /// missing strengths are stored as 0, matching the sync normalization.
    pub async fn save_cell(
        &self,
        x: i32,
        y: i32,
        strength1: Option<i32>,
        strength2: Option<i32>,
        strength3: Option<i32>,
    ) -> Result<MapCell> {
        let cell = MapCell {
            x,
            y,
            strength1: strength1.unwrap_or(0),
            strength2: strength2.unwrap_or(0),
            strength3: strength3.unwrap_or(0),
            is_custom: true,
            last_updated: Utc::now(),
        };

        self.db.upsert_cells(vec![cell.clone()]).await?;
        debug!("Saved custom cell ({x}, {y})");
        Ok(cell)
    }

    pub async fn delete_cell(&self, x: i32, y: i32) -> Result<()> {
        self.db.delete_cell(x, y).await
    }

    pub async fn delete_column(&self, x: i32) -> Result<()> {
        self.db.delete_column(x).await
    }

    // ---- nearest match --------------------------------------------------

    /// Find the cached cell closest to `reading` by Euclidean distance.
    /// `None` means no cell with an observed signal exists yet; that is a
    /// displayable state, not an error.
    pub async fn find_nearest(&self, reading: Reading) -> Result<Option<NearestMatch>> {
        let cells = self.db.all_cells().await?;
        Ok(find_nearest(&cells, reading))
    }

    // ---- coordinate validation ------------------------------------------

    /// Bounds for input validation: metadata when present, otherwise derived
    /// from whatever cells are cached, otherwise `None`.
    pub async fn coordinate_ranges(&self) -> Result<Option<CoordinateRanges>> {
        if let Some(metadata) = self.db.metadata().await? {
            return Ok(Some(CoordinateRanges {
                min_x: metadata.min_x,
                max_x: metadata.max_x,
                min_y: metadata.min_y,
                max_y: metadata.max_y,
            }));
        }

        let cells = self.db.all_cells().await?;
        if cells.is_empty() {
            return Ok(None);
        }

        let mut ranges = CoordinateRanges {
            min_x: cells[0].x,
            max_x: cells[0].x,
            min_y: cells[0].y,
            max_y: cells[0].y,
        };
        for cell in &cells[1..] {
            ranges.min_x = ranges.min_x.min(cell.x);
            ranges.max_x = ranges.max_x.max(cell.x);
            ranges.min_y = ranges.min_y.min(cell.y);
            ranges.max_y = ranges.max_y.max(cell.y);
        }
        Ok(Some(ranges))
    }

    pub async fn validate_coordinates(&self, x: i32, y: i32) -> Result<CoordinateValidation> {
        match self.coordinate_ranges().await? {
            None => Ok(CoordinateValidation::MapNotLoaded),
            Some(ranges) if ranges.contains(x, y) => Ok(CoordinateValidation::Valid),
            Some(ranges) => Ok(CoordinateValidation::OutOfRange(ranges)),
        }
    }

    // ---- measurement log ------------------------------------------------

    /// Append a user-submitted reading to the audit log. Does not touch the
    /// cached cells.
    pub async fn record_measurement(
        &self,
        x: i32,
        y: i32,
        sensor: impl Into<String>,
        strength: i32,
    ) -> Result<UserMeasurement> {
        let mut measurement = UserMeasurement {
            id: None,
            x,
            y,
            sensor: sensor.into(),
            strength,
            recorded_at: Utc::now(),
        };

        let id = self.db.insert_measurement(&measurement).await?;
        measurement.id = Some(id);
        Ok(measurement)
    }

    pub async fn measurements(&self) -> Result<Vec<UserMeasurement>> {
        self.db.measurements().await
    }

    pub async fn measurements_for_cell(&self, x: i32, y: i32) -> Result<Vec<UserMeasurement>> {
        self.db.measurements_for_cell(x, y).await
    }

    pub async fn clear_measurements(&self) -> Result<()> {
        self.db.clear_measurements().await
    }
}
