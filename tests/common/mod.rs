//! Shared test fixtures: a temp-dir database and a scriptable in-memory
//! remote source.

// Each test binary uses its own subset of this module.
#![allow(dead_code)]

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wireless_map_cache::{
    Database, MapBounds, MapCache, MapSource, RemoteCell, RemoteError,
};

pub fn open_db() -> (TempDir, Database) {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = TempDir::new().expect("failed to create temp dir");
    let db = Database::open(dir.path().join("map.sqlite")).expect("failed to open database");
    (dir, db)
}

pub fn cache_with(source: Arc<FakeMapSource>) -> (TempDir, MapCache) {
    let (dir, db) = open_db();
    (dir, MapCache::new(db, source))
}

#[derive(Default)]
struct FakeState {
    bounds: Option<MapBounds>,
    columns: HashMap<i32, Vec<RemoteCell>>,
    failing_columns: HashSet<i32>,
    cancel_on_column: Option<(i32, CancellationToken)>,
    bounds_calls: usize,
    column_calls: usize,
}

/// In-memory stand-in for the remote map service. Columns and failures are
/// scripted per test; an unset bounds makes `bounds()` fail.
#[derive(Default)]
pub struct FakeMapSource {
    state: Mutex<FakeState>,
}

impl FakeMapSource {
    pub fn new(bounds: MapBounds) -> Arc<Self> {
        let source = Self::default();
        source.state.lock().unwrap().bounds = Some(bounds);
        Arc::new(source)
    }

    pub fn set_bounds(&self, bounds: MapBounds) {
        self.state.lock().unwrap().bounds = Some(bounds);
    }

    pub fn fail_bounds(&self) {
        self.state.lock().unwrap().bounds = None;
    }

    pub fn set_column(&self, x: i32, cells: Vec<RemoteCell>) {
        self.state.lock().unwrap().columns.insert(x, cells);
    }

    pub fn fail_column(&self, x: i32) {
        self.state.lock().unwrap().failing_columns.insert(x);
    }

    pub fn restore_column(&self, x: i32) {
        self.state.lock().unwrap().failing_columns.remove(&x);
    }

    /// Cancel `token` from inside the fetch of column `x`, simulating a
    /// caller aborting while a sync is mid-flight.
    pub fn cancel_during_column(&self, x: i32, token: CancellationToken) {
        self.state.lock().unwrap().cancel_on_column = Some((x, token));
    }

    pub fn bounds_calls(&self) -> usize {
        self.state.lock().unwrap().bounds_calls
    }

    pub fn column_calls(&self) -> usize {
        self.state.lock().unwrap().column_calls
    }
}

#[async_trait]
impl MapSource for FakeMapSource {
    async fn bounds(&self) -> Result<MapBounds, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.bounds_calls += 1;
        state.bounds.ok_or(RemoteError::Http { status: 503 })
    }

    async fn column(&self, x: i32) -> Result<Vec<RemoteCell>, RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.column_calls += 1;
        if let Some((cancel_x, token)) = &state.cancel_on_column {
            if *cancel_x == x {
                token.cancel();
            }
        }
        if state.failing_columns.contains(&x) {
            return Err(RemoteError::Http { status: 500 });
        }
        Ok(state.columns.get(&x).cloned().unwrap_or_default())
    }
}

pub fn remote_cell(x: i32, y: i32, strengths: [Option<i32>; 3]) -> RemoteCell {
    RemoteCell {
        x,
        y,
        strength1: strengths[0],
        strength2: strengths[1],
        strength3: strengths[2],
    }
}

pub fn bounds(min_x: i32, max_x: i32, min_y: i32, max_y: i32) -> MapBounds {
    MapBounds {
        min_x,
        max_x,
        min_y,
        max_y,
    }
}
