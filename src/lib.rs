//! Local cache and sync engine for a remote signal strength map.
//!
//! The remote service exposes a rectangular grid of cells, each carrying up
//! to three sensor readings. This crate fetches that grid column by column,
//! reconciles partial results into a guaranteed-dense rectangle in SQLite,
//! and serves consistent, live-updating read views to UI collaborators. All
//! reads come from the local store; only the sync engine touches the
//! network.

pub mod cache;
pub mod db;
pub mod locate;
pub mod remote;
pub mod sync;

pub use cache::{CoordinateValidation, MapCache};
pub use db::{CoordinateRanges, Database, MapCell, MapMetadata, UserMeasurement};
pub use locate::{find_nearest, NearestMatch, Reading};
pub use remote::{HttpMapSource, MapBounds, MapSource, RemoteCell, RemoteError};
pub use sync::{SyncEngine, SyncReport};
