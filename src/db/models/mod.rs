pub mod cell;
pub mod measurement;
pub mod metadata;

pub use cell::MapCell;
pub use measurement::UserMeasurement;
pub use metadata::{CoordinateRanges, MapMetadata};
