pub mod map_cells;
pub mod map_metadata;
pub mod user_measurements;
