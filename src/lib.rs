// Secret waypoint overlay for procedurally built dungeon rooms

pub mod core;
pub mod host;
