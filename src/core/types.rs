//! Core types - platform-independent data structures
//!
//! These types represent positions and grid locations and are used
//! throughout the detector and the secret tracker.

use serde::{Deserialize, Serialize};

// =============================================================================
// POSITION
// =============================================================================

/// A world-space coordinate (blocks)
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Squared 3D distance to another position
    pub fn distance_sq(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// 3D distance to another position
    pub fn distance_to(&self, other: &Position) -> f64 {
        self.distance_sq(other).sqrt()
    }

    /// Translate by another position used as an offset
    pub fn offset(&self, by: &Position) -> Position {
        Position::new(self.x + by.x, self.y + by.y, self.z + by.z)
    }
}

// =============================================================================
// PLAYER POSITION SAMPLE
// =============================================================================

/// Player position captured on one tick, consumed by the room detector
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerPositionSample {
    pub position: Position,
    pub tick: u64,
}

impl PlayerPositionSample {
    pub fn new(position: Position, tick: u64) -> Self {
        Self { position, tick }
    }
}

// =============================================================================
// GRID CELL
// =============================================================================

/// Index of a fixed-size dungeon grid cell (X/Z only, height is ignored)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub x: i32,
    pub z: i32,
}

impl GridCell {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_distance_to() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 4.0, 0.0);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-9);
        assert!(a.distance_to(&a).abs() < 1e-9);
    }

    #[test]
    fn test_position_distance_sq() {
        let a = Position::new(1.0, 2.0, 3.0);
        let b = Position::new(2.0, 2.0, 5.0);
        assert!((a.distance_sq(&b) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_position_offset() {
        let local = Position::new(10.0, 64.0, 5.0);
        let origin = Position::new(-200.0, 0.0, -168.0);
        assert_eq!(local.offset(&origin), Position::new(-190.0, 64.0, -163.0));
    }

    #[test]
    fn test_grid_cell_ordering() {
        let mut cells = vec![GridCell::new(1, 0), GridCell::new(0, 2), GridCell::new(0, 1)];
        cells.sort();
        assert_eq!(
            cells,
            vec![GridCell::new(0, 1), GridCell::new(0, 2), GridCell::new(1, 0)]
        );
    }
}
