//! Grid utilities
//!
//! Dungeon rooms are laid out on a fixed-size X/Z grid. These functions snap
//! world positions to grid cells and format cell signatures, the string form
//! used as a catalog key ("cell:X,Z").

use super::constants::{DEFAULT_CELL_SIZE, DEFAULT_GRID_ORIGIN_X, DEFAULT_GRID_ORIGIN_Z};
use super::types::{GridCell, Position};

/// Geometry of the room grid
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSettings {
    pub cell_size: i32,
    pub origin_x: i32,
    pub origin_z: i32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            cell_size: DEFAULT_CELL_SIZE,
            origin_x: DEFAULT_GRID_ORIGIN_X,
            origin_z: DEFAULT_GRID_ORIGIN_Z,
        }
    }
}

impl GridSettings {
    /// Snap a world position to the cell containing it.
    ///
    /// Uses floor division, so positions west/north of the origin land in
    /// negative cells instead of being folded into cell 0.
    pub fn snap(&self, position: &Position) -> GridCell {
        let size = f64::from(self.cell_size.max(1));
        let cx = ((position.x - f64::from(self.origin_x)) / size).floor();
        let cz = ((position.z - f64::from(self.origin_z)) / size).floor();
        GridCell::new(cx as i32, cz as i32)
    }

    /// World-space minimum corner (lowest X and Z) of a cell, at height 0
    ///
    /// Computed in f64 so catalog-supplied cells far from the origin cannot
    /// overflow.
    pub fn cell_corner(&self, cell: GridCell) -> Position {
        let size = f64::from(self.cell_size.max(1));
        Position::new(
            f64::from(self.origin_x) + f64::from(cell.x) * size,
            0.0,
            f64::from(self.origin_z) + f64::from(cell.z) * size,
        )
    }
}

/// Fingerprint of the room the player stands in.
///
/// `cell` always comes from the player's position. `core` is an optional
/// hash of the room's block layout, available when the host can scan the
/// loaded world around the cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RoomSignature {
    pub cell: GridCell,
    pub core: Option<i64>,
}

impl RoomSignature {
    pub fn new(cell: GridCell, core: Option<i64>) -> Self {
        Self { cell, core }
    }

    /// The catalog key form of this signature
    pub fn key(&self) -> String {
        format_cell_signature(self.cell)
    }
}

/// Format a cell as its catalog signature "cell:X,Z"
///
/// # Examples
///
/// ```
/// use room_secrets::core::grid::format_cell_signature;
/// use room_secrets::core::types::GridCell;
///
/// assert_eq!(format_cell_signature(GridCell::new(2, -1)), "cell:2,-1");
/// ```
pub fn format_cell_signature(cell: GridCell) -> String {
    format!("cell:{},{}", cell.x, cell.z)
}

/// Parse a "cell:X,Z" signature back into a cell
///
/// Returns None if the string is not a valid cell signature.
///
/// # Examples
///
/// ```
/// use room_secrets::core::grid::parse_cell_signature;
/// use room_secrets::core::types::GridCell;
///
/// assert_eq!(parse_cell_signature("cell:2,-1"), Some(GridCell::new(2, -1)));
/// assert_eq!(parse_cell_signature("invalid"), None);
/// ```
pub fn parse_cell_signature(s: &str) -> Option<GridCell> {
    let s = s.strip_prefix("cell:")?;
    let (x, z) = s.split_once(',')?;
    let x = x.trim().parse::<i32>().ok()?;
    let z = z.trim().parse::<i32>().ok()?;
    Some(GridCell::new(x, z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_origin_cell() {
        let grid = GridSettings::default();
        assert_eq!(grid.snap(&Position::new(-200.0, 70.0, -200.0)), GridCell::new(0, 0));
        assert_eq!(grid.snap(&Position::new(-168.1, 70.0, -168.1)), GridCell::new(0, 0));
    }

    #[test]
    fn test_snap_cell_boundary() {
        let grid = GridSettings::default();
        // -168 is exactly the start of cell 1
        assert_eq!(grid.snap(&Position::new(-168.0, 0.0, -200.0)), GridCell::new(1, 0));
        assert_eq!(grid.snap(&Position::new(-10.0, 0.0, -10.0)), GridCell::new(5, 5));
    }

    #[test]
    fn test_snap_negative_side_of_origin() {
        let grid = GridSettings::default();
        assert_eq!(grid.snap(&Position::new(-200.5, 0.0, -201.0)), GridCell::new(-1, -1));
    }

    #[test]
    fn test_snap_ignores_height() {
        let grid = GridSettings::default();
        let low = grid.snap(&Position::new(-150.0, 0.0, -150.0));
        let high = grid.snap(&Position::new(-150.0, 255.0, -150.0));
        assert_eq!(low, high);
    }

    #[test]
    fn test_cell_corner() {
        let grid = GridSettings::default();
        assert_eq!(grid.cell_corner(GridCell::new(0, 0)), Position::new(-200.0, 0.0, -200.0));
        assert_eq!(grid.cell_corner(GridCell::new(2, 1)), Position::new(-136.0, 0.0, -168.0));
    }

    #[test]
    fn test_cell_corner_far_cell_does_not_overflow() {
        let grid = GridSettings::default();
        let corner = grid.cell_corner(GridCell::new(100_000_000, i32::MIN));
        assert_eq!(corner.x, -200.0 + 100_000_000.0 * 32.0);
        assert_eq!(corner.z, -200.0 + f64::from(i32::MIN) * 32.0);
    }

    #[test]
    fn test_cell_corner_agrees_with_snap_for_bad_cell_size() {
        let grid = GridSettings {
            cell_size: 0,
            origin_x: 0,
            origin_z: 0,
        };
        let cell = GridCell::new(3, -2);
        assert_eq!(grid.snap(&grid.cell_corner(cell)), cell);
    }

    #[test]
    fn test_snap_corner_roundtrip() {
        let grid = GridSettings::default();
        for (x, z) in [(0, 0), (3, 5), (-1, 2)] {
            let cell = GridCell::new(x, z);
            assert_eq!(grid.snap(&grid.cell_corner(cell)), cell);
        }
    }

    #[test]
    fn test_custom_grid() {
        let grid = GridSettings {
            cell_size: 16,
            origin_x: 0,
            origin_z: 0,
        };
        assert_eq!(grid.snap(&Position::new(10.0, 64.0, 5.0)), GridCell::new(0, 0));
        assert_eq!(grid.snap(&Position::new(17.0, 64.0, 33.0)), GridCell::new(1, 2));
    }

    #[test]
    fn test_parse_cell_signature_invalid() {
        assert_eq!(parse_cell_signature(""), None);
        assert_eq!(parse_cell_signature("cell:"), None);
        assert_eq!(parse_cell_signature("cell:1"), None);
        assert_eq!(parse_cell_signature("cell:a,b"), None);
        assert_eq!(parse_cell_signature("1,2"), None);
    }

    #[test]
    fn test_room_signature_key() {
        let sig = RoomSignature::new(GridCell::new(4, 1), Some(-1234));
        assert_eq!(sig.key(), "cell:4,1");
        assert_eq!(parse_cell_signature(&sig.key()), Some(sig.cell));
    }

    #[test]
    fn test_format_cell_signature() {
        assert_eq!(format_cell_signature(GridCell::new(0, 0)), "cell:0,0");
        assert_eq!(format_cell_signature(GridCell::new(-3, 12)), "cell:-3,12");
    }
}
