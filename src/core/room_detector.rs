//! Room detection state machine
//!
//! Maps the player's position to a catalogued room once per tick.
//! It is platform-independent and can be tested without a game client.
//!
//! # Detection Strategy
//!
//! 1. **Snap**: the position is snapped to the dungeon grid cell it lies in.
//! 2. **Resolve**: the cell (plus an optional layout fingerprint from the
//!    host) forms a [`RoomSignature`] that is resolved against the catalog.
//!    Anything that does not resolve is the sentinel room `"undefined"`.
//! 3. **Debounce**: a new candidate must be seen on `debounce_ticks`
//!    consecutive ticks before it replaces the confirmed room. Walking along a
//!    room boundary therefore never produces flicker.
//!
//! Each confirmed change yields exactly one [`RoomChanged`].

use tracing::{debug, info};

use super::catalog::RoomCatalog;
use super::constants::{DEFAULT_DEBOUNCE_TICKS, UNDEFINED_ROOM};
use super::grid::{GridSettings, RoomSignature};
use super::traits::LayoutProbe;
use super::types::{GridCell, PlayerPositionSample, Position};

// =============================================================================
// SETTINGS
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorSettings {
    pub grid: GridSettings,
    /// Consecutive ticks a candidate must be observed (values below 1 act as 1)
    pub debounce_ticks: u32,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            grid: GridSettings::default(),
            debounce_ticks: DEFAULT_DEBOUNCE_TICKS,
        }
    }
}

// =============================================================================
// DETECTION RESULTS
// =============================================================================

/// A catalogued room matched at a grid location
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedRoom {
    /// Catalog id of the room
    pub id: String,
    /// Cell the player stood in when the room was matched
    pub cell: GridCell,
    /// World origin used for room-local secret positions
    pub origin: Position,
    /// Floor section from the catalog
    pub floor: u32,
}

/// Confirmed change of the current room
#[derive(Clone, Debug, PartialEq)]
pub struct RoomChanged {
    /// Previous room id, or `"undefined"`
    pub old: String,
    /// New room id, or `"undefined"`
    pub new: String,
    /// The new room, None when `new` is `"undefined"`
    pub room: Option<DetectedRoom>,
    /// Tick on which the change was confirmed
    pub tick: u64,
}

impl RoomChanged {
    /// Whether the player left every catalogued room
    pub fn is_undefined(&self) -> bool {
        self.room.is_none()
    }
}

/// Room candidate waiting for confirmation
#[derive(Clone, Debug)]
struct Candidate {
    room: Option<DetectedRoom>,
    seen: u32,
    last_tick: u64,
}

impl Candidate {
    fn id(&self) -> Option<&str> {
        self.room.as_ref().map(|r| r.id.as_str())
    }
}

// =============================================================================
// ROOM DETECTOR
// =============================================================================

/// Debounced position-to-room resolver.
///
/// Call `observe` once per tick. The detector only keeps its own debounce
/// history; the catalog and the layout probe are passed in on every call.
pub struct RoomDetector {
    settings: DetectorSettings,
    confirmed: Option<DetectedRoom>,
    candidate: Option<Candidate>,
    last_tick: Option<u64>,
}

impl RoomDetector {
    pub fn new(settings: DetectorSettings) -> Self {
        Self {
            settings,
            confirmed: None,
            candidate: None,
            last_tick: None,
        }
    }

    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    /// Confirmed room id, or `"undefined"`
    pub fn current_room(&self) -> &str {
        self.confirmed
            .as_ref()
            .map(|r| r.id.as_str())
            .unwrap_or(UNDEFINED_ROOM)
    }

    /// Confirmed room, if any
    pub fn current(&self) -> Option<&DetectedRoom> {
        self.confirmed.as_ref()
    }

    /// Room id waiting for confirmation and how many ticks it has been seen
    pub fn pending(&self) -> Option<(&str, u32)> {
        self.candidate
            .as_ref()
            .map(|c| (c.id().unwrap_or(UNDEFINED_ROOM), c.seen))
    }

    /// Forget the confirmed room and the debounce history (world change).
    pub fn reset(&mut self) {
        if self.confirmed.is_some() {
            debug!(room = %self.current_room(), "[ROOM] Detector reset");
        }
        self.confirmed = None;
        self.candidate = None;
        self.last_tick = None;
    }

    /// Resolve a position to a catalogued room without touching debounce state.
    pub fn locate<P: LayoutProbe>(
        &self,
        position: &Position,
        catalog: Option<&RoomCatalog>,
        probe: &P,
    ) -> Option<DetectedRoom> {
        let catalog = catalog?;
        let grid = &self.settings.grid;
        let cell = grid.snap(position);
        let signature = RoomSignature::new(cell, probe.core_signature(cell, grid));
        let entry = catalog.resolve(&signature)?;
        Some(DetectedRoom {
            id: entry.id.clone(),
            cell,
            origin: grid.cell_corner(entry.anchor_cell().unwrap_or(cell)),
            floor: entry.floor,
        })
    }

    /// Feed one position sample.
    ///
    /// Returns a `RoomChanged` on the tick a new room is confirmed. Samples
    /// for a tick already observed are ignored, and a gap in ticks restarts
    /// the candidate count.
    pub fn observe<P: LayoutProbe>(
        &mut self,
        sample: &PlayerPositionSample,
        catalog: Option<&RoomCatalog>,
        probe: &P,
    ) -> Option<RoomChanged> {
        if self.last_tick.is_some_and(|t| sample.tick <= t) {
            return None;
        }
        self.last_tick = Some(sample.tick);

        let found = self.locate(&sample.position, catalog, probe);
        let found_id = found.as_ref().map(|r| r.id.as_str());
        let confirmed_id = self.confirmed.as_ref().map(|r| r.id.as_str());

        if found_id == confirmed_id {
            self.candidate = None;
            return None;
        }

        let continues = self
            .candidate
            .as_ref()
            .is_some_and(|c| c.id() == found_id && c.last_tick + 1 == sample.tick);
        if continues {
            if let Some(candidate) = self.candidate.as_mut() {
                candidate.seen += 1;
                candidate.last_tick = sample.tick;
            }
        } else {
            self.candidate = Some(Candidate {
                room: found,
                seen: 1,
                last_tick: sample.tick,
            });
        }

        let ready = self
            .candidate
            .as_ref()
            .is_some_and(|c| c.seen >= self.settings.debounce_ticks.max(1));
        if !ready {
            return None;
        }

        let candidate = self.candidate.take()?;
        let old = self.current_room().to_string();
        self.confirmed = candidate.room;
        let change = RoomChanged {
            old,
            new: self.current_room().to_string(),
            room: self.confirmed.clone(),
            tick: sample.tick,
        };
        info!(from = %change.old, to = %change.new, tick = sample.tick, "[ROOM] Room changed");
        Some(change)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::RoomCatalogEntry;
    use crate::core::traits::mocks::MockWorld;

    /// Catalog on a 16 block grid anchored at 0,0 so room coordinates stay small
    fn small_grid() -> DetectorSettings {
        DetectorSettings {
            grid: GridSettings {
                cell_size: 16,
                origin_x: 0,
                origin_z: 0,
            },
            debounce_ticks: 3,
        }
    }

    fn catalog() -> RoomCatalog {
        RoomCatalog::from_json(
            r#"{
                "R1": { "cells": [[0, 0]], "secrets": [ { "x": 10, "y": 64, "z": 5, "kind": "item" } ] },
                "R2": { "floor": 1, "cells": [[1, 0]] },
                "Big": { "floor": 2, "cells": [[0, 2], [1, 2], [0, 3]] }
            }"#,
        )
        .unwrap()
        .0
    }

    fn sample(tick: u64, x: f64, z: f64) -> PlayerPositionSample {
        PlayerPositionSample::new(Position::new(x, 64.0, z), tick)
    }

    fn blind() -> MockWorld {
        MockWorld::standing_at(Position::default())
    }

    // -------------------------------------------------------------------------
    // Basic detection
    // -------------------------------------------------------------------------

    #[test]
    fn test_initial_state_undefined() {
        let detector = RoomDetector::new(small_grid());
        assert_eq!(detector.current_room(), UNDEFINED_ROOM);
        assert!(detector.current().is_none());
        assert!(detector.pending().is_none());
    }

    #[test]
    fn test_room_confirmed_after_three_ticks() {
        let catalog = catalog();
        let probe = blind();
        let mut detector = RoomDetector::new(small_grid());

        assert!(detector.observe(&sample(1, 10.0, 5.0), Some(&catalog), &probe).is_none());
        assert_eq!(detector.pending(), Some(("R1", 1)));
        assert!(detector.observe(&sample(2, 10.5, 5.0), Some(&catalog), &probe).is_none());
        let change = detector
            .observe(&sample(3, 11.0, 5.5), Some(&catalog), &probe)
            .unwrap();

        assert_eq!(change.old, UNDEFINED_ROOM);
        assert_eq!(change.new, "R1");
        assert_eq!(change.tick, 3);
        assert!(!change.is_undefined());
        assert_eq!(detector.current_room(), "R1");

        // Staying in the room emits nothing further
        for tick in 4..20 {
            assert!(detector.observe(&sample(tick, 8.0, 8.0), Some(&catalog), &probe).is_none());
        }
    }

    #[test]
    fn test_uncatalogued_cell_is_undefined() {
        let catalog = catalog();
        let probe = blind();
        let mut detector = RoomDetector::new(small_grid());
        for tick in 1..10 {
            assert!(detector
                .observe(&sample(tick, 500.0, 500.0), Some(&catalog), &probe)
                .is_none());
        }
        assert_eq!(detector.current_room(), UNDEFINED_ROOM);
    }

    #[test]
    fn test_no_catalog_degrades_to_undefined() {
        let probe = blind();
        let mut detector = RoomDetector::new(small_grid());
        for tick in 1..10 {
            assert!(detector.observe(&sample(tick, 10.0, 5.0), None, &probe).is_none());
        }
        assert_eq!(detector.current_room(), UNDEFINED_ROOM);
    }

    // -------------------------------------------------------------------------
    // Debounce
    // -------------------------------------------------------------------------

    #[test]
    fn test_boundary_flicker_suppressed() {
        let catalog = catalog();
        let probe = blind();
        let mut detector = RoomDetector::new(small_grid());
        for tick in 1..=3 {
            detector.observe(&sample(tick, 14.0, 5.0), Some(&catalog), &probe);
        }
        assert_eq!(detector.current_room(), "R1");

        // Oscillate across the R1/R2 boundary at x = 16
        let mut changes = 0;
        for tick in 4..40 {
            let x = if tick % 2 == 0 { 15.9 } else { 16.1 };
            if detector.observe(&sample(tick, x, 5.0), Some(&catalog), &probe).is_some() {
                changes += 1;
            }
        }
        assert_eq!(changes, 0);
        assert_eq!(detector.current_room(), "R1");
    }

    #[test]
    fn test_multi_cell_room_single_change() {
        let catalog = catalog();
        let probe = blind();
        let mut detector = RoomDetector::new(small_grid());

        // Wander through all three cells of "Big"
        let path = [(5.0, 40.0), (20.0, 40.0), (5.0, 50.0), (20.0, 35.0), (3.0, 60.0)];
        let mut changes = Vec::new();
        for (i, (x, z)) in path.iter().cycle().take(30).enumerate() {
            if let Some(c) = detector.observe(&sample(i as u64 + 1, *x, *z), Some(&catalog), &probe) {
                changes.push(c);
            }
        }
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].new, "Big");
        assert_eq!(changes[0].room.as_ref().unwrap().floor, 2);
    }

    #[test]
    fn test_tick_gap_restarts_count() {
        let catalog = catalog();
        let probe = blind();
        let mut detector = RoomDetector::new(small_grid());
        detector.observe(&sample(1, 10.0, 5.0), Some(&catalog), &probe);
        detector.observe(&sample(2, 10.0, 5.0), Some(&catalog), &probe);
        // Tick 3 missing (player unreadable)
        assert!(detector.observe(&sample(4, 10.0, 5.0), Some(&catalog), &probe).is_none());
        assert_eq!(detector.pending(), Some(("R1", 1)));
        detector.observe(&sample(5, 10.0, 5.0), Some(&catalog), &probe);
        assert!(detector.observe(&sample(6, 10.0, 5.0), Some(&catalog), &probe).is_some());
    }

    #[test]
    fn test_repeated_tick_ignored() {
        let catalog = catalog();
        let probe = blind();
        let mut detector = RoomDetector::new(small_grid());
        for _ in 0..5 {
            assert!(detector.observe(&sample(1, 10.0, 5.0), Some(&catalog), &probe).is_none());
        }
        assert_eq!(detector.pending(), Some(("R1", 1)));
    }

    #[test]
    fn test_debounce_of_one_is_immediate() {
        let catalog = catalog();
        let probe = blind();
        let mut detector = RoomDetector::new(DetectorSettings {
            debounce_ticks: 1,
            ..small_grid()
        });
        let change = detector.observe(&sample(1, 20.0, 5.0), Some(&catalog), &probe).unwrap();
        assert_eq!(change.new, "R2");
    }

    #[test]
    fn test_debounce_of_zero_behaves_like_one() {
        let catalog = catalog();
        let probe = blind();
        let mut detector = RoomDetector::new(DetectorSettings {
            debounce_ticks: 0,
            ..small_grid()
        });
        assert!(detector.observe(&sample(1, 20.0, 5.0), Some(&catalog), &probe).is_some());
    }

    #[test]
    fn test_leaving_room_reports_undefined() {
        let catalog = catalog();
        let probe = blind();
        let mut detector = RoomDetector::new(small_grid());
        for tick in 1..=3 {
            detector.observe(&sample(tick, 10.0, 5.0), Some(&catalog), &probe);
        }
        let mut last = None;
        for tick in 4..=6 {
            last = detector.observe(&sample(tick, 200.0, 200.0), Some(&catalog), &probe);
        }
        let change = last.unwrap();
        assert_eq!(change.old, "R1");
        assert_eq!(change.new, UNDEFINED_ROOM);
        assert!(change.is_undefined());
    }

    #[test]
    fn test_room_to_room_transition() {
        let catalog = catalog();
        let probe = blind();
        let mut detector = RoomDetector::new(small_grid());
        for tick in 1..=3 {
            detector.observe(&sample(tick, 10.0, 5.0), Some(&catalog), &probe);
        }
        let mut changes = Vec::new();
        for tick in 4..=10 {
            if let Some(c) = detector.observe(&sample(tick, 20.0, 5.0), Some(&catalog), &probe) {
                changes.push(c);
            }
        }
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].old, "R1");
        assert_eq!(changes[0].new, "R2");
        assert_eq!(changes[0].tick, 6);
    }

    // -------------------------------------------------------------------------
    // Resolution details
    // -------------------------------------------------------------------------

    #[test]
    fn test_layout_fingerprint_resolution() {
        let (catalog, _) = RoomCatalog::from_json(r#"{ "Water Board": { "cores": [77] } }"#).unwrap();
        let world = MockWorld::standing_at(Position::default());
        let detector = RoomDetector::new(small_grid());
        world.set_core(GridCell::new(3, 3), 77);

        let room = detector
            .locate(&Position::new(50.0, 70.0, 50.0), Some(&catalog), &world)
            .unwrap();
        assert_eq!(room.id, "Water Board");
        assert_eq!(room.cell, GridCell::new(3, 3));
        // No catalogued cells: origin is the detected cell's corner
        assert_eq!(room.origin, Position::new(48.0, 0.0, 48.0));
    }

    #[test]
    fn test_fingerprint_match_with_far_anchor_cell() {
        // Entries built in code bypass the catalog's cell range check
        let entry = RoomCatalogEntry {
            id: "X".to_string(),
            name: "X".to_string(),
            floor: 0,
            cells: vec![GridCell::new(100_000_000, 0)],
            cores: vec![5],
            secrets: Vec::new(),
        };
        let (catalog, _) = RoomCatalog::from_entries([entry]);
        let world = blind();
        world.set_core(GridCell::new(6, 6), 5);
        let detector = RoomDetector::new(small_grid());

        let room = detector
            .locate(&Position::new(100.0, 64.0, 100.0), Some(&catalog), &world)
            .unwrap();
        assert_eq!(room.id, "X");
        assert_eq!(room.origin, Position::new(1_600_000_000.0, 0.0, 0.0));
    }

    #[test]
    fn test_origin_uses_anchor_cell() {
        let catalog = catalog();
        let detector = RoomDetector::new(small_grid());
        let room = detector
            .locate(&Position::new(20.0, 70.0, 40.0), Some(&catalog), &blind())
            .unwrap();
        assert_eq!(room.id, "Big");
        assert_eq!(room.cell, GridCell::new(1, 2));
        assert_eq!(room.origin, Position::new(0.0, 0.0, 32.0));
    }

    #[test]
    fn test_identical_catalogs_identical_lookups() {
        let a = catalog();
        let b = catalog();
        let detector = RoomDetector::new(small_grid());
        let probe = blind();
        for x in (0..64).step_by(7) {
            for z in (0..64).step_by(5) {
                let pos = Position::new(x as f64, 64.0, z as f64);
                assert_eq!(
                    detector.locate(&pos, Some(&a), &probe),
                    detector.locate(&pos, Some(&b), &probe)
                );
            }
        }
    }

    #[test]
    fn test_reset_forgets_room() {
        let catalog = catalog();
        let probe = blind();
        let mut detector = RoomDetector::new(small_grid());
        for tick in 1..=3 {
            detector.observe(&sample(tick, 10.0, 5.0), Some(&catalog), &probe);
        }
        detector.reset();
        assert_eq!(detector.current_room(), UNDEFINED_ROOM);

        // Ticks restart after a world change
        let mut change = None;
        for tick in 1..=3 {
            change = detector.observe(&sample(tick, 10.0, 5.0), Some(&catalog), &probe);
        }
        assert_eq!(change.unwrap().old, UNDEFINED_ROOM);
    }
}
