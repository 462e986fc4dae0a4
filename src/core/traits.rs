//! Core traits - abstractions over the live game world
//!
//! These traits define what the tracker needs to read from the host game.
//! The host implements them against its client state; tests use the mocks
//! at the bottom of this file.

use super::grid::GridSettings;
use super::types::{GridCell, Position};

// =============================================================================
// PLAYER READER
// =============================================================================

/// Read the local player's state
pub trait PlayerReader {
    /// Current player position
    ///
    /// Returns None while the player entity does not exist (login, world
    /// switch, loading terrain).
    fn read_position(&self) -> Option<Position>;

    /// Entity id of the local player, once the player exists
    fn player_entity_id(&self) -> Option<i32>;
}

// =============================================================================
// ENTITY LOCATOR
// =============================================================================

/// Look up entities in the client world
///
/// Pickups are resolved on the main thread, one tick or more after the
/// network thread saw them. By then the client has usually processed the
/// item entity's removal, so implementations must keep the last known
/// position of recently removed entities (a few seconds is enough).
pub trait EntityLocator {
    /// Position of an entity by id, or its last known position if it was
    /// removed recently
    ///
    /// Returns None only for entities the client never saw or forgot.
    fn entity_position(&self, entity_id: i32) -> Option<Position>;
}

// =============================================================================
// LAYOUT PROBE
// =============================================================================

/// Fingerprint the block layout of a grid cell
///
/// Hosts that can scan the loaded world return a stable hash of the room's
/// core blocks; hosts that cannot simply keep the default and detection
/// falls back to cell signatures.
pub trait LayoutProbe {
    fn core_signature(&self, _cell: GridCell, _grid: &GridSettings) -> Option<i64> {
        None
    }
}

/// Everything the overlay reads from the world in one tick
///
/// This is automatically implemented for any type that implements all
/// three reader traits.
pub trait WorldView: PlayerReader + EntityLocator + LayoutProbe {}
impl<T: PlayerReader + EntityLocator + LayoutProbe> WorldView for T {}

// =============================================================================
// TEST MOCKS
// =============================================================================

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    /// Mock world for testing
    ///
    /// Replays one player position per frame and serves entity positions
    /// and layout fingerprints from maps. Despawned entities keep their last
    /// position, as the host's entity cache does.
    pub struct MockWorld {
        pub positions: Vec<Option<Position>>,
        pub frame: Cell<usize>,
        pub player_id: Cell<Option<i32>>,
        pub entities: RefCell<HashMap<i32, Position>>,
        pub despawned: RefCell<HashMap<i32, Position>>,
        pub cores: RefCell<HashMap<GridCell, i64>>,
    }

    impl MockWorld {
        pub fn new(positions: Vec<Option<Position>>) -> Self {
            Self {
                positions,
                frame: Cell::new(0),
                player_id: Cell::new(Some(1)),
                entities: RefCell::new(HashMap::new()),
                despawned: RefCell::new(HashMap::new()),
                cores: RefCell::new(HashMap::new()),
            }
        }

        /// A world where the player stands still for ever
        pub fn standing_at(position: Position) -> Self {
            Self::new(vec![Some(position)])
        }

        pub fn advance_frame(&self) {
            self.frame.set(self.frame.get() + 1);
        }

        pub fn current_frame(&self) -> usize {
            self.frame.get()
        }

        pub fn set_entity(&self, entity_id: i32, position: Position) {
            self.entities.borrow_mut().insert(entity_id, position);
        }

        /// Remove an entity from the world, remembering where it was
        pub fn despawn(&self, entity_id: i32) {
            if let Some(position) = self.entities.borrow_mut().remove(&entity_id) {
                self.despawned.borrow_mut().insert(entity_id, position);
            }
        }

        /// Drop every remembered position of removed entities
        pub fn forget_despawned(&self) {
            self.despawned.borrow_mut().clear();
        }

        pub fn set_core(&self, cell: GridCell, core: i64) {
            self.cores.borrow_mut().insert(cell, core);
        }
    }

    impl PlayerReader for MockWorld {
        fn read_position(&self) -> Option<Position> {
            // Past the end of the script, keep replaying the last frame
            let idx = self.frame.get().min(self.positions.len().saturating_sub(1));
            self.positions.get(idx).copied().flatten()
        }

        fn player_entity_id(&self) -> Option<i32> {
            self.read_position().and(self.player_id.get())
        }
    }

    impl EntityLocator for MockWorld {
        fn entity_position(&self, entity_id: i32) -> Option<Position> {
            self.entities
                .borrow()
                .get(&entity_id)
                .copied()
                .or_else(|| self.despawned.borrow().get(&entity_id).copied())
        }
    }

    impl LayoutProbe for MockWorld {
        fn core_signature(&self, cell: GridCell, _grid: &GridSettings) -> Option<i64> {
            self.cores.borrow().get(&cell).copied()
        }
    }
}
