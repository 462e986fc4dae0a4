//! Secret tracker - found/unfound state of the active room's secrets
//!
//! On every confirmed room change the tracker loads the room's secret list
//! from the catalog and lays a found-flag overlay on top of it. Pickups
//! observed on the network thread arrive over a channel and are drained here,
//! on the main thread, once per tick.
//!
//! Found flags only ever go from false to true. They are cleared by:
//! - re-detecting a room while practice mode is on
//! - `reset_room` (practice reset)
//! - `reset_session` (leaving the dungeon)
//!
//! With practice mode off, flags survive leaving and re-entering a room for
//! the lifetime of the session.

use std::collections::HashMap;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use tracing::{debug, info};

use super::catalog::{RoomCatalog, SecretKind};
use super::constants::{DEFAULT_INTERACT_RADIUS, DEFAULT_PICKUP_RADIUS, UNDEFINED_ROOM};
use super::packet::PickupEvent;
use super::room_detector::RoomChanged;
use super::snapshot::{SecretMarker, SecretSnapshot};
use super::traits::EntityLocator;
use super::types::Position;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerSettings {
    /// Max distance between a picked up item and an item secret
    pub pickup_radius: f64,
    /// Max distance between a clicked block and a chest/essence secret
    pub interact_radius: f64,
    pub practice_mode: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            pickup_radius: DEFAULT_PICKUP_RADIUS,
            interact_radius: DEFAULT_INTERACT_RADIUS,
            practice_mode: false,
        }
    }
}

/// A catalogued secret plus its found flag
#[derive(Clone, Debug, PartialEq)]
pub struct TrackedSecret {
    pub name: String,
    pub kind: SecretKind,
    /// World position
    pub position: Position,
    pub found: bool,
}

/// A secret that just transitioned to found
#[derive(Clone, Debug, PartialEq)]
pub struct SecretFound {
    pub room_id: String,
    pub index: usize,
    pub name: String,
    pub kind: SecretKind,
    pub distance: f64,
}

/// How a secret was completed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Completion {
    Pickup,
    Interaction,
}

pub struct SecretTracker {
    settings: TrackerSettings,
    room_id: Option<String>,
    secrets: Vec<TrackedSecret>,
    /// Found flags of rooms visited this session (practice mode off)
    visited: HashMap<String, Vec<bool>>,
    snapshot: Arc<SecretSnapshot>,
}

impl SecretTracker {
    pub fn new(settings: TrackerSettings) -> Self {
        Self {
            settings,
            room_id: None,
            secrets: Vec::new(),
            visited: HashMap::new(),
            snapshot: Arc::new(SecretSnapshot::empty()),
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    /// Active room id, or `"undefined"`
    pub fn room_id(&self) -> &str {
        self.room_id.as_deref().unwrap_or(UNDEFINED_ROOM)
    }

    pub fn secrets(&self) -> &[TrackedSecret] {
        &self.secrets
    }

    pub fn practice_mode(&self) -> bool {
        self.settings.practice_mode
    }

    /// Toggle practice mode. Switching it on drops the remembered flags of
    /// other rooms; the active room keeps its current flags until re-entry.
    pub fn set_practice_mode(&mut self, enabled: bool) {
        if self.settings.practice_mode == enabled {
            return;
        }
        self.settings.practice_mode = enabled;
        if enabled {
            self.visited.clear();
        }
        info!(enabled, "[SECRETS] Practice mode toggled");
    }

    /// Load the secrets of the newly confirmed room.
    ///
    /// A room missing from the catalog (or no catalog at all) gives an empty
    /// list.
    pub fn on_room_changed(&mut self, change: &RoomChanged, catalog: Option<&RoomCatalog>) {
        self.remember_active_room();
        self.secrets.clear();
        self.room_id = None;

        if let Some(room) = &change.room {
            if let Some(entry) = catalog.and_then(|c| c.get(&room.id)) {
                let remembered = if self.settings.practice_mode {
                    None
                } else {
                    self.visited
                        .get(&room.id)
                        .filter(|flags| flags.len() == entry.secrets.len())
                };
                self.secrets = entry
                    .secrets
                    .iter()
                    .enumerate()
                    .map(|(i, def)| TrackedSecret {
                        name: def.name.clone(),
                        kind: def.kind,
                        position: def.world_position(&room.origin),
                        found: remembered.is_some_and(|flags| flags[i]),
                    })
                    .collect();
            }
            self.room_id = Some(room.id.clone());
            debug!(
                room = %room.id,
                secrets = self.secrets.len(),
                found = self.found_count(),
                "[SECRETS] Room loaded"
            );
        }

        self.rebuild_snapshot();
    }

    /// Resolve a pickup at `position` to the nearest unfound item secret.
    ///
    /// Returns None (and changes nothing) when no secret is within the
    /// pickup radius; unrelated pickups are common.
    pub fn apply_pickup(&mut self, position: &Position) -> Option<SecretFound> {
        let found = self.complete_nearest(position, Completion::Pickup);
        if found.is_some() {
            self.rebuild_snapshot();
        }
        found
    }

    /// A chest was opened or an essence clicked at `block`.
    pub fn record_interaction(&mut self, block: &Position) -> Option<SecretFound> {
        let found = self.complete_nearest(block, Completion::Interaction);
        if found.is_some() {
            self.rebuild_snapshot();
        }
        found
    }

    /// Consume every queued pickup event.
    ///
    /// Pickups by other players (when the local player id is known) and
    /// pickups of entities the world no longer knows are discarded.
    pub fn drain_pickups<L: EntityLocator>(
        &mut self,
        pickups: &Receiver<PickupEvent>,
        locator: &L,
        player_id: Option<i32>,
    ) -> Vec<SecretFound> {
        let mut completed = Vec::new();
        for event in pickups.try_iter() {
            if player_id.is_some_and(|id| id != event.collector_entity_id) {
                continue;
            }
            let Some(position) = locator.entity_position(event.collected_entity_id) else {
                debug!(
                    entity = event.collected_entity_id,
                    "[SECRETS] Pickup of unknown entity ignored"
                );
                continue;
            };
            if let Some(found) = self.complete_nearest(&position, Completion::Pickup) {
                completed.push(found);
            }
        }
        if !completed.is_empty() {
            self.rebuild_snapshot();
        }
        completed
    }

    /// Clear the found flags of the active room.
    pub fn reset_room(&mut self) {
        for secret in &mut self.secrets {
            secret.found = false;
        }
        if let Some(id) = &self.room_id {
            self.visited.remove(id);
            info!(room = %id, "[SECRETS] Room reset");
        }
        self.rebuild_snapshot();
    }

    /// Forget everything (leaving the dungeon).
    pub fn reset_session(&mut self) {
        self.room_id = None;
        self.secrets.clear();
        self.visited.clear();
        self.rebuild_snapshot();
    }

    pub fn found_count(&self) -> usize {
        self.secrets.iter().filter(|s| s.found).count()
    }

    /// Render-ready view of the active room, rebuilt whenever a flag changes
    pub fn snapshot(&self) -> Arc<SecretSnapshot> {
        Arc::clone(&self.snapshot)
    }

    fn complete_nearest(&mut self, at: &Position, completion: Completion) -> Option<SecretFound> {
        let radius = match completion {
            Completion::Pickup => self.settings.pickup_radius,
            Completion::Interaction => self.settings.interact_radius,
        };
        let radius_sq = radius * radius;

        let (index, distance_sq) = self
            .secrets
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.found)
            .filter(|(_, s)| match completion {
                Completion::Pickup => s.kind.completed_by_pickup(),
                Completion::Interaction => s.kind.completed_by_interaction(),
            })
            .map(|(i, s)| (i, s.position.distance_sq(at)))
            .filter(|(_, d)| *d <= radius_sq)
            .min_by(|a, b| a.1.total_cmp(&b.1))?;

        let room_id = self.room_id().to_string();
        let secret = &mut self.secrets[index];
        secret.found = true;
        let found = SecretFound {
            room_id,
            index,
            name: secret.name.clone(),
            kind: secret.kind,
            distance: distance_sq.sqrt(),
        };
        info!(
            room = %found.room_id,
            secret = %found.name,
            kind = ?found.kind,
            distance = found.distance,
            "[SECRETS] Secret found"
        );
        Some(found)
    }

    fn remember_active_room(&mut self) {
        if self.settings.practice_mode {
            return;
        }
        if let Some(id) = &self.room_id {
            let flags = self.secrets.iter().map(|s| s.found).collect();
            self.visited.insert(id.clone(), flags);
        }
    }

    fn rebuild_snapshot(&mut self) {
        let unfound = self
            .secrets
            .iter()
            .filter(|s| !s.found)
            .map(|s| SecretMarker {
                name: s.name.clone(),
                kind: s.kind,
                position: s.position,
            })
            .collect();
        self.snapshot = Arc::new(SecretSnapshot {
            room_id: self.room_id().to_string(),
            unfound,
            found: self.found_count(),
            total: self.secrets.len(),
        });
    }
}

// =============================================================================
// TESTS
// =============================================================================
