//! Room catalog - immutable room and secret definitions
//!
//! The catalog is a JSON object keyed by room id (or cell signature). Each
//! value is either a plain array of secrets or a room object carrying the
//! secrets together with the grid cells / layout fingerprints that identify
//! the room:
//!
//! ```json
//! {
//!   "Cell Room": [ { "x": 10, "y": 64, "z": 5, "kind": "item" } ],
//!   "Grand Hall": {
//!     "floor": 1,
//!     "cells": [[2, 3], [3, 3]],
//!     "cores": [-1254782315],
//!     "secrets": [ { "secretName": "1 - Chest", "category": "chest", "x": 4, "y": 70, "z": 12, "frame": "room" } ]
//!   }
//! }
//! ```
//!
//! Malformed rooms are skipped one at a time; a bad entry never aborts the load.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::constants::MAX_CELL_COORDINATE;
use super::error::DataLoadError;
use super::grid::RoomSignature;
use super::types::{GridCell, Position};

// =============================================================================
// SECRET DEFINITIONS
// =============================================================================

/// What kind of secret a catalog entry describes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum SecretKind {
    /// Item lying on the ground, completed by picking it up
    Item,
    /// Chest, completed by opening it
    Chest,
    /// Wither essence skull, completed by clicking it
    Essence,
    /// Anything else (bats, levers, ...)
    #[default]
    Other,
}

impl SecretKind {
    /// Whether an item pickup can complete this kind of secret
    pub fn completed_by_pickup(self) -> bool {
        matches!(self, SecretKind::Item | SecretKind::Other)
    }

    /// Whether a block interaction can complete this kind of secret
    pub fn completed_by_interaction(self) -> bool {
        matches!(self, SecretKind::Chest | SecretKind::Essence)
    }
}

impl From<String> for SecretKind {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "item" => SecretKind::Item,
            "chest" => SecretKind::Chest,
            "essence" | "wither" => SecretKind::Essence,
            _ => SecretKind::Other,
        }
    }
}

/// Coordinate frame a secret position is expressed in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateFrame {
    /// Absolute world coordinates
    #[default]
    World,
    /// Relative to the room's minimum grid corner
    Room,
}

/// One secret as stored in the catalog (no found state)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretDefinition {
    #[serde(default, alias = "secretName")]
    pub name: String,
    #[serde(default, alias = "category")]
    pub kind: SecretKind,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default)]
    pub frame: CoordinateFrame,
}

impl SecretDefinition {
    /// Position as written in the catalog
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y, self.z)
    }

    /// World position, given the room origin used for room-local secrets
    pub fn world_position(&self, origin: &Position) -> Position {
        match self.frame {
            CoordinateFrame::World => self.position(),
            CoordinateFrame::Room => self.position().offset(origin),
        }
    }
}

// =============================================================================
// CATALOG ENTRIES
// =============================================================================

/// Room object form of a catalog value
#[derive(Debug, Deserialize)]
struct RoomObject {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    floor: u32,
    #[serde(default)]
    cells: Vec<[i32; 2]>,
    #[serde(default)]
    cores: Vec<i64>,
    #[serde(default)]
    secrets: Vec<SecretDefinition>,
}

/// An immutable catalogued room
#[derive(Debug, Clone, PartialEq)]
pub struct RoomCatalogEntry {
    /// Room id (the catalog key)
    pub id: String,
    /// Display name, defaults to the id
    pub name: String,
    /// Floor section the room belongs to
    pub floor: u32,
    /// Grid cells the room occupies (may be empty)
    pub cells: Vec<GridCell>,
    /// Layout fingerprints identifying the room (may be empty)
    pub cores: Vec<i64>,
    pub secrets: Vec<SecretDefinition>,
}

impl RoomCatalogEntry {
    /// The room's anchor cell: the lowest catalogued cell, if any
    pub fn anchor_cell(&self) -> Option<GridCell> {
        self.cells.iter().min().copied()
    }

    fn parse(id: String, value: Value) -> Result<Self, String> {
        match value {
            Value::Array(_) => {
                let secrets: Vec<SecretDefinition> =
                    serde_json::from_value(value).map_err(|e| e.to_string())?;
                Ok(Self {
                    name: id.clone(),
                    id,
                    floor: 0,
                    cells: Vec::new(),
                    cores: Vec::new(),
                    secrets,
                })
            }
            Value::Object(_) => {
                let room: RoomObject = serde_json::from_value(value).map_err(|e| e.to_string())?;
                let in_world = |v: &i32| (-MAX_CELL_COORDINATE..=MAX_CELL_COORDINATE).contains(v);
                if let Some([x, z]) = room.cells.iter().find(|[x, z]| !in_world(x) || !in_world(z)) {
                    return Err(format!("cell [{x}, {z}] is outside the world"));
                }
                Ok(Self {
                    name: room.name.unwrap_or_else(|| id.clone()),
                    id,
                    floor: room.floor,
                    cells: room
                        .cells
                        .into_iter()
                        .map(|[x, z]| GridCell::new(x, z))
                        .collect(),
                    cores: room.cores,
                    secrets: room.secrets,
                })
            }
            other => Err(format!("expected array or object, found {}", json_type(&other))),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A catalog entry dropped during load
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedEntry {
    pub key: String,
    pub reason: String,
}

// =============================================================================
// ROOM CATALOG
// =============================================================================

/// Immutable room-signature to room mapping.
///
/// Built once by the loader and shared behind an `Arc`; nothing mutates it
/// after construction, so any thread may read it freely.
#[derive(Debug, Default)]
pub struct RoomCatalog {
    rooms: HashMap<String, RoomCatalogEntry>,
    by_cell: HashMap<GridCell, String>,
    by_core: HashMap<i64, String>,
}

impl RoomCatalog {
    /// Parse a catalog from JSON text.
    ///
    /// Fails only when the document itself is unusable. Individual malformed
    /// rooms are returned in the skipped list.
    pub fn from_json(text: &str) -> Result<(Self, Vec<SkippedEntry>), DataLoadError> {
        let root: Value =
            serde_json::from_str(text).map_err(|e| DataLoadError::Parse(e.to_string()))?;
        let Value::Object(map) = root else {
            return Err(DataLoadError::NotAnObject);
        };

        let mut skipped = Vec::new();
        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            match RoomCatalogEntry::parse(key.clone(), value) {
                Ok(entry) => entries.push(entry),
                Err(reason) => {
                    warn!(room = %key, reason = %reason, "[CATALOG] Skipping malformed room");
                    skipped.push(SkippedEntry { key, reason });
                }
            }
        }

        let (catalog, conflicts) = Self::from_entries(entries);
        skipped.extend(conflicts);
        Ok((catalog, skipped))
    }

    /// Build a catalog from already parsed entries.
    ///
    /// Entries are indexed in the order given. A duplicate id is skipped;
    /// a cell or fingerprint already claimed by an earlier room stays with
    /// that room.
    pub fn from_entries(entries: impl IntoIterator<Item = RoomCatalogEntry>) -> (Self, Vec<SkippedEntry>) {
        let mut catalog = Self::default();
        let mut skipped = Vec::new();

        for entry in entries {
            if catalog.rooms.contains_key(&entry.id) {
                skipped.push(SkippedEntry {
                    key: entry.id,
                    reason: "duplicate room id".to_string(),
                });
                continue;
            }
            for cell in &entry.cells {
                if let Some(owner) = catalog.by_cell.get(cell) {
                    warn!(room = %entry.id, owner = %owner, cell = ?cell, "[CATALOG] Cell already claimed");
                } else {
                    catalog.by_cell.insert(*cell, entry.id.clone());
                }
            }
            for &fingerprint in &entry.cores {
                if let Some(owner) = catalog.by_core.get(&fingerprint) {
                    warn!(room = %entry.id, owner = %owner, fingerprint, "[CATALOG] Fingerprint already claimed");
                } else {
                    catalog.by_core.insert(fingerprint, entry.id.clone());
                }
            }
            catalog.rooms.insert(entry.id.clone(), entry);
        }

        debug!(
            rooms = catalog.rooms.len(),
            cells = catalog.by_cell.len(),
            cores = catalog.by_core.len(),
            "[CATALOG] Indexed"
        );
        (catalog, skipped)
    }

    /// Look up a room by id
    pub fn get(&self, id: &str) -> Option<&RoomCatalogEntry> {
        self.rooms.get(id)
    }

    /// Resolve a live signature to a catalogued room.
    ///
    /// Order: layout fingerprint, then the cell signature as a direct key,
    /// then the cell index.
    pub fn resolve(&self, signature: &RoomSignature) -> Option<&RoomCatalogEntry> {
        if let Some(room) = signature
            .core
            .and_then(|fingerprint| self.by_core.get(&fingerprint))
            .and_then(|id| self.rooms.get(id))
        {
            return Some(room);
        }
        if let Some(room) = self.rooms.get(&signature.key()) {
            return Some(room);
        }
        self.by_cell
            .get(&signature.cell)
            .and_then(|id| self.rooms.get(id))
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// All room ids, sorted
    pub fn room_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.rooms.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "R1": [ { "x": 10, "y": 64, "z": 5, "kind": "item" } ],
        "Grand Hall": {
            "name": "Grand Hall",
            "floor": 2,
            "cells": [[3, 3], [2, 3]],
            "cores": [-1254782315],
            "secrets": [
                { "secretName": "1 - Chest", "category": "chest", "x": 4, "y": 70, "z": 12, "frame": "room" },
                { "secretName": "2 - Wither", "category": "wither", "x": 20, "y": 72, "z": 8, "frame": "room" }
            ]
        },
        "cell:5,5": { "secrets": [ { "x": -30, "y": 80, "z": -30, "kind": "bat" } ] },
        "Broken": 42,
        "Half Broken": [ { "x": 1, "y": 2 } ]
    }"#;

    fn sample() -> (RoomCatalog, Vec<SkippedEntry>) {
        RoomCatalog::from_json(SAMPLE).unwrap()
    }

    // -------------------------------------------------------------------------
    // Parsing
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_array_and_object_entries() {
        let (catalog, _) = sample();
        assert_eq!(catalog.len(), 3);

        let r1 = catalog.get("R1").unwrap();
        assert_eq!(r1.name, "R1");
        assert_eq!(r1.secrets.len(), 1);
        assert_eq!(r1.secrets[0].kind, SecretKind::Item);
        assert_eq!(r1.secrets[0].position(), Position::new(10.0, 64.0, 5.0));

        let hall = catalog.get("Grand Hall").unwrap();
        assert_eq!(hall.floor, 2);
        assert_eq!(hall.secrets[0].name, "1 - Chest");
        assert_eq!(hall.secrets[0].kind, SecretKind::Chest);
        assert_eq!(hall.secrets[1].kind, SecretKind::Essence);
        assert_eq!(hall.secrets[0].frame, CoordinateFrame::Room);
    }

    #[test]
    fn test_malformed_entries_skipped_individually() {
        let (catalog, skipped) = sample();
        let mut keys: Vec<&str> = skipped.iter().map(|s| s.key.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["Broken", "Half Broken"]);
        assert!(catalog.get("Broken").is_none());
        assert!(catalog.get("Half Broken").is_none());
        assert!(catalog.get("R1").is_some());
    }

    #[test]
    fn test_out_of_world_cell_skips_room() {
        let (catalog, skipped) = RoomCatalog::from_json(
            r#"{
                "Far": { "cells": [[100000000, 0]], "cores": [5] },
                "Edge": { "cells": [[-2147483648, 0]] },
                "Near": { "cells": [[6, 6]] }
            }"#,
        )
        .unwrap();
        let mut keys: Vec<&str> = skipped.iter().map(|s| s.key.as_str()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["Edge", "Far"]);
        assert_eq!(catalog.room_ids(), vec!["Near"]);
        let sig = RoomSignature::new(GridCell::new(6, 6), Some(5));
        assert_eq!(catalog.resolve(&sig).map(|r| r.id.as_str()), Some("Near"));
    }

    #[test]
    fn test_unknown_kind_is_other() {
        let (catalog, _) = sample();
        let room = catalog.get("cell:5,5").unwrap();
        assert_eq!(room.secrets[0].kind, SecretKind::Other);
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            RoomCatalog::from_json("not json"),
            Err(DataLoadError::Parse(_))
        ));
        assert!(matches!(
            RoomCatalog::from_json("[1, 2, 3]"),
            Err(DataLoadError::NotAnObject)
        ));
    }

    #[test]
    fn test_empty_catalog() {
        let (catalog, skipped) = RoomCatalog::from_json("{}").unwrap();
        assert!(catalog.is_empty());
        assert!(skipped.is_empty());
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    #[test]
    fn test_resolve_by_core_first() {
        let (catalog, _) = sample();
        // Cell 5,5 is a direct key, but the fingerprint wins
        let sig = RoomSignature::new(GridCell::new(5, 5), Some(-1254782315));
        assert_eq!(catalog.resolve(&sig).unwrap().id, "Grand Hall");
    }

    #[test]
    fn test_resolve_by_direct_key() {
        let (catalog, _) = sample();
        let sig = RoomSignature::new(GridCell::new(5, 5), None);
        assert_eq!(catalog.resolve(&sig).unwrap().id, "cell:5,5");
    }

    #[test]
    fn test_resolve_by_cell_index() {
        let (catalog, _) = sample();
        let sig = RoomSignature::new(GridCell::new(2, 3), Some(999));
        assert_eq!(catalog.resolve(&sig).unwrap().id, "Grand Hall");
    }

    #[test]
    fn test_resolve_unknown() {
        let (catalog, _) = sample();
        let sig = RoomSignature::new(GridCell::new(0, 0), None);
        assert!(catalog.resolve(&sig).is_none());
    }

    #[test]
    fn test_anchor_cell_is_lowest() {
        let (catalog, _) = sample();
        let hall = catalog.get("Grand Hall").unwrap();
        assert_eq!(hall.anchor_cell(), Some(GridCell::new(2, 3)));
        assert_eq!(catalog.get("R1").unwrap().anchor_cell(), None);
    }

    #[test]
    fn test_reload_is_idempotent() {
        let (a, _) = sample();
        let (b, _) = sample();
        for (x, z) in [(0, 0), (2, 3), (3, 3), (5, 5), (9, 9)] {
            let sig = RoomSignature::new(GridCell::new(x, z), None);
            assert_eq!(
                a.resolve(&sig).map(|r| r.id.clone()),
                b.resolve(&sig).map(|r| r.id.clone())
            );
        }
        assert_eq!(a.room_ids(), b.room_ids());
    }

    #[test]
    fn test_conflicting_cell_keeps_first() {
        let (catalog, _) = RoomCatalog::from_json(
            r#"{
                "A": { "cells": [[1, 1]] },
                "B": { "cells": [[1, 1], [1, 2]] }
            }"#,
        )
        .unwrap();
        let sig = |x, z| RoomSignature::new(GridCell::new(x, z), None);
        assert_eq!(catalog.resolve(&sig(1, 1)).unwrap().id, "A");
        assert_eq!(catalog.resolve(&sig(1, 2)).unwrap().id, "B");
    }

    #[test]
    fn test_duplicate_id_skipped() {
        let entry = RoomCatalogEntry {
            id: "A".to_string(),
            name: "A".to_string(),
            floor: 0,
            cells: Vec::new(),
            cores: Vec::new(),
            secrets: Vec::new(),
        };
        let (catalog, skipped) = RoomCatalog::from_entries(vec![entry.clone(), entry]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].reason, "duplicate room id");
    }

    // -------------------------------------------------------------------------
    // Secret positions
    // -------------------------------------------------------------------------

    #[test]
    fn test_world_position_room_frame() {
        let (catalog, _) = sample();
        let chest = &catalog.get("Grand Hall").unwrap().secrets[0];
        let origin = Position::new(-136.0, 0.0, -104.0);
        assert_eq!(chest.world_position(&origin), Position::new(-132.0, 70.0, -92.0));
    }

    #[test]
    fn test_world_position_world_frame_ignores_origin() {
        let (catalog, _) = sample();
        let item = &catalog.get("R1").unwrap().secrets[0];
        let origin = Position::new(-136.0, 0.0, -104.0);
        assert_eq!(item.world_position(&origin), item.position());
    }

    #[test]
    fn test_kind_completion_rules() {
        assert!(SecretKind::Item.completed_by_pickup());
        assert!(SecretKind::Other.completed_by_pickup());
        assert!(!SecretKind::Chest.completed_by_pickup());
        assert!(SecretKind::Chest.completed_by_interaction());
        assert!(SecretKind::Essence.completed_by_interaction());
        assert!(!SecretKind::Item.completed_by_interaction());
    }
}
