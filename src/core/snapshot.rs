//! Render snapshots - immutable views of the tracker state for one frame
//!
//! The main thread rebuilds a snapshot after each tick and publishes it as an
//! `Arc`. The renderer only ever reads fully formed snapshots, so it never
//! needs a lock and never observes state halfway through a tick.

use std::sync::Arc;

use super::catalog::SecretKind;
use super::constants::UNDEFINED_ROOM;
use super::dungeon::SessionPhase;
use super::types::Position;

/// One unfound secret to draw
#[derive(Debug, Clone, PartialEq)]
pub struct SecretMarker {
    pub name: String,
    pub kind: SecretKind,
    /// World position
    pub position: Position,
}

/// Secrets of the active room
#[derive(Debug, Clone, PartialEq)]
pub struct SecretSnapshot {
    /// Active room id, or `"undefined"`
    pub room_id: String,
    pub unfound: Vec<SecretMarker>,
    pub found: usize,
    pub total: usize,
}

impl Default for SecretSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl SecretSnapshot {
    /// Snapshot for "no active room"
    pub fn empty() -> Self {
        Self {
            room_id: UNDEFINED_ROOM.to_string(),
            unfound: Vec::new(),
            found: 0,
            total: 0,
        }
    }

    /// True when every secret of the room has been found
    pub fn is_complete(&self) -> bool {
        self.unfound.is_empty()
    }
}

/// Everything the renderer reads once per frame
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSnapshot {
    /// Tick that produced this snapshot
    pub tick: u64,
    pub phase: SessionPhase,
    /// Dungeon floor announced on entry, if known
    pub dungeon_floor: Option<u32>,
    pub floor_index: u32,
    /// Confirmed room id, or `"undefined"`
    pub room_id: String,
    pub secrets: Arc<SecretSnapshot>,
}

impl Default for RenderSnapshot {
    fn default() -> Self {
        Self {
            tick: 0,
            phase: SessionPhase::NotInDungeon,
            dungeon_floor: None,
            floor_index: 0,
            room_id: UNDEFINED_ROOM.to_string(),
            secrets: Arc::new(SecretSnapshot::empty()),
        }
    }
}

impl RenderSnapshot {
    /// Secrets line for a status display, e.g. "R1: 2/5"
    pub fn secrets_label(&self) -> String {
        format!(
            "{}: {}/{}",
            self.secrets.room_id, self.secrets.found, self.secrets.total
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_snapshot_is_empty() {
        let snapshot = RenderSnapshot::default();
        assert_eq!(snapshot.room_id, UNDEFINED_ROOM);
        assert_eq!(snapshot.phase, SessionPhase::NotInDungeon);
        assert!(snapshot.secrets.is_complete());
        assert_eq!(snapshot.secrets_label(), "undefined: 0/0");
    }

    #[test]
    fn test_secrets_label() {
        let snapshot = RenderSnapshot {
            secrets: Arc::new(SecretSnapshot {
                room_id: "R1".to_string(),
                unfound: vec![SecretMarker {
                    name: "bat".to_string(),
                    kind: SecretKind::Other,
                    position: Position::default(),
                }],
                found: 2,
                total: 3,
            }),
            ..RenderSnapshot::default()
        };
        assert_eq!(snapshot.secrets_label(), "R1: 2/3");
        assert!(!snapshot.secrets.is_complete());
    }
}
