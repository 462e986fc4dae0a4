//! Dungeon session state machine
//!
//! Tracks whether the player is inside a dungeon instance, which floor
//! section they reached and which room they are in:
//!
//! ```text
//! NotInDungeon -> Lobby -> RunActive -> RunComplete -> NotInDungeon
//!       ^__________|___________|______________|   (disconnect / world change)
//! ```
//!
//! Entry, run start/end and acknowledgement arrive as [`SessionSignal`]s from
//! outside (chat lines, scoreboard, host events). Room changes come from the
//! room detector. Floor and room bookkeeping is advisory (UI only); secret
//! tracking does not depend on it.

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};
use tracing::{debug, info};

use super::constants::UNDEFINED_ROOM;
use super::room_detector::RoomChanged;

// =============================================================================
// PHASES, SIGNALS, EVENTS
// =============================================================================

/// Phase of the dungeon session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    NotInDungeon,
    Lobby,
    RunActive,
    RunComplete,
}

/// Discrete external inputs driving the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionSignal {
    /// The player entered a dungeon instance (floor if known)
    DungeonEntered { floor: Option<u32> },
    /// The run started (explicit start message)
    RunStarted,
    /// The run ended (end-of-run summary)
    RunEnded,
    /// The completed run was acknowledged and can be discarded
    Acknowledged,
    /// Connection to the server was lost
    Disconnected,
    /// The client switched worlds
    WorldChanged,
}

/// Why a session was discarded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Acknowledged,
    Disconnected,
    WorldChanged,
}

/// Transitions reported by the session manager
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A session was created in the lobby (dungeon floor if known)
    Entered { floor: Option<u32> },
    /// The run became active
    RunStarted,
    /// The player entered a new room during the run
    RoomEntered { room: String },
    /// The player reached a higher floor section
    FloorAdvanced { floor: u32 },
    /// The run ended
    RunCompleted { elapsed: Duration },
    /// The session was discarded
    Ended { reason: EndReason },
}

// =============================================================================
// DUNGEON SESSION
// =============================================================================

/// State of one dungeon instance. Exists only while the phase is not
/// `NotInDungeon`.
#[derive(Debug, Clone, PartialEq)]
pub struct DungeonSession {
    pub phase: SessionPhase,
    /// Dungeon floor announced on entry (Entrance = 0, Floor VII = 7)
    pub dungeon_floor: Option<u32>,
    /// Highest catalog floor section reached during the run
    pub floor_index: u32,
    pub current_room_id: String,
    pub started_at: DateTime<Local>,
    run_started: Option<Instant>,
    run_elapsed: Option<Duration>,
}

impl DungeonSession {
    fn new(dungeon_floor: Option<u32>) -> Self {
        Self {
            phase: SessionPhase::Lobby,
            dungeon_floor,
            floor_index: 0,
            current_room_id: UNDEFINED_ROOM.to_string(),
            started_at: Local::now(),
            run_started: None,
            run_elapsed: None,
        }
    }

    /// Time spent in the run so far (frozen once the run completes)
    pub fn run_elapsed(&self) -> Option<Duration> {
        self.run_elapsed
            .or_else(|| self.run_started.map(|start| start.elapsed()))
    }

    fn start_run(&mut self) {
        self.phase = SessionPhase::RunActive;
        self.run_started = Some(Instant::now());
    }
}

// =============================================================================
// DUNGEON MANAGER
// =============================================================================

/// Owns the optional dungeon session and applies transitions to it.
#[derive(Debug, Default)]
pub struct DungeonManager {
    session: Option<DungeonSession>,
}

impl DungeonManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(&self) -> Option<&DungeonSession> {
        self.session.as_ref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.session
            .as_ref()
            .map(|s| s.phase)
            .unwrap_or(SessionPhase::NotInDungeon)
    }

    pub fn floor_index(&self) -> u32 {
        self.session.as_ref().map(|s| s.floor_index).unwrap_or(0)
    }

    pub fn dungeon_floor(&self) -> Option<u32> {
        self.session.as_ref().and_then(|s| s.dungeon_floor)
    }

    pub fn current_room_id(&self) -> &str {
        self.session
            .as_ref()
            .map(|s| s.current_room_id.as_str())
            .unwrap_or(UNDEFINED_ROOM)
    }

    pub fn in_dungeon(&self) -> bool {
        self.session.is_some()
    }

    /// Apply an external signal. Signals that make no sense in the current
    /// phase are ignored.
    pub fn handle_signal(&mut self, signal: SessionSignal) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        match signal {
            SessionSignal::Disconnected | SessionSignal::WorldChanged => {
                let reason = if signal == SessionSignal::Disconnected {
                    EndReason::Disconnected
                } else {
                    EndReason::WorldChanged
                };
                if self.session.take().is_some() {
                    info!(reason = ?reason, "[SESSION] Session discarded");
                    events.push(SessionEvent::Ended { reason });
                }
            }
            SessionSignal::DungeonEntered { floor } => {
                if self.session.is_none() {
                    self.session = Some(DungeonSession::new(floor));
                    info!(floor = ?floor, "[SESSION] Entered dungeon");
                    events.push(SessionEvent::Entered { floor });
                } else {
                    debug!(phase = ?self.phase(), "[SESSION] Entry signal while already in dungeon");
                }
            }
            SessionSignal::RunStarted => {
                if let Some(session) = self.session.as_mut().filter(|s| s.phase == SessionPhase::Lobby) {
                    session.start_run();
                    info!("[SESSION] Run started");
                    events.push(SessionEvent::RunStarted);
                }
            }
            SessionSignal::RunEnded => {
                if let Some(session) = self
                    .session
                    .as_mut()
                    .filter(|s| s.phase == SessionPhase::RunActive)
                {
                    session.phase = SessionPhase::RunComplete;
                    let elapsed = session.run_elapsed().unwrap_or_default();
                    session.run_elapsed = Some(elapsed);
                    info!(elapsed_secs = elapsed.as_secs(), "[SESSION] Run complete");
                    events.push(SessionEvent::RunCompleted { elapsed });
                }
            }
            SessionSignal::Acknowledged => {
                if self.phase() == SessionPhase::RunComplete {
                    self.session = None;
                    info!("[SESSION] Completed run acknowledged");
                    events.push(SessionEvent::Ended {
                        reason: EndReason::Acknowledged,
                    });
                }
            }
        }

        events
    }

    /// Apply a confirmed room change.
    ///
    /// In the lobby the first change into a catalogued room starts the run.
    /// While the run is active the current room is tracked and a room on a
    /// higher floor section advances `floor_index` to that section.
    pub fn on_room_changed(&mut self, change: &RoomChanged) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let Some(session) = self.session.as_mut() else {
            return events;
        };

        if session.phase == SessionPhase::Lobby && !change.is_undefined() {
            session.start_run();
            info!(room = %change.new, "[SESSION] Run started by room change");
            events.push(SessionEvent::RunStarted);
        }

        if session.phase != SessionPhase::RunActive {
            return events;
        }

        session.current_room_id = change.new.clone();
        if let Some(room) = &change.room {
            events.push(SessionEvent::RoomEntered {
                room: room.id.clone(),
            });
            if room.floor > session.floor_index {
                session.floor_index = room.floor;
                info!(floor = room.floor, "[SESSION] Floor advanced");
                events.push(SessionEvent::FloorAdvanced { floor: room.floor });
            }
        }

        events
    }
}

// =============================================================================
// TESTS
// =============================================================================
