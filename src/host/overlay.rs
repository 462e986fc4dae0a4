//! Secret overlay - main orchestrator
//!
//! Owns every piece of tracker state and is driven by the host: one `tick`
//! per client tick, plus discrete calls for chat lines, session signals,
//! hotkeys and server connections. Rendering reads `snapshot()`.
//!
//! Cross-thread traffic goes through exactly three primitives:
//! - the catalog load barrier (loader thread -> everyone)
//! - the pickup channel (network I/O thread -> main thread)
//! - the message queue (any thread -> main thread)

use std::path::Path;
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, info};

use super::config::{Config, ConfigError};
use super::loader::{CatalogSource, LoadResult, RoomDataLoader};
use super::logging::init_logging;
use super::messages::{MessageQueue, MessageSender, Notification};
use super::pipeline::{install_packet_observer, InboundPipeline, PipelineError};
use super::readiness::Readiness;
use super::tasks::{spawn_supervised, TaskContext, TaskError, TaskHandle};
use crate::core::catalog::RoomCatalog;
use crate::core::chat::classify_chat_line;
use crate::core::constants::TASK_POLL_INTERVAL;
use crate::core::dungeon::{DungeonManager, SessionEvent, SessionPhase, SessionSignal};
use crate::core::packet::PickupEvent;
use crate::core::room_detector::{RoomChanged, RoomDetector};
use crate::core::secrets::{SecretFound, SecretTracker};
use crate::core::snapshot::RenderSnapshot;
use crate::core::traits::WorldView;
use crate::core::types::{PlayerPositionSample, Position};

/// Work to run once the player exists after connecting (update check, MOTD)
pub type PostConnectHook = Box<dyn FnOnce(&TaskContext) -> Result<(), TaskError> + Send>;

/// Something that happened during a tick or signal
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    RoomChanged(RoomChanged),
    Session(SessionEvent),
    SecretFound(SecretFound),
}

// =============================================================================
// SECRET OVERLAY
// =============================================================================

pub struct SecretOverlay {
    config: Config,

    // Catalog
    loader: RoomDataLoader,

    // Per-tick state machines
    detector: RoomDetector,
    dungeon: DungeonManager,
    tracker: SecretTracker,

    // Cross-thread handoff
    pickup_tx: Sender<PickupEvent>,
    pickup_rx: Receiver<PickupEvent>,
    messages: MessageQueue,
    player_ready: Arc<Readiness<()>>,

    // Background work
    tasks: Vec<TaskHandle>,

    // Render output
    tick: u64,
    snapshot: Arc<RenderSnapshot>,
}

impl SecretOverlay {
    pub fn new(config: Config, source: CatalogSource) -> Self {
        let messages = MessageQueue::with_capacity(config.message_capacity());
        let loader = RoomDataLoader::new(source, messages.sender(), config.load_timeout());
        let (pickup_tx, pickup_rx) = unbounded();

        info!(
            debounce = config.detection.debounce_ticks,
            pickup_radius = config.secrets.pickup_radius,
            practice_mode = config.secrets.practice_mode,
            "[OVERLAY] Initialized"
        );

        Self {
            detector: RoomDetector::new(config.detector_settings()),
            dungeon: DungeonManager::new(),
            tracker: SecretTracker::new(config.tracker_settings()),
            loader,
            pickup_tx,
            pickup_rx,
            messages,
            player_ready: Arc::new(Readiness::new()),
            tasks: Vec::new(),
            tick: 0,
            snapshot: Arc::new(RenderSnapshot::default()),
            config,
        }
    }

    /// Overlay whose catalog location comes from the config, resolved
    /// against `base_dir`
    pub fn from_config(config: Config, base_dir: &Path) -> Self {
        let source = config
            .catalog_path(base_dir)
            .map(CatalogSource::File)
            .unwrap_or(CatalogSource::Bundled);
        Self::new(config, source)
    }

    /// Host entry point: read `room_secrets.toml` from `base_dir`, set up
    /// logging from it and build the overlay.
    pub fn load(base_dir: &Path) -> Result<Self, ConfigError> {
        let config = Config::load_from_dir(base_dir)?;
        if !init_logging(config.logging.console, config.log_file_path(base_dir)) {
            debug!("[OVERLAY] Logging already initialized by the host");
        }
        Ok(Self::from_config(config, base_dir))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // -------------------------------------------------------------------------
    // Catalog
    // -------------------------------------------------------------------------

    /// Start the background catalog load (idempotent)
    pub fn start(&self) -> bool {
        self.loader.start_async_load()
    }

    /// Wait for the catalog, bounded by the configured load timeout
    pub fn block_till_load(&self) -> LoadResult {
        self.loader.block_till_load()
    }

    pub fn catalog(&self) -> Option<Arc<RoomCatalog>> {
        self.loader.catalog()
    }

    // -------------------------------------------------------------------------
    // Tick
    // -------------------------------------------------------------------------

    /// Run one client tick.
    ///
    /// Order: player readiness, room detection (inside a dungeon only),
    /// room-change fan-out, pickup drain, snapshot rebuild.
    pub fn tick<W: WorldView>(&mut self, world: &W) -> Vec<OverlayEvent> {
        self.tick += 1;
        self.tasks.retain(|task| !task.is_finished());
        let mut events = Vec::new();

        let position = world.read_position();
        if position.is_some() && self.player_ready.set(()) {
            debug!(tick = self.tick, "[OVERLAY] Player available");
        }

        // Until the load barrier is released this is None and detection
        // reports "undefined"
        let catalog = self.loader.catalog();

        if let Some(position) = position.filter(|_| self.dungeon.in_dungeon()) {
            let sample = PlayerPositionSample::new(position, self.tick);
            if let Some(change) = self.detector.observe(&sample, catalog.as_deref(), world) {
                let session_events = self.dungeon.on_room_changed(&change);
                self.tracker.on_room_changed(&change, catalog.as_deref());
                events.push(OverlayEvent::RoomChanged(change));
                events.extend(session_events.into_iter().map(OverlayEvent::Session));
            }
        }

        let found = self
            .tracker
            .drain_pickups(&self.pickup_rx, world, world.player_entity_id());
        events.extend(found.into_iter().map(OverlayEvent::SecretFound));

        self.rebuild_snapshot();
        events
    }

    // -------------------------------------------------------------------------
    // External signals
    // -------------------------------------------------------------------------

    /// Apply a session signal (entry, run start/end, disconnect, ...)
    pub fn handle_signal(&mut self, signal: SessionSignal) -> Vec<OverlayEvent> {
        let session_events = self.dungeon.handle_signal(signal);

        let left_dungeon = session_events
            .iter()
            .any(|e| matches!(e, SessionEvent::Ended { .. }));
        let lost_world = matches!(
            signal,
            SessionSignal::Disconnected | SessionSignal::WorldChanged
        );
        if left_dungeon || lost_world {
            self.leave_dungeon();
        }
        if signal == SessionSignal::Disconnected {
            // The next connection gets a new player entity
            self.player_ready = Arc::new(Readiness::new());
        }

        self.rebuild_snapshot();
        session_events.into_iter().map(OverlayEvent::Session).collect()
    }

    /// Classify a chat line and apply the signal it carries, if any
    pub fn handle_chat_line(&mut self, line: &str) -> Vec<OverlayEvent> {
        match classify_chat_line(line) {
            Some(signal) => {
                debug!(signal = ?signal, "[OVERLAY] Chat signal");
                self.handle_signal(signal)
            }
            None => Vec::new(),
        }
    }

    pub fn set_practice_mode(&mut self, enabled: bool) {
        self.tracker.set_practice_mode(enabled);
        self.rebuild_snapshot();
    }

    pub fn practice_mode(&self) -> bool {
        self.tracker.practice_mode()
    }

    /// Practice reset hotkey: clear the active room's found flags
    pub fn reset_room(&mut self) {
        self.tracker.reset_room();
        self.rebuild_snapshot();
    }

    /// A chest was opened or an essence clicked at `block`
    pub fn record_interaction(&mut self, block: &Position) -> Option<SecretFound> {
        let found = self.tracker.record_interaction(block);
        if found.is_some() {
            self.rebuild_snapshot();
        }
        found
    }

    // -------------------------------------------------------------------------
    // Connection
    // -------------------------------------------------------------------------

    /// Called once the client connected to a server.
    ///
    /// Installs the pickup observer into `pipeline` when the server matches
    /// the configured pattern, then schedules `hook` to run once the player
    /// exists plus the configured delay. Returns whether the server is
    /// observed.
    pub fn on_server_connect(
        &mut self,
        pipeline: &mut InboundPipeline,
        server_address: &str,
        hook: Option<PostConnectHook>,
    ) -> Result<bool, PipelineError> {
        let observed = install_packet_observer(
            pipeline,
            server_address,
            &self.config.network.server_host_pattern,
            &self.config.network.anchor_stage,
            self.pickup_tx.clone(),
        )?;
        if !observed {
            return Ok(false);
        }

        if let Some(hook) = hook {
            let ready = Arc::clone(&self.player_ready);
            let delay = self.config.post_connect_delay();
            let task = spawn_supervised(
                "post-connect",
                self.config.task_timeout(),
                self.messages.sender(),
                move |ctx| {
                    ctx.wait_ready(&*ready)?;
                    ctx.sleep(delay)?;
                    hook(ctx)
                },
            );
            self.tasks.push(task);
        }
        Ok(true)
    }

    /// Sender for the host's own network stage, if it decodes pickups itself
    pub fn pickup_sender(&self) -> Sender<PickupEvent> {
        self.pickup_tx.clone()
    }

    // -------------------------------------------------------------------------
    // Messages
    // -------------------------------------------------------------------------

    pub fn message_sender(&self) -> MessageSender {
        self.messages.sender()
    }

    /// Deliver queued notifications to the player. Main thread only.
    pub fn flush_messages<F: FnMut(Notification)>(&self, deliver: F) -> usize {
        self.messages.flush(deliver)
    }

    // -------------------------------------------------------------------------
    // Render output
    // -------------------------------------------------------------------------

    /// Latest immutable snapshot for the renderer
    pub fn snapshot(&self) -> Arc<RenderSnapshot> {
        Arc::clone(&self.snapshot)
    }

    pub fn phase(&self) -> SessionPhase {
        self.dungeon.phase()
    }

    pub fn current_room(&self) -> &str {
        self.detector.current_room()
    }

    /// Cancel background tasks and wait briefly for them to stop
    pub fn shutdown(&mut self) {
        let tasks = std::mem::take(&mut self.tasks);
        if !tasks.is_empty() {
            info!(tasks = tasks.len(), "[OVERLAY] Shutting down background tasks");
        }
        for task in &tasks {
            task.cancel();
        }
        for task in tasks {
            task.shutdown(TASK_POLL_INTERVAL * 4);
        }
    }

    fn leave_dungeon(&mut self) {
        self.detector.reset();
        self.tracker.reset_session();
        let discarded = self.pickup_rx.try_iter().count();
        if discarded > 0 {
            debug!(discarded, "[OVERLAY] Discarded queued pickups");
        }
    }

    fn rebuild_snapshot(&mut self) {
        self.snapshot = Arc::new(RenderSnapshot {
            tick: self.tick,
            phase: self.dungeon.phase(),
            dungeon_floor: self.dungeon.dungeon_floor(),
            floor_index: self.dungeon.floor_index(),
            room_id: self.detector.current_room().to_string(),
            secrets: self.tracker.snapshot(),
        });
    }
}

impl Drop for SecretOverlay {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// TESTS
// =============================================================================
