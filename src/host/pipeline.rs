//! Inbound packet pipeline and the pickup observer stage
//!
//! The host's network layer runs inbound frames through an ordered list of
//! named stages on its I/O thread. Stages get the frame as `&[u8]`, so an
//! observer cannot alter what later stages see.
//!
//! The pickup observer decodes Collect Item packets and forwards them over a
//! channel. It never touches tracker state: the main thread drains the channel
//! once per tick.

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use crate::core::constants::OBSERVER_STAGE_NAME;
use crate::core::packet::{decode_inbound, PickupEvent};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PipelineError {
    #[error("pipeline stage '{0}' already exists")]
    DuplicateStage(String),
    #[error("pipeline stage '{0}' not found")]
    StageNotFound(String),
}

/// One step of inbound processing
pub trait InboundStage: Send {
    fn on_inbound(&mut self, frame: &[u8]);
}

struct NamedStage {
    name: String,
    stage: Box<dyn InboundStage>,
}

/// Ordered, named inbound stages
#[derive(Default)]
pub struct InboundPipeline {
    stages: Vec<NamedStage>,
}

impl InboundPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Stage names in processing order
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn add_last(
        &mut self,
        name: &str,
        stage: Box<dyn InboundStage>,
    ) -> Result<(), PipelineError> {
        self.check_unique(name)?;
        self.stages.push(NamedStage {
            name: name.to_string(),
            stage,
        });
        Ok(())
    }

    /// Insert a stage immediately before `anchor`
    pub fn add_before(
        &mut self,
        anchor: &str,
        name: &str,
        stage: Box<dyn InboundStage>,
    ) -> Result<(), PipelineError> {
        self.check_unique(name)?;
        let idx = self
            .position(anchor)
            .ok_or_else(|| PipelineError::StageNotFound(anchor.to_string()))?;
        self.stages.insert(
            idx,
            NamedStage {
                name: name.to_string(),
                stage,
            },
        );
        Ok(())
    }

    /// Run a frame through every stage in order
    pub fn dispatch(&mut self, frame: &[u8]) {
        for named in &mut self.stages {
            named.stage.on_inbound(frame);
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.stages.iter().position(|s| s.name == name)
    }

    fn check_unique(&self, name: &str) -> Result<(), PipelineError> {
        if self.contains(name) {
            return Err(PipelineError::DuplicateStage(name.to_string()));
        }
        Ok(())
    }
}

// =============================================================================
// PACKET OBSERVER
// =============================================================================

/// Pipeline stage forwarding item pickups to the main thread
pub struct PacketObserver {
    tx: Sender<PickupEvent>,
}

impl PacketObserver {
    pub fn new(tx: Sender<PickupEvent>) -> Self {
        Self { tx }
    }
}

impl InboundStage for PacketObserver {
    fn on_inbound(&mut self, frame: &[u8]) {
        match decode_inbound(frame) {
            Ok(Some(event)) => {
                // Main side gone means the overlay shut down; nothing to do
                if self.tx.try_send(event).is_err() {
                    debug!("[PACKET] Pickup dropped, receiver unavailable");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "[PACKET] Could not decode inbound packet"),
        }
    }
}

/// Install the pickup observer for a server connection.
///
/// Only servers whose address contains `host_pattern` (case-insensitive) are
/// observed. The observer goes right before `anchor` when that stage exists,
/// otherwise at the end. Returns whether the observer is installed after the
/// call; calling it again is a no-op.
pub fn install_packet_observer(
    pipeline: &mut InboundPipeline,
    server_address: &str,
    host_pattern: &str,
    anchor: &str,
    tx: Sender<PickupEvent>,
) -> Result<bool, PipelineError> {
    if !server_address
        .to_ascii_lowercase()
        .contains(&host_pattern.to_ascii_lowercase())
    {
        debug!(server = %server_address, "[PACKET] Server not observed");
        return Ok(false);
    }
    if pipeline.contains(OBSERVER_STAGE_NAME) {
        return Ok(true);
    }

    let observer = Box::new(PacketObserver::new(tx));
    if pipeline.contains(anchor) {
        pipeline.add_before(anchor, OBSERVER_STAGE_NAME, observer)?;
    } else {
        warn!(anchor = %anchor, "[PACKET] Anchor stage missing, observing last");
        pipeline.add_last(OBSERVER_STAGE_NAME, observer)?;
    }
    info!(server = %server_address, "[PACKET] Pickup observer installed");
    Ok(true)
}
