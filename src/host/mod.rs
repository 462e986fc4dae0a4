//! Host glue - threads, configuration and the overlay context
//!
//! Everything here runs inside the host client. The per-tick logic lives in
//! `core`; this module wires it to threads, channels and files.

pub mod config;
pub mod loader;
pub mod logging;
pub mod messages;
pub mod overlay;
pub mod pipeline;
pub mod readiness;
pub mod tasks;

pub use config::{Config, ConfigError};
pub use loader::{CatalogSource, RoomDataLoader};
pub use logging::init_logging;
pub use messages::{MessageQueue, MessageSender, Notification};
pub use overlay::{OverlayEvent, PostConnectHook, SecretOverlay};
pub use pipeline::{install_packet_observer, InboundPipeline, InboundStage, PacketObserver, PipelineError};
pub use readiness::Readiness;
pub use tasks::{spawn_supervised, TaskContext, TaskError, TaskHandle};
