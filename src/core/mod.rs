//! Core module - platform-independent detection and tracking logic

pub mod catalog;
pub mod chat;
pub mod constants;
pub mod dungeon;
pub mod error;
pub mod grid;
pub mod packet;
pub mod room_detector;
pub mod secrets;
pub mod snapshot;
pub mod traits;
pub mod types;

pub use catalog::{RoomCatalog, RoomCatalogEntry, SecretDefinition, SecretKind};
pub use chat::classify_chat_line;
pub use dungeon::{DungeonManager, SessionEvent, SessionPhase, SessionSignal};
pub use error::{DataLoadError, PacketDecodeError};
pub use grid::{GridSettings, RoomSignature};
pub use packet::{decode_inbound, PickupEvent};
pub use room_detector::{DetectorSettings, RoomChanged, RoomDetector};
pub use secrets::{SecretFound, SecretTracker, TrackerSettings};
pub use snapshot::{RenderSnapshot, SecretSnapshot};
pub use traits::{EntityLocator, LayoutProbe, PlayerReader, WorldView};
pub use types::{GridCell, PlayerPositionSample, Position};
