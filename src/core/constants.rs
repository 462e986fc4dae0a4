//! Dungeon constants - grid geometry, thresholds, wire ids, timeouts
//!
//! Every numeric default the tracker relies on lives here. Most of them are
//! only defaults: the config file can override detection and matching values.

use std::time::Duration;

// =============================================================================
// ROOM GRID
// =============================================================================

/// Side length of one dungeon grid cell in blocks (31 block room + 1 block gap)
pub const DEFAULT_CELL_SIZE: i32 = 32;

/// World X coordinate of the grid's minimum corner
pub const DEFAULT_GRID_ORIGIN_X: i32 = -200;

/// World Z coordinate of the grid's minimum corner
pub const DEFAULT_GRID_ORIGIN_Z: i32 = -200;

/// Largest cell coordinate a catalog may name (30M block world border in
/// 16 block cells)
pub const MAX_CELL_COORDINATE: i32 = 1_875_000;

/// Sentinel room id reported when no catalogued room is confirmed
pub const UNDEFINED_ROOM: &str = "undefined";

// =============================================================================
// DETECTION / MATCHING
// =============================================================================

/// Consecutive ticks a candidate room must be seen before it is confirmed
pub const DEFAULT_DEBOUNCE_TICKS: u32 = 3;

/// Max distance (blocks) between a picked up item and the secret it completes
pub const DEFAULT_PICKUP_RADIUS: f64 = 6.0;

/// Max distance (blocks) between a clicked block and a chest/essence secret
pub const DEFAULT_INTERACT_RADIUS: f64 = 1.5;

// =============================================================================
// NETWORK
// =============================================================================

/// Clientbound "Collect Item" packet id (protocol 47)
pub const COLLECT_ITEM_PACKET_ID: i32 = 0x0D;

/// A VarInt never spans more than 5 bytes
pub const MAX_VARINT_BYTES: usize = 5;

/// Pipeline stage the pickup observer is inserted in front of
pub const DEFAULT_ANCHOR_STAGE: &str = "packet_handler";

/// Name of the pickup observer stage
pub const OBSERVER_STAGE_NAME: &str = "secret_pickup_observer";

/// Server address fragment that enables packet observation
pub const DEFAULT_SERVER_HOST_PATTERN: &str = "hypixel.";

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Upper bound on how long `block_till_load` waits for the catalog
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Upper bound on any supervised background task
pub const DEFAULT_TASK_TIMEOUT: Duration = Duration::from_secs(20);

/// Delay between the player becoming available and the post-connect hook
pub const DEFAULT_POST_CONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Granularity of cancellable sleeps in background tasks
pub const TASK_POLL_INTERVAL: Duration = Duration::from_millis(50);

// =============================================================================
// MESSAGES
// =============================================================================

/// Soft bound on queued user notifications (oldest dropped first)
pub const DEFAULT_MESSAGE_CAPACITY: usize = 256;
