//! Room catalog loader and load barrier
//!
//! The catalog is parsed once on a background thread. Callers that need it
//! before continuing use `block_till_load`; the per-tick path only ever asks
//! `catalog()`, which never blocks and returns None until the load is done.
//!
//! The load result is published through a [`Readiness`] event, so the catalog
//! is fully built before any thread can see it and is read-only afterwards.

use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::messages::MessageSender;
use super::readiness::Readiness;
use super::tasks::panic_message;
use crate::core::catalog::RoomCatalog;
use crate::core::error::DataLoadError;

/// Catalog compiled into the binary
const BUNDLED_CATALOG: &str = include_str!("../../data/rooms.json");

/// Notification shown once when the catalog cannot be loaded
pub const LOAD_FAILURE_MESSAGE: &str =
    "Room data failed to load, secret waypoints are disabled. See logs for more details.";

pub type LoadResult = Result<Arc<RoomCatalog>, DataLoadError>;

/// Where the catalog text comes from
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogSource {
    /// The catalog bundled in the binary
    Bundled,
    /// A JSON file on disk
    File(PathBuf),
    /// JSON text supplied by the host
    Inline(String),
}

impl CatalogSource {
    fn describe(&self) -> String {
        match self {
            CatalogSource::Bundled => "bundled catalog".to_string(),
            CatalogSource::File(path) => path.display().to_string(),
            CatalogSource::Inline(_) => "inline catalog".to_string(),
        }
    }

    fn read(&self) -> Result<String, DataLoadError> {
        match self {
            CatalogSource::Bundled => Ok(BUNDLED_CATALOG.to_string()),
            CatalogSource::File(path) => {
                fs::read_to_string(path).map_err(|e| DataLoadError::Read {
                    source_name: self.describe(),
                    reason: e.to_string(),
                })
            }
            CatalogSource::Inline(text) => Ok(text.clone()),
        }
    }
}

/// Parse a catalog synchronously, skipping malformed rooms
pub fn load_catalog(source: &CatalogSource) -> LoadResult {
    let started = Instant::now();
    let text = source.read()?;
    let (catalog, skipped) = RoomCatalog::from_json(&text)?;
    if !skipped.is_empty() {
        warn!(
            skipped = skipped.len(),
            source = %source.describe(),
            "[LOADER] Some rooms were skipped"
        );
    }
    info!(
        rooms = catalog.len(),
        source = %source.describe(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "[LOADER] Catalog loaded"
    );
    Ok(Arc::new(catalog))
}

// =============================================================================
// ROOM DATA LOADER
// =============================================================================

pub struct RoomDataLoader {
    source: CatalogSource,
    started: AtomicBool,
    state: Arc<Readiness<LoadResult>>,
    messages: MessageSender,
    timeout: Option<Duration>,
}

impl RoomDataLoader {
    /// `timeout` bounds `block_till_load`; None waits indefinitely.
    pub fn new(source: CatalogSource, messages: MessageSender, timeout: Option<Duration>) -> Self {
        Self {
            source,
            started: AtomicBool::new(false),
            state: Arc::new(Readiness::new()),
            messages,
            timeout,
        }
    }

    pub fn source(&self) -> &CatalogSource {
        &self.source
    }

    /// Start loading on a background thread. Only the first call does
    /// anything; returns whether this call started the load.
    pub fn start_async_load(&self) -> bool {
        let source = self.source.clone();
        self.start_with(move || load_catalog(&source))
    }

    fn start_with<F>(&self, load: F) -> bool
    where
        F: FnOnce() -> LoadResult + Send + 'static,
    {
        if self
            .started
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }

        let state = Arc::clone(&self.state);
        let messages = self.messages.clone();
        info!(source = %self.source.describe(), "[LOADER] Loading catalog");

        let spawned = thread::Builder::new()
            .name("catalog-loader".to_string())
            .spawn(move || {
                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(load));
                let result = match result {
                    Ok(result) => result,
                    Err(payload) => Err(DataLoadError::Panicked(panic_message(payload.as_ref()))),
                };
                publish(&state, result, &messages);
            });

        if let Err(e) = spawned {
            let result = Err(DataLoadError::Read {
                source_name: self.source.describe(),
                reason: format!("could not spawn loader thread: {e}"),
            });
            publish(&self.state, result, &self.messages);
        }
        true
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Whether the load finished, successfully or not
    pub fn is_loaded(&self) -> bool {
        self.state.is_set()
    }

    /// Wait for the load to finish.
    ///
    /// Returns `NotStarted` immediately when `start_async_load` was never
    /// called, and `TimedOut` when the configured bound elapses first. A
    /// timed out load keeps running and later calls can still succeed.
    pub fn block_till_load(&self) -> LoadResult {
        if !self.is_started() {
            return Err(DataLoadError::NotStarted);
        }
        match self.timeout {
            None => self.state.wait(),
            Some(timeout) => self
                .state
                .wait_timeout(timeout)
                .unwrap_or(Err(DataLoadError::TimedOut(timeout))),
        }
    }

    /// The catalog, if it finished loading successfully. Never blocks.
    pub fn catalog(&self) -> Option<Arc<RoomCatalog>> {
        self.state.get().and_then(Result::ok)
    }

    /// The load result, if the load finished. Never blocks.
    pub fn result(&self) -> Option<LoadResult> {
        self.state.get()
    }
}

fn publish(state: &Readiness<LoadResult>, result: LoadResult, messages: &MessageSender) {
    if let Err(e) = &result {
        error!(error = %e, "[LOADER] Catalog load failed");
        messages.error(LOAD_FAILURE_MESSAGE);
    }
    state.set(result);
}
