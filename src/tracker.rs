//! # Tracker
//!
//! Host-facing bundle of a [`SessionController`] with host-driven sources,
//! a history paginator, and a global singleton for FFI callers.
//!
//! The host owns the real GPS watch and interval timer. It pushes fixes,
//! ticks and errors in through [`Tracker`]; the tracker tags them with the
//! live subscription so anything arriving after pause/stop is dropped.

use std::sync::Mutex;

use log::info;
use once_cell::sync::Lazy;

use crate::{
    CompletedSession, HistoryPaginator, HistoryStore, HostConnectivity, HostPositionSource,
    HostTimer, KeyValueStore, MemoryStore, Metrics, NetworkInfo, PaginationConfig, Position,
    Result, SessionController, StreamErrorKind, Timestamp, TrackerConfig,
};
use crate::now_millis;

/// Session controller wired to host-driven capabilities.
pub struct Tracker {
    controller: SessionController,
    source: HostPositionSource,
    timer: HostTimer,
    connectivity: HostConnectivity,
    paginator: HistoryPaginator,
}

impl Tracker {
    /// Create a tracker over `store`, loading any saved history.
    pub fn new(
        config: TrackerConfig,
        pagination: PaginationConfig,
        store: Box<dyn KeyValueStore>,
    ) -> Self {
        let source = HostPositionSource::new();
        let timer = HostTimer::new();
        // Hosts report the real state right after init
        let connectivity = HostConnectivity::online();
        let history = HistoryStore::open(store);

        let paginator = HistoryPaginator::new(pagination);
        paginator.initialize_from(&history);

        let controller = SessionController::new(
            config,
            Box::new(source.clone()),
            Box::new(timer.clone()),
            Box::new(connectivity.clone()),
            history,
        );

        Self {
            controller,
            source,
            timer,
            connectivity,
            paginator,
        }
    }

    /// Tracker with default configuration and volatile history.
    pub fn in_memory() -> Self {
        Self::new(
            TrackerConfig::default(),
            PaginationConfig::default(),
            Box::new(MemoryStore::new()),
        )
    }

    /// Tracker with history persisted in the SQLite database at `db_path`.
    #[cfg(feature = "persistence")]
    pub fn with_sqlite(db_path: &str) -> Result<Self> {
        let store = crate::SqliteStore::new(db_path)?;
        Ok(Self::new(
            TrackerConfig::default(),
            PaginationConfig::default(),
            Box::new(store),
        ))
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    pub fn start(&mut self, now: Timestamp) -> Result<()> {
        self.controller.start(now)
    }

    pub fn pause(&mut self, now: Timestamp) {
        self.controller.pause(now)
    }

    pub fn resume(&mut self, now: Timestamp) -> Result<()> {
        self.controller.resume(now)
    }

    pub fn stop(&mut self, now: Timestamp) -> Option<CompletedSession> {
        let committed = self.controller.stop(now);
        if committed.is_some() {
            self.paginator.initialize_from(self.controller.history());
        }
        committed
    }

    // ========================================================================
    // Host Events
    // ========================================================================

    /// Deliver a fix from the host's position watch.
    pub fn push_position(&mut self, position: Position) -> Option<Metrics> {
        let sub = self.source.active_subscription()?;
        self.controller.handle_position(sub, position)
    }

    /// Deliver a fix the host did not timestamp, stamped with the wall clock.
    pub fn push_position_now(&mut self, latitude: f64, longitude: f64) -> Option<Metrics> {
        self.push_position(Position::new(latitude, longitude, now_millis()))
    }

    /// Deliver a tick from the host's interval timer.
    pub fn push_tick(&mut self, now: Timestamp) -> Option<Metrics> {
        let sub = self.timer.active_subscription()?;
        self.controller.handle_tick(sub, now)
    }

    /// Deliver a position-watch failure.
    pub fn push_stream_error(&mut self, kind: StreamErrorKind) -> Result<()> {
        match self.source.active_subscription() {
            Some(sub) => self.controller.handle_stream_error(sub, kind),
            None => Ok(()),
        }
    }

    pub fn set_position_available(&self, available: bool) {
        self.source.set_available(available);
    }

    pub fn set_online(&self, online: bool) {
        self.connectivity.set_online(online);
    }

    pub fn set_network_info(&self, info: Option<NetworkInfo>) {
        self.connectivity.set_network_info(info);
    }

    // ========================================================================
    // History
    // ========================================================================

    pub fn clear_history(&mut self) {
        self.controller.history_mut().clear();
        self.paginator.initialize(0);
    }

    pub fn remove_route(&mut self, id: &str) -> Result<bool> {
        let removed = self.controller.history_mut().remove(id)?;
        if removed {
            self.paginator.initialize_from(self.controller.history());
        }
        Ok(removed)
    }

    /// Sessions revealed so far by the paginator.
    pub fn visible_history(&self) -> &[CompletedSession] {
        self.paginator.visible(self.controller.history().sessions())
    }

    /// Handle onto the paginator; await `request_more` on it without holding the tracker.
    pub fn paginator(&self) -> HistoryPaginator {
        self.paginator.clone()
    }

    pub fn controller(&self) -> &SessionController {
        &self.controller
    }

    pub fn history(&self) -> &HistoryStore {
        self.controller.history()
    }
}

// ============================================================================
// Global Singleton
// ============================================================================

/// Global tracker instance for FFI callers.
///
/// `None` until the host initializes it.
pub static TRACKER: Lazy<Mutex<Option<Tracker>>> = Lazy::new(|| Mutex::new(None));

/// Install `tracker` as the global instance, replacing any previous one.
pub fn install_tracker(tracker: Tracker) {
    let mut guard = TRACKER.lock().unwrap_or_else(|e| e.into_inner());
    *guard = Some(tracker);
    info!("[Tracker] Installed");
}

/// Run `f` against the global tracker. Returns `None` if not initialized.
pub fn with_tracker<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut Tracker) -> R,
{
    let mut guard = TRACKER.lock().unwrap_or_else(|e| e.into_inner());
    guard.as_mut().map(f)
}
