//! FFI bindings for mobile platforms (iOS/Android).
//!
//! This module provides the UniFFI bindings that expose the global tracker
//! to Kotlin and Swift. The host owns the platform GPS watch and interval
//! timer and forwards their callbacks through the `tracker_push_*` functions.
//! Collections cross the boundary as JSON strings.

use log::{info, warn};

use crate::tracker::{install_tracker, with_tracker, Tracker};
use crate::{init_logging, Metrics, NetworkInfo, Position, StreamErrorKind, TrackingState};

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the tracker (call once at app startup).
///
/// With the `persistence` feature, history is stored in the SQLite database at
/// `db_path`; otherwise `db_path` is ignored and history lives in memory.
#[uniffi::export]
pub fn tracker_init(db_path: String) -> bool {
    init_logging();
    info!("[Tracker] Initializing with db: {}", db_path);

    #[cfg(feature = "persistence")]
    let tracker = match Tracker::with_sqlite(&db_path) {
        Ok(tracker) => tracker,
        Err(e) => {
            warn!("[Tracker] Failed to open history database: {}", e);
            return false;
        }
    };

    #[cfg(not(feature = "persistence"))]
    let tracker = Tracker::in_memory();

    if let Some(w) = tracker.history().warning() {
        warn!("[Tracker] Starting with empty history: {}", w);
    }
    install_tracker(tracker);
    true
}

/// Check if the tracker is initialized.
#[uniffi::export]
pub fn tracker_is_initialized() -> bool {
    with_tracker(|_| ()).is_some()
}

// ============================================================================
// Lifecycle
// ============================================================================

/// Start tracking. Returns an error message, or `None` on success.
#[uniffi::export]
pub fn tracker_start(now_ms: i64) -> Option<String> {
    with_tracker(|t| t.start(now_ms).err().map(|e| e.to_string()))
        .unwrap_or_else(|| Some("Tracker not initialized".to_string()))
}

#[uniffi::export]
pub fn tracker_pause(now_ms: i64) {
    with_tracker(|t| t.pause(now_ms));
}

/// Resume a paused session. Returns an error message, or `None` on success.
#[uniffi::export]
pub fn tracker_resume(now_ms: i64) -> Option<String> {
    with_tracker(|t| t.resume(now_ms).err().map(|e| e.to_string()))
        .unwrap_or_else(|| Some("Tracker not initialized".to_string()))
}

/// Stop tracking. Returns the id of the saved session, if one was saved.
#[uniffi::export]
pub fn tracker_stop(now_ms: i64) -> Option<String> {
    with_tracker(|t| t.stop(now_ms).map(|s| s.id)).flatten()
}

#[uniffi::export]
pub fn tracker_get_state() -> TrackingState {
    with_tracker(|t| t.controller().state()).unwrap_or(TrackingState::Idle)
}

#[uniffi::export]
pub fn tracker_get_metrics() -> Metrics {
    with_tracker(|t| t.controller().metrics()).unwrap_or_default()
}

/// Fixes of the session in progress as JSON.
#[uniffi::export]
pub fn tracker_get_route_json() -> String {
    with_tracker(|t| serde_json::to_string(t.controller().positions()).ok())
        .flatten()
        .unwrap_or_else(|| "[]".to_string())
}

// ============================================================================
// Host Events
// ============================================================================

/// Forward a fix from the platform position watch.
#[uniffi::export]
pub fn tracker_push_position(latitude: f64, longitude: f64, captured_at_ms: i64) -> Option<Metrics> {
    with_tracker(|t| t.push_position(Position::new(latitude, longitude, captured_at_ms))).flatten()
}

/// Forward a fix that arrived without a timestamp; it is stamped with the current time.
#[uniffi::export]
pub fn tracker_push_position_now(latitude: f64, longitude: f64) -> Option<Metrics> {
    with_tracker(|t| t.push_position_now(latitude, longitude)).flatten()
}

/// Forward a tick from the platform interval timer.
#[uniffi::export]
pub fn tracker_push_tick(now_ms: i64) -> Option<Metrics> {
    with_tracker(|t| t.push_tick(now_ms)).flatten()
}

/// Forward a position-watch error (1 = permission denied, 2 = unavailable,
/// 3 = timeout). Returns the message to show if the session was aborted.
#[uniffi::export]
pub fn tracker_push_stream_error(code: u32) -> Option<String> {
    let kind = StreamErrorKind::from_code(code);
    with_tracker(|t| t.push_stream_error(kind).err().map(|e| e.to_string())).flatten()
}

#[uniffi::export]
pub fn tracker_set_position_available(available: bool) {
    with_tracker(|t| t.set_position_available(available));
}

#[uniffi::export]
pub fn tracker_set_online(online: bool) {
    with_tracker(|t| t.set_online(online));
}

#[uniffi::export]
pub fn tracker_set_network_info(info: Option<NetworkInfo>) {
    with_tracker(|t| t.set_network_info(info));
}

// ============================================================================
// History
// ============================================================================

/// Full history as JSON, most recent first.
#[uniffi::export]
pub fn tracker_get_history_json() -> String {
    with_tracker(|t| t.history().to_json().ok())
        .flatten()
        .unwrap_or_else(|| "[]".to_string())
}

/// Sessions revealed so far as JSON.
#[uniffi::export]
pub fn tracker_get_visible_history_json() -> String {
    with_tracker(|t| serde_json::to_string(t.visible_history()).ok())
        .flatten()
        .unwrap_or_else(|| "[]".to_string())
}

#[uniffi::export]
pub fn tracker_history_has_more() -> bool {
    with_tracker(|t| t.paginator().has_more()).unwrap_or(false)
}

/// Reveal the next page of history. Blocks for the simulated latency without
/// holding the tracker lock. Returns whether a page was revealed.
#[uniffi::export]
pub fn tracker_history_request_more() -> bool {
    let Some(paginator) = with_tracker(|t| t.paginator()) else {
        return false;
    };
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            warn!("[Tracker] Failed to create runtime: {}", e);
            return false;
        }
    };
    runtime.block_on(paginator.request_more())
}

#[uniffi::export]
pub fn tracker_clear_history() {
    with_tracker(|t| t.clear_history());
}

/// Delete one saved session. Returns whether it existed.
#[uniffi::export]
pub fn tracker_remove_route(id: String) -> bool {
    with_tracker(|t| match t.remove_route(&id) {
        Ok(removed) => removed,
        Err(e) => {
            warn!("[Tracker] Failed to remove {}: {}", id, e);
            false
        }
    })
    .unwrap_or(false)
}
