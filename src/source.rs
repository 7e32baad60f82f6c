//! Position-stream and timer capabilities.
//!
//! The controller talks to the platform through [`PositionSource`] and
//! [`TickTimer`]. Both hand out a [`SubscriptionId`] on subscribe; the platform
//! tags every callback with that id so the controller can drop events that
//! arrive after the subscription was cancelled.
//!
//! [`HostPositionSource`] and [`HostTimer`] are the implementations used when
//! the host application owns the actual GPS watch and interval timer (mobile
//! FFI, tests). They only record which subscription is live.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// Handle identifying one live registration. Never reused by a given source.
pub type SubscriptionId = u64;

/// Options forwarded to the platform position watch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct WatchOptions {
    /// Request GPS-grade accuracy. Default: true
    pub high_accuracy: bool,
    /// Maximum wait for a fix before the platform reports a timeout. Default: 10000 ms
    pub timeout_ms: u32,
    /// Maximum age of a cached fix the platform may return. Default: 1000 ms
    pub maximum_age_ms: u32,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: 10_000,
            maximum_age_ms: 1_000,
        }
    }
}

/// Source of asynchronous position fixes.
pub trait PositionSource: Send {
    /// Whether the platform can deliver positions at all.
    fn is_available(&self) -> bool;

    /// Begin watching; fixes and errors are delivered tagged with the returned id.
    fn subscribe(&mut self, options: WatchOptions) -> SubscriptionId;

    /// Stop watching. Unknown or already-cancelled ids are ignored.
    fn unsubscribe(&mut self, id: SubscriptionId);
}

/// Periodic clock used to advance duration between fixes.
pub trait TickTimer: Send {
    fn start(&mut self, interval_ms: u32) -> SubscriptionId;

    /// Cancel the timer. Unknown or already-cancelled ids are ignored.
    fn stop(&mut self, id: SubscriptionId);
}

// ============================================================================
// Host-driven implementations
// ============================================================================

#[derive(Debug, Default)]
struct HostSourceState {
    available: bool,
    next_id: SubscriptionId,
    active: Option<SubscriptionId>,
    options: Option<WatchOptions>,
    subscribe_count: u32,
}

/// Position source whose fixes are pushed in by the host.
///
/// Cloning yields another handle onto the same state, so the host keeps one
/// handle while the controller owns the other.
#[derive(Debug, Clone)]
pub struct HostPositionSource {
    state: Arc<Mutex<HostSourceState>>,
}

impl HostPositionSource {
    /// An available source.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(HostSourceState {
                available: true,
                ..HostSourceState::default()
            })),
        }
    }

    /// A source on a platform without location support.
    pub fn unavailable() -> Self {
        let source = Self::new();
        source.set_available(false);
        source
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostSourceState> {
        // State is plain data; a panic elsewhere cannot leave it half-written
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// The subscription the host should tag fixes with, if watching.
    pub fn active_subscription(&self) -> Option<SubscriptionId> {
        self.lock().active
    }

    pub fn is_subscribed(&self) -> bool {
        self.lock().active.is_some()
    }

    /// Options of the live watch.
    pub fn options(&self) -> Option<WatchOptions> {
        let state = self.lock();
        state.active.and(state.options)
    }

    /// How many times a watch has been started.
    pub fn subscribe_count(&self) -> u32 {
        self.lock().subscribe_count
    }
}

impl Default for HostPositionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionSource for HostPositionSource {
    fn is_available(&self) -> bool {
        self.lock().available
    }

    fn subscribe(&mut self, options: WatchOptions) -> SubscriptionId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.active = Some(id);
        state.options = Some(options);
        state.subscribe_count += 1;
        id
    }

    fn unsubscribe(&mut self, id: SubscriptionId) {
        let mut state = self.lock();
        if state.active == Some(id) {
            state.active = None;
            state.options = None;
        }
    }
}

#[derive(Debug, Default)]
struct HostTimerState {
    next_id: SubscriptionId,
    active: Option<SubscriptionId>,
    interval_ms: Option<u32>,
}

/// Timer whose ticks are pushed in by the host.
#[derive(Debug, Clone, Default)]
pub struct HostTimer {
    state: Arc<Mutex<HostTimerState>>,
}

impl HostTimer {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostTimerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn active_subscription(&self) -> Option<SubscriptionId> {
        self.lock().active
    }

    pub fn is_running(&self) -> bool {
        self.lock().active.is_some()
    }

    pub fn interval_ms(&self) -> Option<u32> {
        let state = self.lock();
        state.active.and(state.interval_ms)
    }
}

impl TickTimer for HostTimer {
    fn start(&mut self, interval_ms: u32) -> SubscriptionId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.active = Some(id);
        state.interval_ms = Some(interval_ms);
        id
    }

    fn stop(&mut self, id: SubscriptionId) {
        let mut state = self.lock();
        if state.active == Some(id) {
            state.active = None;
            state.interval_ms = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscription_ids_are_not_reused() {
        let mut source = HostPositionSource::new();
        let first = source.subscribe(WatchOptions::default());
        source.unsubscribe(first);
        let second = source.subscribe(WatchOptions::default());
        assert_ne!(first, second);
        assert_eq!(source.active_subscription(), Some(second));
        assert_eq!(source.subscribe_count(), 2);
    }

    #[test]
    fn test_stale_unsubscribe_is_ignored() {
        let mut source = HostPositionSource::new();
        let first = source.subscribe(WatchOptions::default());
        source.unsubscribe(first);
        let second = source.subscribe(WatchOptions::default());

        source.unsubscribe(first);
        assert_eq!(source.active_subscription(), Some(second));
    }

    #[test]
    fn test_clones_share_state() {
        let host_side = HostPositionSource::new();
        let mut owned = host_side.clone();
        let id = owned.subscribe(WatchOptions::default());

        assert!(host_side.is_subscribed());
        assert_eq!(host_side.options(), Some(WatchOptions::default()));
        owned.unsubscribe(id);
        assert!(!host_side.is_subscribed());
        assert!(host_side.options().is_none());
    }

    #[test]
    fn test_unavailable_source() {
        let source = HostPositionSource::unavailable();
        assert!(!source.is_available());
        source.set_available(true);
        assert!(source.is_available());
    }

    #[test]
    fn test_timer() {
        let host_side = HostTimer::new();
        let mut owned = host_side.clone();
        let id = owned.start(1_000);
        assert!(host_side.is_running());
        assert_eq!(host_side.interval_ms(), Some(1_000));

        owned.stop(id);
        assert!(!host_side.is_running());
        assert_eq!(host_side.active_subscription(), None);
    }

    #[test]
    fn test_watch_option_defaults() {
        let options = WatchOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.timeout_ms, 10_000);
        assert_eq!(options.maximum_age_ms, 1_000);
    }
}
