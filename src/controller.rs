//! # Session Controller
//!
//! State machine for one tracking session at a time:
//!
//! ```text
//! Idle --start--> Active --pause--> Paused --resume--> Active
//!   ^               |                  |
//!   +------stop-----+-------stop-------+
//! ```
//!
//! The controller is the single owner of the in-progress session. The position
//! stream and the tick timer are independent sources; every transition out of
//! `Active` cancels both before returning, and callbacks tagged with a cancelled
//! subscription are dropped.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::connectivity::{ConnectivitySignal, NetworkInfo};
use crate::history::HistoryStore;
use crate::metrics::MetricsAccumulator;
use crate::source::{PositionSource, SubscriptionId, TickTimer, WatchOptions};
use crate::{
    CompletedSession, Metrics, Position, Result, StreamErrorKind, Timestamp, TrackerError,
};

/// Lifecycle state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum TrackingState {
    Idle,
    Active,
    Paused,
}

/// Configuration for the session controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TrackerConfig {
    /// Options for the platform position watch
    pub watch: WatchOptions,

    /// Period of the duration/average-speed timer.
    /// Default: 1000 ms
    pub tick_interval_ms: u32,

    /// Refuse to start while the device reports offline. Tracking itself uses no
    /// network; this is a product guard.
    /// Default: true
    pub require_online: bool,

    /// Fewest fixes a session needs to be saved. Values below 2 are treated as 2.
    /// Default: 2
    pub min_positions_to_commit: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            watch: WatchOptions::default(),
            tick_interval_ms: 1_000,
            require_online: true,
            min_positions_to_commit: 2,
        }
    }
}

/// Drives one tracking session from start to stop and commits it to history.
pub struct SessionController {
    config: TrackerConfig,
    source: Box<dyn PositionSource>,
    timer: Box<dyn TickTimer>,
    connectivity: Box<dyn ConnectivitySignal>,
    history: HistoryStore,

    state: TrackingState,
    accumulator: MetricsAccumulator,
    positions: Vec<Position>,
    metrics: Metrics,
    started_at: Option<Timestamp>,
    paused_at: Option<Timestamp>,

    position_sub: Option<SubscriptionId>,
    timer_sub: Option<SubscriptionId>,
    last_error: Option<TrackerError>,
}

impl SessionController {
    pub fn new(
        config: TrackerConfig,
        source: Box<dyn PositionSource>,
        timer: Box<dyn TickTimer>,
        connectivity: Box<dyn ConnectivitySignal>,
        history: HistoryStore,
    ) -> Self {
        Self {
            config,
            source,
            timer,
            connectivity,
            history,
            state: TrackingState::Idle,
            accumulator: MetricsAccumulator::default(),
            positions: Vec::new(),
            metrics: Metrics::default(),
            started_at: None,
            paused_at: None,
            position_sub: None,
            timer_sub: None,
            last_error: None,
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    fn check_can_track(&self) -> Result<()> {
        if !self.source.is_available() {
            warn!("[SessionController] Position source unavailable");
            return Err(TrackerError::CapabilityUnavailable);
        }
        if self.config.require_online && !self.connectivity.is_online() {
            warn!("[SessionController] Refusing to track while offline");
            return Err(TrackerError::ConnectivityRequired);
        }
        Ok(())
    }

    fn subscribe_sources(&mut self) {
        self.position_sub = Some(self.source.subscribe(self.config.watch));
        self.timer_sub = Some(self.timer.start(self.config.tick_interval_ms));
    }

    fn unsubscribe_sources(&mut self) {
        if let Some(id) = self.position_sub.take() {
            self.source.unsubscribe(id);
        }
        if let Some(id) = self.timer_sub.take() {
            self.timer.stop(id);
        }
    }

    fn discard_session(&mut self) {
        self.positions.clear();
        self.accumulator.reset(0);
        self.metrics = Metrics::default();
        self.started_at = None;
        self.paused_at = None;
    }

    /// Begin a new session at `now`.
    ///
    /// A no-op while already active. From `Paused`, the paused session is
    /// discarded and a fresh one begins. On error nothing changes.
    pub fn start(&mut self, now: Timestamp) -> Result<()> {
        if self.state == TrackingState::Active {
            debug!("[SessionController] Start ignored: already active");
            return Ok(());
        }
        self.check_can_track()?;

        if self.state == TrackingState::Paused {
            info!(
                "[SessionController] Discarding paused session ({} points)",
                self.positions.len()
            );
        }

        self.discard_session();
        self.accumulator.reset(now);
        self.started_at = Some(now);
        self.last_error = None;
        self.subscribe_sources();
        self.state = TrackingState::Active;

        info!("[SessionController] Started at {}", now);
        Ok(())
    }

    /// Suspend tracking, keeping the buffer and metrics for a later stop or resume.
    pub fn pause(&mut self, now: Timestamp) {
        if self.state != TrackingState::Active {
            return;
        }
        self.unsubscribe_sources();
        self.metrics = self.accumulator.tick(now);
        self.paused_at = Some(now);
        self.state = TrackingState::Paused;

        info!(
            "[SessionController] Paused at {} ({} points, {:.3} km)",
            now,
            self.positions.len(),
            self.metrics.distance_km
        );
    }

    /// Continue a paused session.
    ///
    /// Time spent paused is excluded from duration and ground covered while
    /// paused is not counted. From `Idle` this starts a new session.
    pub fn resume(&mut self, now: Timestamp) -> Result<()> {
        match self.state {
            TrackingState::Active => return Ok(()),
            TrackingState::Idle => return self.start(now),
            TrackingState::Paused => {}
        }
        self.check_can_track()?;

        if let Some(paused_at) = self.paused_at.take() {
            self.accumulator.shift_start(now - paused_at);
        }
        self.accumulator.break_segment();
        self.metrics = self.accumulator.metrics();
        self.subscribe_sources();
        self.state = TrackingState::Active;

        info!("[SessionController] Resumed at {}", now);
        Ok(())
    }

    /// End the session at `now`, committing it to history when it has enough fixes.
    ///
    /// Returns the committed session. Never fails: a history write error is
    /// logged and the session is still kept in the in-memory history.
    pub fn stop(&mut self, now: Timestamp) -> Option<CompletedSession> {
        if self.state == TrackingState::Idle {
            return None;
        }
        self.unsubscribe_sources();
        if self.state == TrackingState::Active {
            self.metrics = self.accumulator.tick(now);
        }
        self.state = TrackingState::Idle;

        let min_positions = self.config.min_positions_to_commit.max(2) as usize;
        let committed = if self.positions.len() >= min_positions {
            let session = CompletedSession {
                id: self.session_id(now),
                positions: std::mem::take(&mut self.positions),
                distance_km: self.metrics.distance_km,
                duration_sec: self.metrics.duration_sec,
                avg_speed_kmh: self.metrics.avg_speed_kmh,
                started_at: self.started_at.unwrap_or(now),
                ended_at: now,
            };
            info!(
                "[SessionController] Stopped: saving {} ({} points, {:.3} km, {:.0} s)",
                session.id,
                session.positions.len(),
                session.distance_km,
                session.duration_sec
            );
            if let Err(e) = self.history.add(session.clone()) {
                warn!("[SessionController] Failed to persist {}: {}", session.id, e);
            }
            Some(session)
        } else {
            info!(
                "[SessionController] Stopped: discarding session with {} points",
                self.positions.len()
            );
            None
        };

        self.discard_session();
        committed
    }

    fn session_id(&self, ended_at: Timestamp) -> String {
        let base = format!("route-{}", ended_at);
        if !self.history.contains_id(&base) {
            return base;
        }
        let mut n = 1;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.history.contains_id(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    // ========================================================================
    // Source Callbacks
    // ========================================================================

    fn is_live(&self, live: Option<SubscriptionId>, subscription: SubscriptionId) -> bool {
        self.state == TrackingState::Active && live == Some(subscription)
    }

    /// A fix arrived on `subscription`. Returns the updated metrics, or `None`
    /// when the subscription is no longer live.
    pub fn handle_position(
        &mut self,
        subscription: SubscriptionId,
        position: Position,
    ) -> Option<Metrics> {
        if !self.is_live(self.position_sub, subscription) {
            debug!(
                "[SessionController] Dropping fix from stale subscription {}",
                subscription
            );
            return None;
        }
        self.positions.push(position);
        self.metrics = self.accumulator.observe(position);
        Some(self.metrics)
    }

    /// The timer fired on `subscription`.
    pub fn handle_tick(&mut self, subscription: SubscriptionId, now: Timestamp) -> Option<Metrics> {
        if !self.is_live(self.timer_sub, subscription) {
            return None;
        }
        self.metrics = self.accumulator.tick(now);
        Some(self.metrics)
    }

    /// The position stream failed on `subscription`.
    ///
    /// Aborts tracking: sources are cancelled, the in-progress session is
    /// discarded and the classified error is returned. Stale failures are ignored.
    pub fn handle_stream_error(
        &mut self,
        subscription: SubscriptionId,
        kind: StreamErrorKind,
    ) -> Result<()> {
        if !self.is_live(self.position_sub, subscription) {
            return Ok(());
        }
        warn!(
            "[SessionController] Position stream failed ({:?}), discarding {} points",
            kind,
            self.positions.len()
        );
        self.unsubscribe_sources();
        self.discard_session();
        self.state = TrackingState::Idle;

        let err = TrackerError::StreamError(kind);
        self.last_error = Some(err.clone());
        Err(err)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn is_tracking(&self) -> bool {
        self.state == TrackingState::Active
    }

    /// Metrics of the session in progress (zero when idle).
    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    /// Fixes recorded so far in the session in progress.
    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn current_position(&self) -> Option<&Position> {
        self.positions.last()
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    /// Live position subscription, if tracking.
    pub fn position_subscription(&self) -> Option<SubscriptionId> {
        self.position_sub
    }

    /// Live timer subscription, if tracking.
    pub fn timer_subscription(&self) -> Option<SubscriptionId> {
        self.timer_sub
    }

    /// The stream error that ended the last session, if it ended that way.
    pub fn last_error(&self) -> Option<&TrackerError> {
        self.last_error.as_ref()
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn network_info(&self) -> Option<NetworkInfo> {
        self.connectivity.network_info()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryStore {
        &mut self.history
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }
}

// ============================================================================
// Tests
// ============================================================================
