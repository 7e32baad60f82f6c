//! # Route Tracker
//!
//! GPS tracking session engine: turns a live position stream into distance and
//! speed metrics, and keeps completed sessions as a paginated history.
//!
//! This library provides:
//! - Haversine distance/bearing between positions
//! - Incremental metrics driven by two independent triggers (new fix, clock tick)
//! - A session state machine (idle → active → paused → stopped)
//! - Snapshot-persisted history with incremental reveal for list views
//!
//! ## Features
//!
//! - **`persistence`** - SQLite-backed history storage
//! - **`ffi`** - FFI bindings for mobile platforms (iOS/Android)
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use route_tracker::{
//!     HistoryStore, HostConnectivity, HostPositionSource, HostTimer, MemoryStore, Position,
//!     SessionController, TrackerConfig,
//! };
//!
//! let source = HostPositionSource::new();
//! let timer = HostTimer::new();
//! let history = HistoryStore::new(Box::new(MemoryStore::new()));
//! let mut controller = SessionController::new(
//!     TrackerConfig::default(),
//!     Box::new(source.clone()),
//!     Box::new(timer.clone()),
//!     Box::new(HostConnectivity::online()),
//!     history,
//! );
//!
//! controller.start(0).unwrap();
//! let sub = source.active_subscription().unwrap();
//! controller.handle_position(sub, Position::new(40.0, -75.0, 0));
//! controller.handle_position(sub, Position::new(40.001, -75.0, 10_000));
//!
//! let saved = controller.stop(10_000).unwrap();
//! assert_eq!(saved.positions.len(), 2);
//! assert_eq!(controller.history().len(), 1);
//! ```

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{Result, StreamErrorKind, TrackerError};

// Geographic utilities (distance, bearing)
pub mod geo_utils;

// Running distance/duration/speed state
pub mod metrics;
pub use metrics::MetricsAccumulator;

// Position stream and timer capabilities
pub mod source;
pub use source::{
    HostPositionSource, HostTimer, PositionSource, SubscriptionId, TickTimer, WatchOptions,
};

// Connectivity signal and network quality
pub mod connectivity;
pub use connectivity::{ConnectionQuality, ConnectivitySignal, HostConnectivity, NetworkInfo};

// Key-value storage backends
pub mod storage;
pub use storage::{KeyValueStore, MemoryStore};

// SQLite key-value store
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteStore;

// Completed session history
pub mod history;
pub use history::{HistoryStore, HISTORY_KEY};

// Incremental reveal of history for list views
pub mod paginator;
pub use paginator::{HistoryPaginator, PaginationConfig};

// Session state machine
pub mod controller;
pub use controller::{SessionController, TrackerConfig, TrackingState};

// Host-driven tracker bundle and global singleton
pub mod tracker;
pub use tracker::{install_tracker, with_tracker, Tracker, TRACKER};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("RouteTrackerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

/// Current wall-clock time in milliseconds, for hosts that don't stamp fixes themselves.
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis()
}

// ============================================================================
// Core Types
// ============================================================================

/// One recorded GPS fix.
///
/// # Example
/// ```
/// use route_tracker::Position;
/// let fix = Position::new(51.5074, -0.1278, 1_700_000_000_000); // London
/// assert!(fix.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Position {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lng")]
    pub longitude: f64,
    /// Capture time in milliseconds since epoch
    #[serde(alias = "timestamp")]
    pub captured_at: Timestamp,
}

impl Position {
    /// Create a new position.
    pub fn new(latitude: f64, longitude: f64, captured_at: Timestamp) -> Self {
        Self {
            latitude,
            longitude,
            captured_at,
        }
    }

    /// Check if the position has valid coordinates.
    ///
    /// The tracker trusts its input; producers call this before emitting a fix.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// Live motion metrics for the session in progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Metrics {
    /// Accumulated distance in kilometers
    pub distance_km: f64,
    /// Elapsed time since start in seconds (paused time excluded)
    pub duration_sec: f64,
    /// Average speed over the whole session in km/h
    pub avg_speed_kmh: f64,
    /// Speed between the two most recent fixes in km/h
    pub current_speed_kmh: f64,
}

/// Bounding box for a recorded track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from positions.
    pub fn from_points(points: &[Position]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.latitude);
            max_lat = max_lat.max(p.latitude);
            min_lng = min_lng.min(p.longitude);
            max_lng = max_lng.max(p.longitude);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        })
    }

    /// Get the center of the bounds as `(lat, lng)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }
}

/// Kind of activity inferred from average speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum ActivityType {
    Walking,
    Jogging,
    Running,
    Cycling,
}

impl ActivityType {
    /// Classify by average speed in km/h.
    pub fn from_avg_speed(avg_speed_kmh: f64) -> Self {
        if avg_speed_kmh < 5.0 {
            ActivityType::Walking
        } else if avg_speed_kmh < 15.0 {
            ActivityType::Jogging
        } else if avg_speed_kmh < 25.0 {
            ActivityType::Running
        } else {
            ActivityType::Cycling
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ActivityType::Walking => "Walking",
            ActivityType::Jogging => "Jogging",
            ActivityType::Running => "Running",
            ActivityType::Cycling => "Cycling",
        }
    }
}

/// A finished tracking session as stored in history.
///
/// Built once when a session stops and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletedSession {
    /// Unique identifier, `route-<ended_at>`
    pub id: String,
    /// Every recorded fix, in arrival order
    pub positions: Vec<Position>,
    /// Total distance in kilometers
    #[serde(alias = "distance")]
    pub distance_km: f64,
    /// Session duration in seconds
    #[serde(alias = "duration")]
    pub duration_sec: f64,
    /// Average speed in km/h
    #[serde(alias = "avgSpeed")]
    pub avg_speed_kmh: f64,
    #[serde(alias = "startTime")]
    pub started_at: Timestamp,
    #[serde(alias = "endTime")]
    pub ended_at: Timestamp,
}

impl CompletedSession {
    /// Number of recorded fixes.
    pub fn point_count(&self) -> usize {
        self.positions.len()
    }

    /// Bounding box of the track.
    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(&self.positions)
    }

    /// Activity classification from the average speed.
    pub fn activity_type(&self) -> ActivityType {
        ActivityType::from_avg_speed(self.avg_speed_kmh)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> CompletedSession {
        CompletedSession {
            id: "route-20000".to_string(),
            positions: vec![
                Position::new(51.5074, -0.1278, 0),
                Position::new(51.5080, -0.1290, 10_000),
                Position::new(51.5090, -0.1300, 20_000),
            ],
            distance_km: 0.25,
            duration_sec: 20.0,
            avg_speed_kmh: 45.0,
            started_at: 0,
            ended_at: 20_000,
        }
    }

    #[test]
    fn test_position_validation() {
        assert!(Position::new(51.5074, -0.1278, 0).is_valid());
        assert!(!Position::new(91.0, 0.0, 0).is_valid());
        assert!(!Position::new(0.0, 181.0, 0).is_valid());
        assert!(!Position::new(f64::NAN, 0.0, 0).is_valid());
    }

    #[test]
    fn test_bounds() {
        assert!(Bounds::from_points(&[]).is_none());

        let session = sample_session();
        let bounds = session.bounds().unwrap();
        assert_eq!(bounds.min_lat, 51.5074);
        assert_eq!(bounds.max_lat, 51.5090);
        assert_eq!(bounds.min_lng, -0.1300);
        assert_eq!(bounds.max_lng, -0.1278);

        let (lat, lng) = bounds.center();
        assert!((lat - 51.5082).abs() < 1e-9);
        assert!((lng + 0.1289).abs() < 1e-9);
    }

    #[test]
    fn test_activity_type_thresholds() {
        assert_eq!(ActivityType::from_avg_speed(0.0), ActivityType::Walking);
        assert_eq!(ActivityType::from_avg_speed(4.9), ActivityType::Walking);
        assert_eq!(ActivityType::from_avg_speed(5.0), ActivityType::Jogging);
        assert_eq!(ActivityType::from_avg_speed(15.0), ActivityType::Running);
        assert_eq!(ActivityType::from_avg_speed(25.0), ActivityType::Cycling);
        assert_eq!(sample_session().activity_type(), ActivityType::Cycling);
        assert_eq!(ActivityType::Jogging.label(), "Jogging");
    }

    #[test]
    fn test_session_json_field_names() {
        let json = serde_json::to_value(sample_session()).unwrap();
        assert_eq!(json["id"], "route-20000");
        assert_eq!(json["distanceKm"], 0.25);
        assert_eq!(json["durationSec"], 20.0);
        assert_eq!(json["avgSpeedKmh"], 45.0);
        assert_eq!(json["startedAt"], 0);
        assert_eq!(json["endedAt"], 20_000);
        assert_eq!(json["positions"][1]["capturedAt"], 10_000);
        assert_eq!(json["positions"][0]["latitude"], 51.5074);
    }

    #[test]
    fn test_legacy_field_names_accepted() {
        let legacy = r#"{
            "id": "route-1700000060000",
            "positions": [
                {"lat": 40.0, "lng": -75.0, "timestamp": 1700000000000},
                {"lat": 40.001, "lng": -75.0, "timestamp": 1700000010000}
            ],
            "distance": 0.111,
            "duration": 60.0,
            "avgSpeed": 6.66,
            "startTime": 1700000000000,
            "endTime": 1700000060000
        }"#;
        let session: CompletedSession = serde_json::from_str(legacy).unwrap();
        assert_eq!(session.point_count(), 2);
        assert_eq!(session.positions[1].captured_at, 1_700_000_010_000);
        assert_eq!(session.distance_km, 0.111);
        assert_eq!(session.ended_at, 1_700_000_060_000);
        assert_eq!(session.activity_type(), ActivityType::Jogging);
    }
}
