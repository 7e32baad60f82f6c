//! # History Store
//!
//! Completed sessions, most recent first, persisted as one JSON snapshot under
//! [`HISTORY_KEY`]. Every mutation rewrites the whole snapshot; histories are
//! bounded by how often a person goes out, not by data volume.

use log::{debug, info, warn};

use crate::storage::KeyValueStore;
use crate::{CompletedSession, Result, TrackerError};

/// Storage key for the serialized history.
pub const HISTORY_KEY: &str = "fitnessRoutes";

/// Durable, most-recent-first collection of completed sessions.
pub struct HistoryStore {
    store: Box<dyn KeyValueStore>,
    sessions: Vec<CompletedSession>,
    warning: Option<TrackerError>,
}

impl HistoryStore {
    /// Create an empty history over `store`. Call [`load_all`](Self::load_all) to read
    /// previously persisted sessions.
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            sessions: Vec::new(),
            warning: None,
        }
    }

    /// Create a history and immediately load persisted sessions.
    pub fn open(store: Box<dyn KeyValueStore>) -> Self {
        let mut history = Self::new(store);
        history.load_all();
        history
    }

    /// Replace the in-memory collection with the persisted snapshot.
    ///
    /// Unreadable or malformed data yields an empty history; the problem is
    /// logged and kept as [`warning`](Self::warning) rather than returned.
    pub fn load_all(&mut self) -> &[CompletedSession] {
        self.warning = None;
        self.sessions = match self.read_snapshot() {
            Ok(sessions) => sessions,
            Err(e) => {
                warn!("[HistoryStore] Failed to load saved routes: {}", e);
                self.warning = Some(e);
                Vec::new()
            }
        };
        info!("[HistoryStore] Loaded {} sessions", self.sessions.len());
        &self.sessions
    }

    fn read_snapshot(&self) -> Result<Vec<CompletedSession>> {
        let Some(raw) = self.store.get(HISTORY_KEY)? else {
            return Ok(Vec::new());
        };
        let sessions: Vec<CompletedSession> = serde_json::from_str(&raw)?;

        let before = sessions.len();
        let sessions: Vec<CompletedSession> = sessions
            .into_iter()
            .filter(|s| s.positions.len() >= 2)
            .collect();
        if sessions.len() < before {
            warn!(
                "[HistoryStore] Dropped {} stored sessions with fewer than 2 positions",
                before - sessions.len()
            );
        }
        Ok(sessions)
    }

    fn persist(&mut self) -> Result<()> {
        let json = self.to_json()?;
        self.store.set(HISTORY_KEY, &json)
    }

    /// Prepend a session and persist the collection.
    ///
    /// The session stays in memory even if the write fails.
    pub fn add(&mut self, session: CompletedSession) -> Result<()> {
        if let Some(newest) = self.sessions.first() {
            if session.ended_at < newest.ended_at {
                warn!(
                    "[HistoryStore] Session {} ended before newest entry {}",
                    session.id, newest.id
                );
            }
        }
        debug!(
            "[HistoryStore] Adding {} ({} points, {:.3} km)",
            session.id,
            session.positions.len(),
            session.distance_km
        );
        self.sessions.insert(0, session);
        self.persist()
    }

    /// Remove one session by id. Returns whether it existed.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let before = self.sessions.len();
        self.sessions.retain(|s| s.id != id);
        if self.sessions.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Empty the history and delete the persisted snapshot. Idempotent.
    pub fn clear(&mut self) {
        self.sessions.clear();
        if let Err(e) = self.store.remove(HISTORY_KEY) {
            warn!("[HistoryStore] Failed to remove saved routes: {}", e);
        }
        info!("[HistoryStore] Cleared");
    }

    pub fn sessions(&self) -> &[CompletedSession] {
        &self.sessions
    }

    pub fn get(&self, id: &str) -> Option<&CompletedSession> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Problem found by the last [`load_all`](Self::load_all), if any.
    pub fn warning(&self) -> Option<&TrackerError> {
        self.warning.as_ref()
    }

    /// Serialized snapshot, as it is persisted.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.sessions).map_err(|e| TrackerError::storage(e.to_string()))
    }
}
