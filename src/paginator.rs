//! Incremental reveal of history for infinite-scroll list views.
//!
//! The presentation layer calls [`HistoryPaginator::request_more`] when its
//! "load more" sentinel becomes visible. The paginator only tracks how many
//! sessions are revealed; the sessions themselves stay in the history store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{CompletedSession, HistoryStore};

/// Configuration for history pagination.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationConfig {
    /// Sessions revealed per page. Default: 5
    pub page_size: usize,
    /// Simulated latency before a page is revealed. Default: 300 ms
    pub load_delay_ms: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            load_delay_ms: 300,
        }
    }
}

#[derive(Debug, Default)]
struct PageState {
    generation: u64,
    total: usize,
    revealed_count: usize,
    has_more: bool,
    loading: bool,
}

/// Tracks how much of the history a list view has revealed.
///
/// Cloning yields another handle onto the same state, so one task can await
/// [`request_more`](Self::request_more) while another reads the observables.
#[derive(Debug, Clone)]
pub struct HistoryPaginator {
    config: PaginationConfig,
    state: Arc<Mutex<PageState>>,
}

impl HistoryPaginator {
    pub fn new(config: PaginationConfig) -> Self {
        Self {
            config: PaginationConfig {
                page_size: config.page_size.max(1),
                ..config
            },
            state: Arc::new(Mutex::new(PageState::default())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Reveal the first page of a history holding `total` sessions.
    ///
    /// Call again whenever the history changes; any reveal in flight is superseded.
    pub fn initialize(&self, total: usize) {
        let mut state = self.lock();
        state.generation += 1;
        state.total = total;
        state.revealed_count = total.min(self.config.page_size);
        state.has_more = state.revealed_count < total;
        state.loading = false;
    }

    /// Reset to the first page of `history`.
    pub fn initialize_from(&self, history: &HistoryStore) {
        self.initialize(history.len());
    }

    /// Reveal the next page after the configured delay.
    ///
    /// Returns `false` without waiting when a load is already in flight or
    /// everything is revealed.
    pub async fn request_more(&self) -> bool {
        let mut guard = {
            let mut state = self.lock();
            if state.loading || !state.has_more {
                return false;
            }
            state.loading = true;
            LoadGuard {
                paginator: self,
                generation: state.generation,
                finished: false,
            }
        };

        if self.config.load_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.load_delay_ms)).await;
        }
        guard.finished = true;
        let generation = guard.generation;

        let mut state = self.lock();
        if state.generation != generation {
            // Re-initialized while we were waiting
            return false;
        }
        state.revealed_count = (state.revealed_count + self.config.page_size).min(state.total);
        state.has_more = state.revealed_count < state.total;
        state.loading = false;
        debug!(
            "[HistoryPaginator] Revealed {}/{} sessions",
            state.revealed_count, state.total
        );
        true
    }

    pub fn revealed_count(&self) -> usize {
        self.lock().revealed_count
    }

    pub fn has_more(&self) -> bool {
        self.lock().has_more
    }

    pub fn is_loading(&self) -> bool {
        self.lock().loading
    }

    /// The revealed prefix of `sessions`.
    pub fn visible<'a>(&self, sessions: &'a [CompletedSession]) -> &'a [CompletedSession] {
        let count = self.revealed_count().min(sessions.len());
        &sessions[..count]
    }
}

/// Releases the loading flag if a `request_more` future is dropped mid-wait.
struct LoadGuard<'a> {
    paginator: &'a HistoryPaginator,
    generation: u64,
    finished: bool,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.paginator.lock();
        if state.generation == self.generation {
            state.loading = false;
            debug!("[HistoryPaginator] Load cancelled");
        }
    }
}

impl Default for HistoryPaginator {
    fn default() -> Self {
        Self::new(PaginationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    fn instant() -> HistoryPaginator {
        HistoryPaginator::new(PaginationConfig {
            page_size: 5,
            load_delay_ms: 0,
        })
    }

    #[tokio::test]
    async fn test_twelve_sessions_in_pages_of_five() {
        let paginator = instant();
        paginator.initialize(12);
        assert_eq!(paginator.revealed_count(), 5);
        assert!(paginator.has_more());

        assert!(paginator.request_more().await);
        assert_eq!(paginator.revealed_count(), 10);
        assert!(paginator.has_more());

        assert!(paginator.request_more().await);
        assert_eq!(paginator.revealed_count(), 12);
        assert!(!paginator.has_more());

        // Nothing left
        assert!(!paginator.request_more().await);
        assert_eq!(paginator.revealed_count(), 12);
    }

    #[tokio::test]
    async fn test_small_and_empty_histories() {
        let paginator = instant();
        paginator.initialize(0);
        assert_eq!(paginator.revealed_count(), 0);
        assert!(!paginator.has_more());
        assert!(!paginator.request_more().await);

        paginator.initialize(5);
        assert_eq!(paginator.revealed_count(), 5);
        assert!(!paginator.has_more());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_while_loading_is_noop() {
        let paginator = HistoryPaginator::default();
        paginator.initialize(12);

        let (first, second) = tokio::join!(paginator.request_more(), async {
            // Runs once the first request is parked on its timer
            tokio::task::yield_now().await;
            let loading = paginator.is_loading();
            (loading, paginator.request_more().await)
        });

        assert!(first);
        assert_eq!(second, (true, false));
        assert_eq!(paginator.revealed_count(), 10);
        assert!(!paginator.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinitialize_supersedes_pending_load() {
        let paginator = HistoryPaginator::default();
        paginator.initialize(12);

        let (revealed, _) = tokio::join!(paginator.request_more(), async {
            tokio::task::yield_now().await;
            paginator.initialize(13);
        });

        assert!(!revealed);
        assert_eq!(paginator.revealed_count(), 5);
        assert!(paginator.has_more());
        assert!(!paginator.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_load_can_be_retried() {
        let paginator = HistoryPaginator::default();
        paginator.initialize(12);

        let timed_out =
            tokio::time::timeout(Duration::from_millis(10), paginator.request_more()).await;
        assert!(timed_out.is_err());
        assert!(!paginator.is_loading());
        assert!(paginator.has_more());
        assert_eq!(paginator.revealed_count(), 5);

        assert!(paginator.request_more().await);
        assert_eq!(paginator.revealed_count(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_stale_load_leaves_new_load_alone() {
        let paginator = HistoryPaginator::default();
        paginator.initialize(12);

        let (stale, fresh, loading_mid_wait) = tokio::join!(
            tokio::time::timeout(Duration::from_millis(10), paginator.request_more()),
            async {
                tokio::task::yield_now().await;
                paginator.initialize(12);
                paginator.request_more().await
            },
            async {
                // After the stale load was dropped, before the fresh one lands
                tokio::time::sleep(Duration::from_millis(50)).await;
                paginator.is_loading()
            }
        );

        assert!(stale.is_err());
        assert!(loading_mid_wait);
        assert!(fresh);
        assert_eq!(paginator.revealed_count(), 10);
        assert!(!paginator.is_loading());
    }

    #[test]
    fn test_visible_slice() {
        let sessions: Vec<CompletedSession> = (0..7)
            .map(|i| CompletedSession {
                id: format!("route-{i}"),
                positions: vec![Position::new(0.0, 0.0, 0), Position::new(0.0, 0.001, 1_000)],
                distance_km: 0.1,
                duration_sec: 1.0,
                avg_speed_kmh: 400.0,
                started_at: 0,
                ended_at: 1_000,
            })
            .collect();

        let paginator = instant();
        paginator.initialize(sessions.len());
        let visible = paginator.visible(&sessions);
        assert_eq!(visible.len(), 5);
        assert_eq!(visible[0].id, "route-0");
        assert!(paginator.visible(&sessions[..3]).len() == 3);
    }

    #[test]
    fn test_initialize_from_history() {
        let mut history = HistoryStore::new(Box::new(crate::MemoryStore::new()));
        for i in 0..7 {
            history
                .add(CompletedSession {
                    id: format!("route-{i}"),
                    positions: vec![Position::new(0.0, 0.0, 0), Position::new(0.0, 0.001, 1_000)],
                    distance_km: 0.1,
                    duration_sec: 1.0,
                    avg_speed_kmh: 400.0,
                    started_at: 0,
                    ended_at: 1_000 + i,
                })
                .unwrap();
        }

        let paginator = instant();
        paginator.initialize_from(&history);
        assert_eq!(paginator.revealed_count(), 5);
        assert!(paginator.has_more());
        assert_eq!(paginator.visible(history.sessions())[0].id, "route-6");
    }
}
