//! Infinite-scroll feed.
//!
//! [`FeedAccumulator`] is the pure state machine: it merges successive pages
//! into one list with unique ids, and allows at most one page fetch in flight.
//! [`FeedSession`] binds it to a category and a [`MetadataProvider`]; the
//! free functions [`advance`] and [`spawn_viewport_driver`] run fetches
//! without holding the session lock across the network call.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::{
    error::AppError,
    models::{Category, Movie, MovieId},
    services::providers::MetadataProvider,
};

/// A page fetch the accumulator has agreed to start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    /// Reset generation the request was issued under
    pub epoch: u64,
}

#[derive(Debug, Clone)]
pub struct FeedAccumulator {
    items: Vec<Movie>,
    page: u32,
    is_loading: bool,
    epoch: u64,
}

impl Default for FeedAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedAccumulator {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            page: 1,
            is_loading: false,
            epoch: 0,
        }
    }

    pub fn items(&self) -> &[Movie] {
        &self.items
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Clears the list and rewinds to page 1.
    ///
    /// An in-flight fetch is orphaned: its completion carries the old epoch
    /// and the session discards it.
    pub fn reset(&mut self) {
        self.items.clear();
        self.page = 1;
        self.is_loading = false;
        self.epoch += 1;
    }

    /// Starts a fetch of the current page, unless one is already in flight
    pub fn request_next_page(&mut self) -> Option<PageRequest> {
        if self.is_loading {
            return None;
        }
        self.is_loading = true;
        Some(PageRequest {
            page: self.page,
            epoch: self.epoch,
        })
    }

    /// Sentinel visibility report.
    ///
    /// A visible sentinel advances the page and starts its fetch. Signals that
    /// arrive while a fetch is in flight are dropped, not queued.
    pub fn on_viewport_signal(&mut self, visible: bool) -> Option<PageRequest> {
        if !visible || self.is_loading {
            return None;
        }
        self.page += 1;
        self.is_loading = true;
        Some(PageRequest {
            page: self.page,
            epoch: self.epoch,
        })
    }

    /// Merges a fetched page and clears the loading flag.
    ///
    /// Page 1 replaces the list; later pages append only ids not already
    /// present, keeping the fetched order. Page 1 is not taken verbatim:
    /// an id repeated inside it keeps only its first occurrence. Returns how
    /// many items were added.
    pub fn on_page_fetched(&mut self, page: u32, fetched: Vec<Movie>) -> usize {
        self.is_loading = false;

        let mut seen: HashSet<MovieId> = if page == 1 {
            self.items.clear();
            HashSet::new()
        } else {
            self.items.iter().map(|m| m.id).collect()
        };

        let before = self.items.len();
        self.items
            .extend(fetched.into_iter().filter(|movie| seen.insert(movie.id)));
        self.items.len() - before
    }

    /// Clears the loading flag after a failed fetch; items and page are kept
    pub fn on_page_failed(&mut self) {
        self.is_loading = false;
    }

    /// Read-only genre projection; `None` means all genres
    pub fn filtered(&self, genre: Option<u32>) -> Vec<&Movie> {
        self.items
            .iter()
            .filter(|movie| genre.map_or(true, |g| movie.has_genre(g)))
            .collect()
    }
}

/// What a fetch attempt did to the feed
#[derive(Debug)]
pub enum FeedOutcome {
    /// The page was merged
    Loaded { page: u32, appended: usize },
    /// Nothing started: a fetch was already in flight or the sentinel was hidden
    Skipped,
    /// The feed was reset while the fetch ran; the result was dropped
    Stale { page: u32 },
    Failed { page: u32, error: AppError },
}

impl FeedOutcome {
    pub fn accepted(&self) -> bool {
        !matches!(self, FeedOutcome::Skipped)
    }
}

/// What started the fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedTrigger {
    /// Load the current page (initial load or retry)
    Current,
    /// Sentinel visibility change
    Viewport(bool),
}

/// Snapshot returned to clients
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeedView {
    pub category: Category,
    pub page: u32,
    pub is_loading: bool,
    pub genre: Option<u32>,
    pub items: Vec<Movie>,
}

/// One user's feed over one category
#[derive(Debug, Clone)]
pub struct FeedSession {
    category: Category,
    language: String,
    accumulator: FeedAccumulator,
}

impl FeedSession {
    pub fn new(category: Category, language: impl Into<String>) -> Self {
        Self {
            category,
            language: language.into(),
            accumulator: FeedAccumulator::new(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn accumulator(&self) -> &FeedAccumulator {
        &self.accumulator
    }

    /// Switches category and starts over from page 1
    pub fn reset(&mut self, category: Category) {
        tracing::debug!(from = %self.category, to = %category, "Feed reset");
        self.category = category;
        self.accumulator.reset();
    }

    fn begin(&mut self, trigger: FeedTrigger) -> Option<PageRequest> {
        match trigger {
            FeedTrigger::Current => self.accumulator.request_next_page(),
            FeedTrigger::Viewport(visible) => self.accumulator.on_viewport_signal(visible),
        }
    }

    fn complete(
        &mut self,
        request: PageRequest,
        result: Result<Vec<Movie>, AppError>,
    ) -> FeedOutcome {
        if request.epoch != self.accumulator.epoch() {
            tracing::debug!(page = request.page, "Discarding page fetched before reset");
            return FeedOutcome::Stale { page: request.page };
        }

        match result {
            Ok(movies) => {
                let movies: Vec<Movie> = movies.into_iter().filter(|m| !m.adult).collect();
                let appended = self.accumulator.on_page_fetched(request.page, movies);
                FeedOutcome::Loaded {
                    page: request.page,
                    appended,
                }
            }
            Err(error) => {
                tracing::warn!(
                    error = %error,
                    category = %self.category,
                    page = request.page,
                    "Feed page fetch failed"
                );
                self.accumulator.on_page_failed();
                FeedOutcome::Failed {
                    page: request.page,
                    error,
                }
            }
        }
    }

    pub fn view(&self, genre: Option<u32>) -> FeedView {
        FeedView {
            category: self.category,
            page: self.accumulator.page(),
            is_loading: self.accumulator.is_loading(),
            genre,
            items: self
                .accumulator
                .filtered(genre)
                .into_iter()
                .cloned()
                .collect(),
        }
    }
}

/// Runs one trigger against a shared session.
///
/// The lock is held only to start and to merge, never across the fetch, so
/// concurrent triggers observe `is_loading` and are skipped.
pub async fn advance(
    session: &Mutex<FeedSession>,
    provider: &dyn MetadataProvider,
    trigger: FeedTrigger,
) -> FeedOutcome {
    let (request, category, language) = {
        let mut guard = session.lock().await;
        match guard.begin(trigger) {
            Some(request) => (request, guard.category, guard.language.clone()),
            None => return FeedOutcome::Skipped,
        }
    };

    let result = provider
        .fetch_page(category, request.page, &language)
        .await
        .map(|page| page.results);

    let outcome = session.lock().await.complete(request, result);
    if let FeedOutcome::Loaded { page, appended } = &outcome {
        tracing::info!(category = %category, page, appended, "Feed page merged");
    }
    outcome
}

/// Subscribes a session to a stream of sentinel visibility reports.
///
/// Each visible report spawns its fetch, so reports arriving mid-fetch hit
/// the loading guard and are dropped. The task ends when the sender is closed.
pub fn spawn_viewport_driver(
    session: Arc<Mutex<FeedSession>>,
    provider: Arc<dyn MetadataProvider>,
    mut signals: mpsc::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(visible) = signals.recv().await {
            if !visible {
                continue;
            }
            let session = session.clone();
            let provider = provider.clone();
            tokio::spawn(async move {
                advance(&session, provider.as_ref(), FeedTrigger::Viewport(true)).await;
            });
        }
        tracing::debug!("Viewport signal source closed");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppResult;
    use crate::models::{
        Collection, Credits, GenreList, ImageSet, MovieDetail, MoviePage, ReleaseDatesResponse,
        VideoList, WatchProviderResponse,
    };
    use crate::services::providers::MockMetadataProvider;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn movie(id: MovieId) -> Movie {
        Movie::new(id, format!("Movie {}", id))
    }

    fn movies(ids: &[MovieId]) -> Vec<Movie> {
        ids.iter().copied().map(movie).collect()
    }

    fn ids(items: &[Movie]) -> Vec<MovieId> {
        items.iter().map(|m| m.id).collect()
    }

    fn page_of(page: u32, ids: &[MovieId]) -> MoviePage {
        MoviePage {
            page,
            results: movies(ids),
            total_pages: 10,
            total_results: 200,
        }
    }

    #[test]
    fn test_first_page_then_overlapping_second_page() {
        let mut feed = FeedAccumulator::new();

        let first = feed.request_next_page().unwrap();
        assert_eq!(first.page, 1);
        feed.on_page_fetched(first.page, movies(&[1, 2, 3]));
        assert_eq!(ids(feed.items()), vec![1, 2, 3]);

        let second = feed.on_viewport_signal(true).unwrap();
        assert_eq!(second.page, 2);
        let appended = feed.on_page_fetched(second.page, movies(&[3, 4, 5]));

        assert_eq!(appended, 2);
        assert_eq!(ids(feed.items()), vec![1, 2, 3, 4, 5]);
        assert!(!feed.is_loading());
    }

    #[test]
    fn test_page_one_replaces_previous_items() {
        let mut feed = FeedAccumulator::new();
        feed.on_page_fetched(1, movies(&[1, 2]));
        feed.on_page_fetched(2, movies(&[3, 4]));

        feed.on_page_fetched(1, movies(&[9, 4, 7]));
        assert_eq!(ids(feed.items()), vec![9, 4, 7]);
    }

    #[test]
    fn test_loading_blocks_requests_and_signals() {
        let mut feed = FeedAccumulator::new();
        feed.request_next_page().unwrap();

        assert_eq!(feed.request_next_page(), None);
        assert_eq!(feed.on_viewport_signal(true), None);
        assert_eq!(feed.page(), 1);
        assert!(feed.is_loading());
    }

    #[test]
    fn test_hidden_sentinel_does_nothing() {
        let mut feed = FeedAccumulator::new();
        assert_eq!(feed.on_viewport_signal(false), None);
        assert_eq!(feed.page(), 1);
        assert!(!feed.is_loading());
    }

    #[test]
    fn test_failure_unblocks_and_keeps_state() {
        let mut feed = FeedAccumulator::new();
        feed.request_next_page().unwrap();
        feed.on_page_fetched(1, movies(&[1, 2]));

        let request = feed.on_viewport_signal(true).unwrap();
        feed.on_page_failed();

        assert!(!feed.is_loading());
        assert_eq!(feed.page(), request.page);
        assert_eq!(ids(feed.items()), vec![1, 2]);

        // Retry re-requests the same page number
        assert_eq!(feed.request_next_page().map(|r| r.page), Some(2));
    }

    #[test]
    fn test_reset_rewinds_and_bumps_epoch() {
        let mut feed = FeedAccumulator::new();
        feed.on_page_fetched(1, movies(&[1, 2]));
        feed.on_viewport_signal(true).unwrap();
        let epoch = feed.epoch();

        feed.reset();

        assert!(feed.items().is_empty());
        assert_eq!(feed.page(), 1);
        assert!(!feed.is_loading());
        assert_eq!(feed.epoch(), epoch + 1);
    }

    #[test]
    fn test_genre_projection_does_not_mutate() {
        let mut feed = FeedAccumulator::new();
        let mut action = movie(1);
        action.genre_ids = vec![28];
        let mut drama = movie(2);
        drama.genre_ids = vec![18, 28];
        let mut comedy = movie(3);
        comedy.genre_ids = vec![35];
        feed.on_page_fetched(1, vec![action, drama, comedy]);

        let filtered: Vec<MovieId> = feed.filtered(Some(28)).iter().map(|m| m.id).collect();
        assert_eq!(filtered, vec![1, 2]);
        assert_eq!(feed.filtered(None).len(), 3);
        assert_eq!(feed.items().len(), 3);
        assert_eq!(feed.page(), 1);
    }

    #[test]
    fn test_duplicates_within_one_page_are_collapsed() {
        let mut feed = FeedAccumulator::new();
        feed.on_page_fetched(1, movies(&[1, 1, 2]));
        feed.on_page_fetched(2, movies(&[3, 3, 2]));
        assert_eq!(ids(feed.items()), vec![1, 2, 3]);
    }

    #[test]
    fn test_page_one_collapses_repeated_ids() {
        let mut feed = FeedAccumulator::new();
        feed.on_page_fetched(2, movies(&[9]));
        assert_eq!(feed.on_page_fetched(1, movies(&[5, 5, 6, 5])), 2);
        assert_eq!(ids(feed.items()), vec![5, 6]);
    }

    proptest! {
        #[test]
        fn prop_later_pages_never_duplicate_ids(
            pages in prop::collection::vec(prop::collection::vec(0u64..40, 0..20), 1..8)
        ) {
            let mut feed = FeedAccumulator::new();
            for (index, page) in pages.iter().enumerate() {
                feed.on_page_fetched(index as u32 + 2, movies(page));
            }

            let all = ids(feed.items());
            let unique: HashSet<MovieId> = all.iter().copied().collect();
            prop_assert_eq!(all.len(), unique.len());

            // Arrival order of first occurrences is preserved
            let mut expected = Vec::new();
            for id in pages.iter().flatten() {
                if !expected.contains(id) {
                    expected.push(*id);
                }
            }
            prop_assert_eq!(all, expected);
        }

        #[test]
        fn prop_page_one_is_a_full_replacement(
            before in prop::collection::vec(0u64..40, 0..20),
            first in prop::collection::hash_set(0u64..40, 0..20),
        ) {
            let mut feed = FeedAccumulator::new();
            feed.on_page_fetched(2, movies(&before));

            let first: Vec<MovieId> = first.into_iter().collect();
            feed.on_page_fetched(1, movies(&first));
            prop_assert_eq!(ids(feed.items()), first);
        }

        #[test]
        fn prop_page_one_keeps_first_occurrences(
            first in prop::collection::vec(0u64..10, 0..30),
        ) {
            let mut feed = FeedAccumulator::new();
            feed.on_page_fetched(1, movies(&first));

            let mut expected: Vec<MovieId> = Vec::new();
            for id in first {
                if !expected.contains(&id) {
                    expected.push(id);
                }
            }
            prop_assert_eq!(ids(feed.items()), expected);
        }
    }

    #[tokio::test]
    async fn test_advance_filters_adult_items() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_fetch_page()
            .withf(|category, page, language| {
                *category == Category::Popular && *page == 1 && language == "ko-KR"
            })
            .times(1)
            .returning(|_, _, _| {
                let mut page = page_of(1, &[1, 2, 3]);
                page.results[1].adult = true;
                Ok(page)
            });

        let session = Mutex::new(FeedSession::new(Category::Popular, "ko-KR"));
        let outcome = advance(&session, &provider, FeedTrigger::Current).await;

        assert!(matches!(outcome, FeedOutcome::Loaded { page: 1, appended: 2 }));
        assert_eq!(ids(&session.lock().await.view(None).items), vec![1, 3]);
    }

    #[tokio::test]
    async fn test_advance_failure_leaves_feed_retryable() {
        let mut provider = MockMetadataProvider::new();
        provider
            .expect_fetch_page()
            .times(1)
            .returning(|_, _, _| Err(AppError::Upstream("status 500".to_string())));

        let session = Mutex::new(FeedSession::new(Category::Top, "ko-KR"));
        let outcome = advance(&session, &provider, FeedTrigger::Current).await;

        match outcome {
            FeedOutcome::Failed { page, error } => {
                assert_eq!(page, 1);
                assert!(error.is_network_failure());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        let view = session.lock().await.view(None);
        assert!(!view.is_loading);
        assert!(view.items.is_empty());
    }

    #[tokio::test]
    async fn test_hidden_signal_issues_no_fetch() {
        let mut provider = MockMetadataProvider::new();
        provider.expect_fetch_page().times(0);

        let session = Mutex::new(FeedSession::new(Category::Popular, "ko-KR"));
        let outcome = advance(&session, &provider, FeedTrigger::Viewport(false)).await;
        assert!(!outcome.accepted());
    }

    /// Provider whose page fetches wait until the test releases them
    struct GatedProvider {
        gate: Arc<tokio::sync::Semaphore>,
        calls: Arc<std::sync::Mutex<Vec<u32>>>,
    }

    #[async_trait::async_trait]
    impl MetadataProvider for GatedProvider {
        async fn fetch_page(&self, _: Category, page: u32, _: &str) -> AppResult<MoviePage> {
            self.calls.lock().unwrap().push(page);
            let _permit = self.gate.acquire().await.unwrap();
            let base = page as u64 * 10;
            Ok(page_of(page, &[base, base + 1]))
        }
        async fn fetch_detail(&self, _: MovieId, _: &str) -> AppResult<MovieDetail> {
            unimplemented!()
        }
        async fn fetch_credits(&self, _: MovieId, _: &str) -> AppResult<Credits> {
            unimplemented!()
        }
        async fn fetch_recommendations(&self, _: MovieId, _: &str) -> AppResult<MoviePage> {
            unimplemented!()
        }
        async fn fetch_videos(&self, _: MovieId, _: &str) -> AppResult<VideoList> {
            unimplemented!()
        }
        async fn fetch_watch_providers(&self, _: MovieId) -> AppResult<WatchProviderResponse> {
            unimplemented!()
        }
        async fn fetch_release_dates(&self, _: MovieId) -> AppResult<ReleaseDatesResponse> {
            unimplemented!()
        }
        async fn fetch_images(&self, _: MovieId) -> AppResult<ImageSet> {
            unimplemented!()
        }
        async fn fetch_collection(&self, _: u64, _: &str) -> AppResult<Collection> {
            unimplemented!()
        }
        async fn search_by_title(&self, _: &str, _: &str) -> AppResult<MoviePage> {
            unimplemented!()
        }
        async fn fetch_genres(&self, _: &str) -> AppResult<GenreList> {
            unimplemented!()
        }
        fn name(&self) -> &'static str {
            "gated"
        }
    }

    async fn wait_until_idle(session: &Mutex<FeedSession>) {
        for _ in 0..100 {
            if !session.lock().await.accumulator().is_loading() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("feed never finished loading");
    }

    #[tokio::test]
    async fn test_viewport_driver_drops_signals_while_loading() {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let calls = Arc::new(std::sync::Mutex::new(Vec::new()));
        let provider: Arc<dyn MetadataProvider> = Arc::new(GatedProvider {
            gate: gate.clone(),
            calls: calls.clone(),
        });
        let session = Arc::new(Mutex::new(FeedSession::new(Category::Popular, "ko-KR")));

        let (tx, rx) = mpsc::channel(8);
        let driver = spawn_viewport_driver(session.clone(), provider, rx);

        // Three quick signals: only the first starts a fetch
        for _ in 0..3 {
            tx.send(true).await.unwrap();
        }
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        assert_eq!(*calls.lock().unwrap(), vec![2]);
        assert_eq!(session.lock().await.accumulator().page(), 2);

        gate.add_permits(1);
        wait_until_idle(&session).await;
        assert_eq!(ids(session.lock().await.accumulator().items()), vec![20, 21]);

        // The next spontaneous signal after loading proceeds
        gate.add_permits(1);
        tx.send(true).await.unwrap();
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
        wait_until_idle(&session).await;
        assert_eq!(*calls.lock().unwrap(), vec![2, 3]);
        assert_eq!(
            ids(session.lock().await.accumulator().items()),
            vec![20, 21, 30, 31]
        );

        drop(tx);
        driver.await.unwrap();
    }

    #[tokio::test]
    async fn test_reset_during_fetch_discards_stale_page() {
        let gate = Arc::new(tokio::sync::Semaphore::new(0));
        let provider = GatedProvider {
            gate: gate.clone(),
            calls: Arc::new(std::sync::Mutex::new(Vec::new())),
        };
        let session = Mutex::new(FeedSession::new(Category::Popular, "ko-KR"));

        let fetch = advance(&session, &provider, FeedTrigger::Current);
        let reset = async {
            tokio::task::yield_now().await;
            session.lock().await.reset(Category::Top);
            gate.add_permits(1);
        };
        let (outcome, ()) = tokio::join!(fetch, reset);

        assert!(matches!(outcome, FeedOutcome::Stale { page: 1 }));
        let guard = session.lock().await;
        assert_eq!(guard.category(), Category::Top);
        assert!(guard.accumulator().items().is_empty());
        assert!(!guard.accumulator().is_loading());
    }
}
