//! Movie metadata provider abstraction
//!
//! Every lookup the application performs against the third-party metadata
//! service goes through this trait, so handlers and services can be exercised
//! against a mock and the HTTP client can be swapped or cached independently.

use crate::{
    error::AppResult,
    models::{
        Category, Collection, Credits, GenreList, ImageSet, MovieDetail, MovieId, MoviePage,
        ReleaseDatesResponse, VideoList, WatchProviderResponse,
    },
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Trait for movie metadata providers
///
/// Responses are parsed into typed models at this boundary. Implementations
/// report a rejected request or non-success status as a network failure and an
/// unparseable body as `AppError::MalformedResponse`.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Fetch one page of a list category (1-based page numbers)
    async fn fetch_page(&self, category: Category, page: u32, language: &str)
        -> AppResult<MoviePage>;

    async fn fetch_detail(&self, id: MovieId, language: &str) -> AppResult<MovieDetail>;

    async fn fetch_credits(&self, id: MovieId, language: &str) -> AppResult<Credits>;

    async fn fetch_recommendations(&self, id: MovieId, language: &str) -> AppResult<MoviePage>;

    async fn fetch_videos(&self, id: MovieId, language: &str) -> AppResult<VideoList>;

    async fn fetch_watch_providers(&self, id: MovieId) -> AppResult<WatchProviderResponse>;

    async fn fetch_release_dates(&self, id: MovieId) -> AppResult<ReleaseDatesResponse>;

    async fn fetch_images(&self, id: MovieId) -> AppResult<ImageSet>;

    async fn fetch_collection(&self, collection_id: u64, language: &str) -> AppResult<Collection>;

    /// Search movies by title. An empty query is rejected without a request.
    async fn search_by_title(&self, query: &str, language: &str) -> AppResult<MoviePage>;

    async fn fetch_genres(&self, language: &str) -> AppResult<GenreList>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
