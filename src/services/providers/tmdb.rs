/// TMDB (The Movie Database) API provider
///
/// Authenticates with a v4 read access token sent as a bearer token. All
/// endpoints are plain GETs under the configured base URL:
///
/// - Lists: `/movie/popular`, `/trending/movie/week`, `/movie/top_rated`
/// - Detail: `/movie/{id}` plus `/credits`, `/recommendations`, `/videos`,
///   `/watch/providers`, `/release_dates`, `/images`
/// - `/collection/{id}`, `/search/movie`, `/genre/movie/list`
use crate::{
    cached,
    config::Config,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        Category, Collection, Credits, GenreList, ImageSet, MovieDetail, MovieId, MoviePage,
        ReleaseDatesResponse, VideoList, WatchProviderResponse,
    },
    services::providers::MetadataProvider,
};
use reqwest::{header, Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;

const PAGE_CACHE_TTL: u64 = 3600; // 1 hour
const DETAIL_CACHE_TTL: u64 = 86400; // 1 day
const GENRE_CACHE_TTL: u64 = 604800; // 1 week

/// TMDB serves at most this many pages of any list
const MAX_PAGE: u32 = 500;

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_token: String,
    api_url: String,
    cache: Option<Cache>,
}

impl TmdbProvider {
    pub fn new(api_token: String, api_url: String, cache: Option<Cache>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_token,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    pub fn from_config(config: &Config, cache: Option<Cache>) -> Self {
        Self::new(
            config.tmdb_api_token.clone(),
            config.tmdb_api_url.clone(),
            cache,
        )
    }

    /// GETs `path` and parses the JSON body into `T`
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_token)
            .header(header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("TMDB resource {}", path)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let response_text = response.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path,
                "Failed to deserialize TMDB response"
            );
            AppError::MalformedResponse(format!("Failed to parse TMDB response for {}: {}", path, e))
        })
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn fetch_page(
        &self,
        category: Category,
        page: u32,
        language: &str,
    ) -> AppResult<MoviePage> {
        if page == 0 || page > MAX_PAGE {
            return Err(AppError::InvalidInput(format!(
                "page must be between 1 and {}",
                MAX_PAGE
            )));
        }

        let key = CacheKey::MoviePage {
            category,
            page,
            language: language.to_string(),
        };
        let page_param = page.to_string();

        cached!(self.cache, key, PAGE_CACHE_TTL, async {
            let result: MoviePage = self
                .get_json(
                    category.path(),
                    &[("language", language), ("page", page_param.as_str())],
                )
                .await?;

            tracing::info!(
                category = %category,
                page,
                results = result.results.len(),
                provider = "tmdb",
                "Movie page fetched"
            );

            Ok::<_, AppError>(result)
        })
    }

    async fn fetch_detail(&self, id: MovieId, language: &str) -> AppResult<MovieDetail> {
        cached!(
            self.cache,
            CacheKey::Detail(id, language.to_string()),
            DETAIL_CACHE_TTL,
            self.get_json::<MovieDetail>(&format!("/movie/{}", id), &[("language", language)])
        )
    }

    async fn fetch_credits(&self, id: MovieId, language: &str) -> AppResult<Credits> {
        cached!(
            self.cache,
            CacheKey::Credits(id, language.to_string()),
            DETAIL_CACHE_TTL,
            self.get_json::<Credits>(&format!("/movie/{}/credits", id), &[("language", language)])
        )
    }

    async fn fetch_recommendations(&self, id: MovieId, language: &str) -> AppResult<MoviePage> {
        cached!(
            self.cache,
            CacheKey::Recommendations(id, language.to_string()),
            DETAIL_CACHE_TTL,
            self.get_json::<MoviePage>(
                &format!("/movie/{}/recommendations", id),
                &[("language", language)]
            )
        )
    }

    async fn fetch_videos(&self, id: MovieId, language: &str) -> AppResult<VideoList> {
        cached!(
            self.cache,
            CacheKey::Videos(id, language.to_string()),
            DETAIL_CACHE_TTL,
            self.get_json::<VideoList>(&format!("/movie/{}/videos", id), &[("language", language)])
        )
    }

    async fn fetch_watch_providers(&self, id: MovieId) -> AppResult<WatchProviderResponse> {
        cached!(
            self.cache,
            CacheKey::WatchProviders(id),
            DETAIL_CACHE_TTL,
            self.get_json::<WatchProviderResponse>(&format!("/movie/{}/watch/providers", id), &[])
        )
    }

    async fn fetch_release_dates(&self, id: MovieId) -> AppResult<ReleaseDatesResponse> {
        cached!(
            self.cache,
            CacheKey::ReleaseDates(id),
            DETAIL_CACHE_TTL,
            self.get_json::<ReleaseDatesResponse>(&format!("/movie/{}/release_dates", id), &[])
        )
    }

    async fn fetch_images(&self, id: MovieId) -> AppResult<ImageSet> {
        cached!(
            self.cache,
            CacheKey::Images(id),
            DETAIL_CACHE_TTL,
            self.get_json::<ImageSet>(&format!("/movie/{}/images", id), &[])
        )
    }

    async fn fetch_collection(&self, collection_id: u64, language: &str) -> AppResult<Collection> {
        cached!(
            self.cache,
            CacheKey::Collection(collection_id, language.to_string()),
            DETAIL_CACHE_TTL,
            self.get_json::<Collection>(
                &format!("/collection/{}", collection_id),
                &[("language", language)]
            )
        )
    }

    async fn search_by_title(&self, query: &str, language: &str) -> AppResult<MoviePage> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::InvalidInput(
                "Search query cannot be empty".to_string(),
            ));
        }

        cached!(
            self.cache,
            CacheKey::Search {
                query: query.to_string(),
                language: language.to_string(),
            },
            PAGE_CACHE_TTL,
            async {
                let result: MoviePage = self
                    .get_json("/search/movie", &[("query", query), ("language", language)])
                    .await?;

                tracing::info!(
                    query = %query,
                    results = result.results.len(),
                    provider = "tmdb",
                    "Title search completed"
                );

                Ok::<_, AppError>(result)
            }
        )
    }

    async fn fetch_genres(&self, language: &str) -> AppResult<GenreList> {
        cached!(
            self.cache,
            CacheKey::Genres(language.to_string()),
            GENRE_CACHE_TTL,
            self.get_json::<GenreList>("/genre/movie/list", &[("language", language)])
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
