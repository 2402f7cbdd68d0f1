use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;

use crate::{
    config::Config,
    error::AppResult,
    models::{Category, GenreList, Movie, MovieId, MovieOverview, MoviePage},
    services::providers::MetadataProvider,
};

/// Size of the featured carousel
const FEATURED_COUNT: usize = 10;
/// Genre names shown per featured movie
const FEATURED_GENRES: usize = 3;
const FALLBACK_LOGO_LANGUAGE: &str = "en";

/// Five-star rendering of a 0-10 vote average
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct StarRating {
    pub full: u8,
    pub half: bool,
    pub empty: u8,
}

impl StarRating {
    pub fn from_vote_average(vote_average: f64) -> Self {
        let stars = vote_average.clamp(0.0, 10.0) / 2.0;
        let full = stars.floor() as u8;
        let half = stars - stars.floor() >= 0.5;
        let empty = 5 - full - u8::from(half);
        Self { full, half, empty }
    }
}

/// A carousel entry with its artwork and runtime
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FeaturedMovie {
    pub movie: Movie,
    pub logo_url: Option<String>,
    pub runtime: Option<u32>,
    /// Up to three genre names joined with " | "
    pub genre_label: String,
    pub stars: StarRating,
}

/// Read-side queries behind the home, detail and search views
#[derive(Clone)]
pub struct DiscoveryService {
    provider: Arc<dyn MetadataProvider>,
    language: String,
    video_language: String,
    region: String,
    image_base_url: String,
}

impl DiscoveryService {
    pub fn new(provider: Arc<dyn MetadataProvider>, config: &Config) -> Self {
        Self {
            provider,
            language: config.language.clone(),
            video_language: config.video_language.clone(),
            region: config.region.clone(),
            image_base_url: config.image_base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn provider(&self) -> &Arc<dyn MetadataProvider> {
        &self.provider
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Logo language preference: the UI language first, then English
    fn logo_languages(&self) -> Vec<&str> {
        let primary = self.language.split('-').next().unwrap_or(FALLBACK_LOGO_LANGUAGE);
        if primary == FALLBACK_LOGO_LANGUAGE {
            vec![primary]
        } else {
            vec![primary, FALLBACK_LOGO_LANGUAGE]
        }
    }

    fn image_url(&self, file_path: &str) -> String {
        format!("{}{}", self.image_base_url, file_path)
    }

    pub async fn page(&self, category: Category, page: u32) -> AppResult<MoviePage> {
        self.provider.fetch_page(category, page, &self.language).await
    }

    pub async fn search(&self, query: &str) -> AppResult<MoviePage> {
        self.provider.search_by_title(query, &self.language).await
    }

    pub async fn genres(&self) -> AppResult<GenreList> {
        self.provider.fetch_genres(&self.language).await
    }

    /// Assembles the detail view for one movie.
    ///
    /// The six primary lookups run concurrently and any failure fails the
    /// overview. Logo and collection are best-effort.
    pub async fn overview(&self, id: MovieId) -> AppResult<MovieOverview> {
        let provider = self.provider.as_ref();
        let language = self.language.as_str();

        let (detail, credits, recommendations, videos, providers, release_dates) = tokio::try_join!(
            provider.fetch_detail(id, language),
            provider.fetch_credits(id, language),
            provider.fetch_recommendations(id, language),
            provider.fetch_videos(id, &self.video_language),
            provider.fetch_watch_providers(id),
            provider.fetch_release_dates(id),
        )?;

        let logo_url = match provider.fetch_images(id).await {
            Ok(images) => images
                .preferred_logo(&self.logo_languages())
                .map(|logo| self.image_url(&logo.file_path)),
            Err(e) => {
                tracing::warn!(error = %e, movie_id = id, "Logo lookup failed");
                None
            }
        };

        let collection = match &detail.belongs_to_collection {
            Some(collection_ref) => {
                match provider.fetch_collection(collection_ref.id, language).await {
                    Ok(collection) => Some(collection),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            movie_id = id,
                            collection_id = collection_ref.id,
                            "Collection lookup failed"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        tracing::info!(movie_id = id, "Movie overview assembled");

        Ok(MovieOverview {
            release_year: detail.release_year().map(str::to_string),
            director: credits.director().cloned(),
            cast: credits.cast,
            recommendations: recommendations.results,
            trailers: videos.trailers(),
            watch_providers: providers.flatrate(&self.region),
            certification: release_dates.certification(&self.region),
            logo_url,
            collection,
            detail,
        })
    }

    /// Top-rated carousel: the first ten non-adult movies with logo and runtime
    pub async fn featured(&self) -> AppResult<Vec<FeaturedMovie>> {
        let (page, genres) = tokio::join!(
            self.provider.fetch_page(Category::Top, 1, &self.language),
            self.provider.fetch_genres(&self.language),
        );
        let page = page?;
        let genres = genres.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Genre list unavailable, featured labels left empty");
            GenreList { genres: Vec::new() }
        });

        let movies: Vec<Movie> = page
            .results
            .into_iter()
            .filter(|m| !m.adult)
            .take(FEATURED_COUNT)
            .collect();

        let enriched = join_all(movies.into_iter().map(|movie| self.enrich(movie, &genres))).await;
        Ok(enriched)
    }

    async fn enrich(&self, movie: Movie, genres: &GenreList) -> FeaturedMovie {
        let provider = self.provider.as_ref();
        let (logo_url, runtime) = match tokio::try_join!(
            provider.fetch_images(movie.id),
            provider.fetch_detail(movie.id, &self.language),
        ) {
            Ok((images, detail)) => (
                images
                    .preferred_logo(&self.logo_languages())
                    .map(|logo| self.image_url(&logo.file_path)),
                detail.runtime,
            ),
            Err(e) => {
                tracing::warn!(error = %e, movie_id = movie.id, "Featured artwork lookup failed");
                (None, None)
            }
        };

        let genre_label = movie
            .genre_ids
            .iter()
            .filter_map(|id| genres.name_of(*id))
            .take(FEATURED_GENRES)
            .collect::<Vec<_>>()
            .join(" | ");

        FeaturedMovie {
            stars: StarRating::from_vote_average(movie.vote_average),
            movie,
            logo_url,
            runtime,
            genre_label,
        }
    }
}
