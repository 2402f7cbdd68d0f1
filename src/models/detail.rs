use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::movie::{Genre, Movie, MovieId};

/// Full record from the movie detail endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieDetail {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub original_title: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub belongs_to_collection: Option<CollectionRef>,
    #[serde(default)]
    pub production_countries: Vec<ProductionCountry>,
}

impl MovieDetail {
    /// Four-digit release year, if the release date is known
    pub fn release_year(&self) -> Option<&str> {
        self.release_date
            .as_deref()
            .filter(|date| date.len() >= 4)
            .and_then(|date| date.get(..4))
    }

    /// List-shaped snapshot of this movie, as stored in bookmarks
    pub fn to_movie(&self) -> Movie {
        Movie {
            id: self.id,
            title: self.title.clone(),
            poster_path: self.poster_path.clone(),
            backdrop_path: self.backdrop_path.clone(),
            overview: self.overview.clone(),
            vote_average: self.vote_average,
            genre_ids: self.genres.iter().map(|g| g.id).collect(),
            adult: self.adult,
            release_date: self.release_date.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionRef {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductionCountry {
    pub iso_3166_1: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
    #[serde(default)]
    pub crew: Vec<CrewMember>,
}

impl Credits {
    pub fn director(&self) -> Option<&CrewMember> {
        self.crew.iter().find(|c| c.job == "Director")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrewMember {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub job: String,
    #[serde(default)]
    pub profile_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VideoList {
    #[serde(default)]
    pub results: Vec<Video>,
}

impl VideoList {
    /// YouTube trailers and teasers, in provider order
    pub fn trailers(&self) -> Vec<Video> {
        self.results
            .iter()
            .filter(|v| v.site == "YouTube" && (v.video_type == "Trailer" || v.video_type == "Teaser"))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Video {
    pub key: String,
    #[serde(default)]
    pub name: String,
    pub site: String,
    #[serde(rename = "type")]
    pub video_type: String,
}

/// Watch providers keyed by region code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchProviderResponse {
    #[serde(default)]
    pub results: HashMap<String, RegionProviders>,
}

impl WatchProviderResponse {
    /// Subscription ("flatrate") providers for a region, empty if none.
    /// Known services get their home page filled in.
    pub fn flatrate(&self, region: &str) -> Vec<WatchProvider> {
        self.results
            .get(region)
            .map(|r| r.flatrate.iter().cloned().map(WatchProvider::with_homepage).collect())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegionProviders {
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub flatrate: Vec<WatchProvider>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WatchProvider {
    pub provider_id: u64,
    pub provider_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
    /// Link target on the detail page; not part of the provider payload
    #[serde(default)]
    pub homepage: Option<String>,
}

impl WatchProvider {
    fn with_homepage(mut self) -> Self {
        if self.homepage.is_none() {
            self.homepage = provider_homepage(&self.provider_name).map(str::to_string);
        }
        self
    }
}

/// Home page of well-known streaming services, by provider display name
pub fn provider_homepage(provider_name: &str) -> Option<&'static str> {
    match provider_name {
        "Netflix" => Some("https://www.netflix.com"),
        "Disney Plus" | "Disney" => Some("https://www.disneyplus.com"),
        "Amazon Prime Video" => Some("https://www.primevideo.com"),
        "wavve" => Some("https://www.wavve.com"),
        "Watcha" => Some("https://watcha.com"),
        "TVING" => Some("https://www.tving.com"),
        "CoupangPlay" => Some("https://www.coupangplay.com"),
        "AppleTV" => Some("https://tv.apple.com"),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseDatesResponse {
    #[serde(default)]
    pub results: Vec<CountryReleases>,
}

impl ReleaseDatesResponse {
    /// First non-empty age certification for a region
    pub fn certification(&self, region: &str) -> Option<String> {
        self.results
            .iter()
            .find(|r| r.iso_3166_1 == region)?
            .release_dates
            .iter()
            .map(|d| d.certification.trim())
            .find(|c| !c.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountryReleases {
    pub iso_3166_1: String,
    #[serde(default)]
    pub release_dates: Vec<ReleaseDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseDate {
    #[serde(default)]
    pub certification: String,
    #[serde(default)]
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageSet {
    #[serde(default)]
    pub logos: Vec<ImageFile>,
}

impl ImageSet {
    /// First logo matching the earliest language in `languages`
    pub fn preferred_logo(&self, languages: &[&str]) -> Option<&ImageFile> {
        languages.iter().find_map(|lang| {
            self.logos
                .iter()
                .find(|logo| logo.iso_639_1.as_deref() == Some(*lang))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageFile {
    pub file_path: String,
    #[serde(default)]
    pub iso_639_1: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Collection {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub parts: Vec<Movie>,
}

/// Everything the detail view shows for one movie
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MovieOverview {
    pub detail: MovieDetail,
    pub release_year: Option<String>,
    pub cast: Vec<CastMember>,
    pub director: Option<CrewMember>,
    pub recommendations: Vec<Movie>,
    pub trailers: Vec<Video>,
    pub watch_providers: Vec<WatchProvider>,
    pub certification: Option<String>,
    pub logo_url: Option<String>,
    pub collection: Option<Collection>,
}
