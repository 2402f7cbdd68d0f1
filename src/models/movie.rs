use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

/// Provider identifier of a movie
pub type MovieId = u64;

/// A movie as it appears in list, search and recommendation results.
///
/// Bookmarks persist this exact shape, so unknown fields are ignored and
/// optional ones default rather than failing the whole record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
    #[serde(default)]
    pub adult: bool,
    #[serde(default)]
    pub release_date: Option<String>,
}

impl Movie {
    /// Creates a bare movie record with only the required fields
    pub fn new(id: MovieId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            poster_path: None,
            backdrop_path: None,
            overview: None,
            vote_average: 0.0,
            genre_ids: Vec::new(),
            adult: false,
            release_date: None,
        }
    }

    pub fn has_genre(&self, genre_id: u32) -> bool {
        self.genre_ids.contains(&genre_id)
    }
}

/// One page of a paginated list endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MoviePage {
    pub page: u32,
    pub results: Vec<Movie>,
    #[serde(default)]
    pub total_pages: u32,
    #[serde(default)]
    pub total_results: u32,
}

/// List category shown in the main feed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Popular,
    /// Weekly trending
    Week,
    /// Top rated
    Top,
}

impl Category {
    /// Provider path for this category, relative to the API base URL
    pub fn path(&self) -> &'static str {
        match self {
            Category::Popular => "/movie/popular",
            Category::Week => "/trending/movie/week",
            Category::Top => "/movie/top_rated",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Popular => "popular",
            Category::Week => "week",
            Category::Top => "top",
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "popular" => Ok(Category::Popular),
            "week" | "trending" => Ok(Category::Week),
            "top" | "top_rated" => Ok(Category::Top),
            other => Err(format!("unknown category '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: u32,
    pub name: String,
}

/// Response of the genre list endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenreList {
    pub genres: Vec<Genre>,
}

impl GenreList {
    pub fn name_of(&self, id: u32) -> Option<&str> {
        self.genres
            .iter()
            .find(|g| g.id == id)
            .map(|g| g.name.as_str())
    }
}
