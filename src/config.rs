use std::time::Duration;

use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// TMDB v4 read access token, sent as a bearer token
    pub tmdb_api_token: String,

    /// TMDB API base URL
    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    /// Language used for lists, details, credits, search and collections
    #[serde(default = "default_language")]
    pub language: String,

    /// Language used for trailer lookups
    #[serde(default = "default_video_language")]
    pub video_language: String,

    /// Region used for watch providers and age certification
    #[serde(default = "default_region")]
    pub region: String,

    /// Prefix prepended to logo and poster file paths
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,

    /// Redis connection URL (response cache and bookmark storage)
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Quiet period before a search query is dispatched
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_language() -> String {
    "ko-KR".to_string()
}

fn default_video_language() -> String {
    "en-US".to_string()
}

fn default_region() -> String {
    "KR".to_string()
}

fn default_image_base_url() -> String {
    "https://image.tmdb.org/t/p/original".to_string()
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Configuration with defaults for everything but the token
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            tmdb_api_token: token.into(),
            tmdb_api_url: default_tmdb_api_url(),
            language: default_language(),
            video_language: default_video_language(),
            region: default_region(),
            image_base_url: default_image_base_url(),
            redis_url: default_redis_url(),
            search_debounce_ms: default_search_debounce_ms(),
            host: default_host(),
            port: default_port(),
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_fields() {
        let vars = vec![("TMDB_API_TOKEN".to_string(), "secret".to_string())];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.tmdb_api_token, "secret");
        assert_eq!(config.tmdb_api_url, "https://api.themoviedb.org/3");
        assert_eq!(config.language, "ko-KR");
        assert_eq!(config.video_language, "en-US");
        assert_eq!(config.region, "KR");
        assert_eq!(config.search_debounce(), Duration::from_millis(300));
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }

    #[test]
    fn test_missing_token_is_an_error() {
        let vars: Vec<(String, String)> = vec![("PORT".to_string(), "8080".to_string())];
        assert!(envy::from_iter::<_, Config>(vars).is_err());
    }

    #[test]
    fn test_overrides() {
        let vars = vec![
            ("TMDB_API_TOKEN".to_string(), "secret".to_string()),
            ("SEARCH_DEBOUNCE_MS".to_string(), "200".to_string()),
            ("REGION".to_string(), "US".to_string()),
            ("PORT".to_string(), "8080".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();

        assert_eq!(config.search_debounce(), Duration::from_millis(200));
        assert_eq!(config.region, "US");
        assert_eq!(config.port, 8080);
    }
}
