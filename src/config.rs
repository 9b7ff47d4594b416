//! Runtime configuration for the pokedex client

use std::path::PathBuf;
use std::time::Duration;

/// Default personal backend (local development server)
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

/// Default public catalog
pub const DEFAULT_CATALOG_URL: &str = "https://pokeapi.co/api/v2";

/// Client configuration.
///
/// ```rust,ignore
/// let config = Config::default()
///     .with_backend_url("https://pokedex.example.com")
///     .with_session_path(None);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    pub catalog_url: String,
    /// Where the session token survives restarts; `None` keeps it in memory only
    pub session_path: Option<PathBuf>,
    pub request_timeout: Duration,
    /// Grace period for entries that do not set their own
    pub default_keep_unused_for: Duration,
    pub collection_list_keep_unused_for: Duration,
    pub collection_detail_keep_unused_for: Duration,
    pub catalog_keep_unused_for: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            session_path: default_session_path(),
            request_timeout: Duration::from_secs(30),
            default_keep_unused_for: Duration::from_secs(60),
            collection_list_keep_unused_for: Duration::from_secs(60),
            collection_detail_keep_unused_for: Duration::from_secs(120),
            catalog_keep_unused_for: Duration::from_secs(300),
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_backend_url(mut self, url: impl Into<String>) -> Self {
        self.backend_url = url.into();
        self
    }

    #[must_use]
    pub fn with_catalog_url(mut self, url: impl Into<String>) -> Self {
        self.catalog_url = url.into();
        self
    }

    #[must_use]
    pub fn with_session_path(mut self, path: Option<PathBuf>) -> Self {
        self.session_path = path;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Override every grace period at once (handy for short-lived tools and tests).
    #[must_use]
    pub fn with_keep_unused_for(mut self, keep: Duration) -> Self {
        self.default_keep_unused_for = keep;
        self.collection_list_keep_unused_for = keep;
        self.collection_detail_keep_unused_for = keep;
        self.catalog_keep_unused_for = keep;
        self
    }
}

/// Returns the default session file: ~/.local/share/pokedex/session.json
pub fn default_session_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("pokedex").join("session.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_backend_conventions() {
        let config = Config::default();
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(config.catalog_url, DEFAULT_CATALOG_URL);
        assert_eq!(config.collection_list_keep_unused_for, Duration::from_secs(60));
        assert_eq!(config.collection_detail_keep_unused_for, Duration::from_secs(120));
    }

    #[test]
    fn builder_overrides() {
        let config = Config::default()
            .with_backend_url("http://127.0.0.1:9999")
            .with_session_path(None)
            .with_keep_unused_for(Duration::from_millis(10));

        assert_eq!(config.backend_url, "http://127.0.0.1:9999");
        assert!(config.session_path.is_none());
        assert_eq!(config.catalog_keep_unused_for, Duration::from_millis(10));
        assert_eq!(config.default_keep_unused_for, Duration::from_millis(10));
    }
}
