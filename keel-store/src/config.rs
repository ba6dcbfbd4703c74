//! Store configuration.

/// Connection and paging configuration for a store adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Project data key, `<project_id>_<token>`.
    pub data_key: String,
    /// Store host override; `None` uses the adapter default.
    pub host: Option<String>,
    /// Page size requested from bulk fetches.
    pub page_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_key: String::new(),
            host: None,
            page_size: 1000,
        }
    }
}

impl StoreConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// - `KEEL_DATA_KEY`: project data key
    /// - `KEEL_STORE_HOST`: store host override
    /// - `KEEL_PAGE_SIZE`: bulk fetch page size
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            data_key: std::env::var("KEEL_DATA_KEY").unwrap_or(defaults.data_key),
            host: std::env::var("KEEL_STORE_HOST").ok(),
            page_size: std::env::var("KEEL_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.page_size),
        }
    }

    /// The project id segment of the data key.
    pub fn project_id(&self) -> &str {
        self.data_key.split('_').next().unwrap_or("")
    }
}

// =============================================================================
// TESTS
// =============================================================================
