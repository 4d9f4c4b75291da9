use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use storefront_types::{BusinessProfile, Locale};

/// Per-source wait bound used when the config does not set one.
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 8;

pub const ENV_PLACES_API_KEY: &str = "PLACES_API_KEY";
pub const ENV_PLACES_PLACE_ID: &str = "PLACES_PLACE_ID";
pub const ENV_BACKEND_URL: &str = "REVIEWS_BACKEND_URL";

/// Configuration for the reputation resolver.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ReputationConfig {
    /// Optional log level string (e.g., "info", "storefront_reputation=debug").
    pub log_level: Option<String>,

    /// Locale used to format review dates and sent to vendor APIs.
    pub locale: Locale,

    /// Maximum time a single source may take before the chain moves on.
    pub source_timeout_secs: u64,

    /// Optional port for the Prometheus metrics HTTP endpoint.
    pub metrics_port: Option<u16>,

    pub places: PlacesConfig,
    pub backend: BackendConfig,
    pub business: BusinessProfile,
}

/// Vendor place-data settings shared by the SDK and REST sources.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PlacesConfig {
    pub api_key: Option<String>,
    pub place_id: Option<String>,
    pub sdk_base_url: String,
    pub rest_base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
}

/// API key and place identifier, both present and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacesCredentials {
    pub api_key: String,
    pub place_id: String,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            log_level: None,
            locale: Locale::default(),
            source_timeout_secs: DEFAULT_SOURCE_TIMEOUT_SECS,
            metrics_port: None,
            places: PlacesConfig::default(),
            backend: BackendConfig::default(),
            business: default_business_profile(),
        }
    }
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            place_id: None,
            sdk_base_url: "https://maps.googleapis.com".to_string(),
            rest_base_url: "https://places.googleapis.com".to_string(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:8001".to_string() }
    }
}

fn default_business_profile() -> BusinessProfile {
    BusinessProfile {
        name: "Artimon Bike Nautique".to_string(),
        rating: 4.6,
        review_count: 174,
        review_page_url: "https://g.page/r/Cfk6UbA9DChAEAg/review".to_string(),
        featured_reviews: Vec::new(),
    }
}

impl PlacesConfig {
    /// Returns the credential pair, or `None` if either half is absent or blank.
    pub fn credentials(&self) -> Option<PlacesCredentials> {
        let api_key = non_blank(self.api_key.as_deref())?;
        let place_id = non_blank(self.place_id.as_deref())?;
        Some(PlacesCredentials { api_key, place_id })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl ReputationConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        tracing::info!("Loading reputation config from: {:?}", path_ref);
        let text = fs::read_to_string(path_ref)
            .map_err(|e| anyhow::anyhow!("Failed to read reputation config at {:?}: {}", path_ref, e))?;
        let mut config: Self = toml::from_str(&text)
            .map_err(|e| anyhow::anyhow!("Failed to parse reputation config TOML at {:?}: {}", path_ref, e))?;
        let adjusted = config.business.sanitize_featured_reviews();
        if adjusted > 0 {
            tracing::warn!(
                "{} featured review(s) had ratings outside 1..=5 and were clamped or dropped",
                adjusted
            );
        }
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup; blank values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = non_blank(lookup(ENV_PLACES_API_KEY).as_deref()) {
            self.places.api_key = Some(key);
        }
        if let Some(place_id) = non_blank(lookup(ENV_PLACES_PLACE_ID).as_deref()) {
            self.places.place_id = Some(place_id);
        }
        if let Some(url) = non_blank(lookup(ENV_BACKEND_URL).as_deref()) {
            self.backend.base_url = url;
        }
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs.max(1))
    }
}
