//! Page-wide registry for the vendor places SDK.
//!
//! The SDK is "injected" into the page at most once per process: the first
//! caller of [`SdkRegistry::ensure_loaded`] inserts the script tag and drives
//! the load, every concurrent or later caller awaits that same outcome. A
//! failed load stays failed for the registry's lifetime.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, Url};
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

use crate::error::SourceError;
use crate::metrics;

/// DOM id of the SDK script tag.
pub const SDK_SCRIPT_ID: &str = "places-sdk";

static GLOBAL_SDK_REGISTRY: Lazy<Arc<SdkRegistry>> = Lazy::new(|| Arc::new(SdkRegistry::new()));

/// A script element present in the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTag {
    pub id: String,
    pub src: String,
}

impl ScriptTag {
    /// Tag loading the places library for the given key.
    pub fn places_sdk(base_url: &str, api_key: &str) -> Result<Self, SourceError> {
        let endpoint = format!("{}/maps/api/js", base_url.trim_end_matches('/'));
        let src = Url::parse_with_params(&endpoint, &[("key", api_key), ("libraries", "places")])
            .map_err(|e| SourceError::SdkLoad(format!("invalid SDK script URL {}: {}", endpoint, e)))?;
        Ok(Self {
            id: SDK_SCRIPT_ID.to_string(),
            src: src.to_string(),
        })
    }
}

/// Inserts a script into the page and resolves once it has loaded.
#[async_trait]
pub trait ScriptInjector: Send + Sync {
    async fn inject(&self, tag: &ScriptTag, api_key: &str) -> Result<PlacesSdk, SourceError>;
}

/// Loads the SDK script over HTTP.
pub struct HttpScriptInjector {
    client: Client,
    base_url: String,
}

impl HttpScriptInjector {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }
}

#[async_trait]
impl ScriptInjector for HttpScriptInjector {
    async fn inject(&self, tag: &ScriptTag, api_key: &str) -> Result<PlacesSdk, SourceError> {
        tracing::debug!("Loading SDK script {} from {}", tag.id, tag.src);
        let resp = self
            .client
            .get(&tag.src)
            .send()
            .await
            .map_err(|e| SourceError::SdkLoad(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(SourceError::SdkLoad(format!(
                "script {} responded with HTTP {}",
                tag.id,
                resp.status()
            )));
        }

        Ok(PlacesSdk::new(
            self.client.clone(),
            self.base_url.clone(),
            api_key.to_string(),
        ))
    }
}

/// The page: injected script tags plus the memoized SDK load.
pub struct SdkRegistry {
    tags: Mutex<Vec<ScriptTag>>,
    load: OnceCell<Result<PlacesSdk, SourceError>>,
}

impl Default for SdkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SdkRegistry {
    pub fn new() -> Self {
        Self {
            tags: Mutex::new(Vec::new()),
            load: OnceCell::new(),
        }
    }

    /// Process-wide registry shared by every SDK source.
    pub fn global() -> Arc<Self> {
        GLOBAL_SDK_REGISTRY.clone()
    }

    /// Load the SDK if needed and return its handle.
    pub async fn ensure_loaded(
        &self,
        base_url: &str,
        api_key: &str,
        injector: &dyn ScriptInjector,
    ) -> Result<PlacesSdk, SourceError> {
        self.load
            .get_or_init(|| self.load_once(base_url, api_key, injector))
            .await
            .clone()
    }

    async fn load_once(
        &self,
        base_url: &str,
        api_key: &str,
        injector: &dyn ScriptInjector,
    ) -> Result<PlacesSdk, SourceError> {
        let tag = ScriptTag::places_sdk(base_url, api_key)?;
        if self.insert_tag(tag.clone()) {
            metrics::record_sdk_script_load();
            tracing::info!("Injected SDK script tag {}", tag.id);
        } else {
            // A previous load attempt was dropped mid-flight; reuse its tag.
            tracing::debug!("SDK script tag {} already present", tag.id);
        }

        let outcome = injector.inject(&tag, api_key).await;
        if let Err(e) = &outcome {
            tracing::warn!("SDK load failed and will not be retried this session: {}", e);
        }
        outcome
    }

    fn insert_tag(&self, tag: ScriptTag) -> bool {
        let mut tags = self.tags.lock().unwrap_or_else(PoisonError::into_inner);
        if tags.iter().any(|t| t.id == tag.id) {
            return false;
        }
        tags.push(tag);
        true
    }

    /// Snapshot of the script tags currently in the page.
    pub fn script_tags(&self) -> Vec<ScriptTag> {
        self.tags
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.load.get(), Some(Ok(_)))
    }
}

/// Status codes reported by the places service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacesServiceStatus {
    Ok,
    ZeroResults,
    NotFound,
    InvalidRequest,
    OverQueryLimit,
    RequestDenied,
    #[serde(other)]
    UnknownError,
}

#[derive(Debug, Clone)]
pub struct PlaceDetailsRequest {
    pub place_id: String,
    pub fields: Vec<&'static str>,
    pub language: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaceResult {
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u64>,
    pub reviews: Option<Vec<PlaceReview>>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceReview {
    pub author_name: Option<String>,
    pub rating: Option<f64>,
    pub text: Option<String>,
    pub relative_time_description: Option<String>,
    /// Epoch seconds.
    pub time: Option<i64>,
}

#[derive(Deserialize)]
struct DetailsResponse {
    status: PlacesServiceStatus,
    result: Option<PlaceResult>,
}

/// Handle to a loaded SDK. Its API is callback based, like the vendor's.
#[derive(Debug, Clone)]
pub struct PlacesSdk {
    client: Client,
    base_url: String,
    api_key: String,
}

impl PlacesSdk {
    pub fn new(client: Client, base_url: String, api_key: String) -> Self {
        Self { client, base_url, api_key }
    }

    /// Request place details; `callback` runs exactly once on a background task.
    pub fn get_details<F>(&self, request: PlaceDetailsRequest, callback: F)
    where
        F: FnOnce(Option<PlaceResult>, PlacesServiceStatus) + Send + 'static,
    {
        let sdk = self.clone();
        tokio::spawn(async move {
            let (place, status) = sdk.fetch_details(&request).await;
            callback(place, status);
        });
    }

    async fn fetch_details(
        &self,
        request: &PlaceDetailsRequest,
    ) -> (Option<PlaceResult>, PlacesServiceStatus) {
        let url = format!(
            "{}/maps/api/place/details/json",
            self.base_url.trim_end_matches('/')
        );
        let fields = request.fields.join(",");

        let resp = match self
            .client
            .get(&url)
            .query(&[
                ("place_id", request.place_id.as_str()),
                ("fields", fields.as_str()),
                ("language", request.language.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!("Place details request for {} failed: {}", request.place_id, e);
                return (None, PlacesServiceStatus::UnknownError);
            }
        };

        if !resp.status().is_success() {
            tracing::warn!(
                "Place details request for {} returned HTTP {}",
                request.place_id,
                resp.status()
            );
            return (None, PlacesServiceStatus::UnknownError);
        }

        match resp.json::<DetailsResponse>().await {
            Ok(body) => (body.result, body.status),
            Err(e) => {
                tracing::warn!("Failed to parse place details for {}: {}", request.place_id, e);
                (None, PlacesServiceStatus::UnknownError)
            }
        }
    }
}
