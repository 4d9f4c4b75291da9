use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use storefront_types::{collect_sample_reviews, Locale, ReviewCandidate, SourceReport};

use crate::config::{PlacesCredentials, ReputationConfig};
use crate::error::SourceError;

use super::{ensure_success, SourceClient};

/// Field mask sent to the places REST endpoint.
pub const REST_FIELD_MASK: &str = "rating,userRatingCount,reviews,googleMapsUri";

/// Reads place data from the vendor's REST API.
pub struct RestClient {
    http: Client,
    credentials: Option<PlacesCredentials>,
    base_url: String,
    locale: Locale,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacePayload {
    rating: Option<f64>,
    user_rating_count: Option<u64>,
    #[serde(rename = "total_reviews")]
    total_reviews: Option<u64>,
    reviews: Option<Vec<PlacePayloadReview>>,
    google_maps_uri: Option<String>,
    #[serde(rename = "google_url")]
    google_url: Option<String>,
}

impl PlacePayload {
    /// Vendor field first, then the proxy-normalized name.
    fn review_count(&self) -> Option<u64> {
        self.user_rating_count.or(self.total_reviews)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlacePayloadReview {
    rating: Option<f64>,
    author_attribution: Option<AuthorAttribution>,
    #[serde(rename = "author_name")]
    author_name: Option<String>,
    original_text: Option<LocalizedText>,
    text: Option<ReviewText>,
    relative_publish_time_description: Option<String>,
    #[serde(rename = "relative_time_description")]
    relative_time_description: Option<String>,
    publish_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorAttribution {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocalizedText {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReviewText {
    Plain(String),
    Localized(LocalizedText),
}

impl ReviewText {
    fn into_text(self) -> Option<String> {
        match self {
            ReviewText::Plain(text) => Some(text),
            ReviewText::Localized(localized) => localized.text,
        }
    }
}

impl RestClient {
    pub fn new(
        http: Client,
        credentials: Option<PlacesCredentials>,
        base_url: String,
        locale: Locale,
    ) -> Self {
        Self { http, credentials, base_url, locale }
    }

    pub fn from_config(config: &ReputationConfig, http: Client) -> Self {
        Self::new(
            http,
            config.places.credentials(),
            config.places.rest_base_url.clone(),
            config.locale,
        )
    }
}

/// Place ids may be given bare or as a `places/{id}` resource name.
fn place_resource_name(place_id: &str) -> String {
    if place_id.starts_with("places/") {
        place_id.to_string()
    } else {
        format!("places/{}", place_id)
    }
}

#[async_trait]
impl SourceClient for RestClient {
    async fn fetch_reputation(&self) -> Result<SourceReport, SourceError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            SourceError::ConfigurationMissing("places api_key and place_id are required by the REST source".into())
        })?;

        let url = format!(
            "{}/v1/{}",
            self.base_url.trim_end_matches('/'),
            place_resource_name(&credentials.place_id)
        );
        tracing::debug!("Querying places REST endpoint {}", url);

        let resp = self
            .http
            .get(&url)
            .query(&[
                ("languageCode", self.locale.language_code()),
                ("fields", REST_FIELD_MASK),
                ("key", credentials.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(SourceError::from_reqwest)?;
        let resp = ensure_success(resp, "places REST").await?;

        let payload: PlacePayload = resp.json().await.map_err(SourceError::from_reqwest)?;
        if payload.rating.is_none() && payload.review_count().is_none() {
            return Err(SourceError::MalformedResponse(
                "places REST payload has neither rating nor review count".into(),
            ));
        }

        Ok(normalize_payload(payload, self.locale))
    }
}

fn normalize_payload(payload: PlacePayload, locale: Locale) -> SourceReport {
    let total_review_count = payload.review_count();
    let candidates = payload.reviews.unwrap_or_default().into_iter().filter_map(|review| {
        let published_at = review
            .publish_time
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|at| at.with_timezone(&Utc));
        let description = review
            .relative_publish_time_description
            .filter(|d| !d.is_empty())
            .or(review.relative_time_description);
        let relative_time = match description.filter(|d| !d.is_empty()) {
            Some(description) => description,
            None => published_at.map(|at| locale.format_date(at)).unwrap_or_default(),
        };
        let author_name = review
            .author_attribution
            .and_then(|a| a.display_name)
            .or(review.author_name);
        let text = review
            .original_text
            .and_then(|t| t.text)
            .or_else(|| review.text.and_then(ReviewText::into_text));

        ReviewCandidate::normalize(author_name, review.rating, text, relative_time, published_at)
    });

    SourceReport {
        rating: payload.rating,
        total_review_count,
        reviews: collect_sample_reviews(candidates),
        review_page_url: payload.google_maps_uri.or(payload.google_url),
    }
}
