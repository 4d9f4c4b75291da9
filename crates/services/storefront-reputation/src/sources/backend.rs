use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use storefront_types::{collect_sample_reviews, Locale, ReviewCandidate, SourceReport};

use crate::config::ReputationConfig;
use crate::error::SourceError;

use super::{ensure_success, SourceClient};

pub const BACKEND_REVIEWS_PATH: &str = "/api/reviews";

/// Reads reputation data through the site's own backend proxy.
pub struct BackendClient {
    http: Client,
    base_url: String,
    locale: Locale,
}

#[derive(Debug, Deserialize)]
struct BackendPayload {
    rating: Option<f64>,
    total_reviews: Option<u64>,
    stats: Option<BackendStats>,
    reviews: Option<Vec<BackendReview>>,
    google_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BackendStats {
    total_reviews: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct BackendReview {
    author_name: Option<String>,
    name: Option<String>,
    author: Option<String>,
    rating: Option<f64>,
    text: Option<String>,
    relative_time_description: Option<String>,
    time: Option<ReviewTime>,
    date: Option<ReviewTime>,
}

/// The proxy passes review times through as either epoch seconds or text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReviewTime {
    Epoch(f64),
    Text(String),
}

impl BackendClient {
    pub fn new(http: Client, base_url: String, locale: Locale) -> Self {
        Self { http, base_url, locale }
    }

    pub fn from_config(config: &ReputationConfig, http: Client) -> Self {
        Self::new(http, config.backend.base_url.clone(), config.locale)
    }
}

#[async_trait]
impl SourceClient for BackendClient {
    async fn fetch_reputation(&self) -> Result<SourceReport, SourceError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), BACKEND_REVIEWS_PATH);
        tracing::debug!("Querying reviews backend at {}", url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(SourceError::from_reqwest)?;
        let resp = ensure_success(resp, "reviews backend").await?;

        let payload: BackendPayload = resp.json().await.map_err(SourceError::from_reqwest)?;
        Ok(normalize_payload(payload, self.locale))
    }
}

/// Returns the display string and, when known, the publication instant.
fn review_time(
    relative: Option<String>,
    time: Option<ReviewTime>,
    locale: Locale,
) -> (String, Option<DateTime<Utc>>) {
    let published_at = match &time {
        Some(ReviewTime::Epoch(secs)) => DateTime::<Utc>::from_timestamp(*secs as i64, 0),
        Some(ReviewTime::Text(raw)) => DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|at| at.with_timezone(&Utc)),
        None => None,
    };

    if let Some(description) = relative.filter(|d| !d.is_empty()) {
        return (description, published_at);
    }
    let display = match (published_at, time) {
        (Some(at), _) => locale.format_date(at),
        (None, Some(ReviewTime::Text(raw))) => raw,
        _ => String::new(),
    };
    (display, published_at)
}

fn normalize_payload(payload: BackendPayload, locale: Locale) -> SourceReport {
    let candidates = payload.reviews.unwrap_or_default().into_iter().filter_map(|review| {
        let (relative_time, published_at) =
            review_time(review.relative_time_description, review.time.or(review.date), locale);
        let author_name = review.author_name.or(review.name).or(review.author);
        ReviewCandidate::normalize(
            author_name,
            review.rating,
            review.text,
            relative_time,
            published_at,
        )
    });

    SourceReport {
        rating: payload.rating,
        total_review_count: payload
            .total_reviews
            .or_else(|| payload.stats.and_then(|s| s.total_reviews)),
        reviews: collect_sample_reviews(candidates),
        review_page_url: payload.google_url,
    }
}
