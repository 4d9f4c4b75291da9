use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::sync::Arc;
use storefront_types::{collect_sample_reviews, Locale, ReviewCandidate, SourceReport};
use tokio::sync::oneshot;

use crate::config::{PlacesCredentials, ReputationConfig};
use crate::error::SourceError;
use crate::sdk_loader::{
    HttpScriptInjector, PlaceDetailsRequest, PlaceResult, PlacesSdk, PlacesServiceStatus,
    ScriptInjector, SdkRegistry,
};

use super::SourceClient;

/// Place fields requested through the SDK.
pub const SDK_DETAIL_FIELDS: [&str; 4] = ["rating", "user_ratings_total", "reviews", "url"];

/// Reads place data through the page-embedded vendor SDK.
pub struct SdkClient {
    credentials: Option<PlacesCredentials>,
    base_url: String,
    locale: Locale,
    registry: Arc<SdkRegistry>,
    injector: Arc<dyn ScriptInjector>,
}

impl SdkClient {
    pub fn new(
        credentials: Option<PlacesCredentials>,
        base_url: String,
        locale: Locale,
        registry: Arc<SdkRegistry>,
        injector: Arc<dyn ScriptInjector>,
    ) -> Self {
        Self { credentials, base_url, locale, registry, injector }
    }

    pub fn from_config(config: &ReputationConfig, http: Client, registry: Arc<SdkRegistry>) -> Self {
        let base_url = config.places.sdk_base_url.clone();
        let injector = Arc::new(HttpScriptInjector::new(http, base_url.clone()));
        Self::new(
            config.places.credentials(),
            base_url,
            config.locale,
            registry,
            injector,
        )
    }
}

#[async_trait]
impl SourceClient for SdkClient {
    async fn fetch_reputation(&self) -> Result<SourceReport, SourceError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| {
            SourceError::ConfigurationMissing("places api_key and place_id are required by the SDK source".into())
        })?;

        let sdk = self
            .registry
            .ensure_loaded(&self.base_url, &credentials.api_key, self.injector.as_ref())
            .await?;

        let request = PlaceDetailsRequest {
            place_id: credentials.place_id.clone(),
            fields: SDK_DETAIL_FIELDS.to_vec(),
            language: self.locale.language_code().to_string(),
        };
        let (place, status) = request_details(&sdk, request).await?;

        if status != PlacesServiceStatus::Ok {
            return Err(SourceError::Transport(format!("places service status {:?}", status)));
        }
        let place = place
            .ok_or_else(|| SourceError::Transport("places service returned no result".into()))?;

        tracing::debug!(
            "SDK place details: rating={:?} total={:?}",
            place.rating,
            place.user_ratings_total
        );
        Ok(normalize_place(place, self.locale))
    }
}

/// Adapt the SDK's callback into an awaitable result.
async fn request_details(
    sdk: &PlacesSdk,
    request: PlaceDetailsRequest,
) -> Result<(Option<PlaceResult>, PlacesServiceStatus), SourceError> {
    let (tx, rx) = oneshot::channel();
    sdk.get_details(request, move |place, status| {
        let _ = tx.send((place, status));
    });
    rx.await
        .map_err(|_| SourceError::Transport("places service dropped the details callback".into()))
}

fn normalize_place(place: PlaceResult, locale: Locale) -> SourceReport {
    let candidates = place.reviews.unwrap_or_default().into_iter().filter_map(|review| {
        let published_at = review
            .time
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0));
        let relative_time = match review.relative_time_description.filter(|d| !d.is_empty()) {
            Some(description) => description,
            None => review
                .time
                .map(|secs| locale.format_epoch_seconds(secs))
                .unwrap_or_default(),
        };
        ReviewCandidate::normalize(
            review.author_name,
            review.rating,
            review.text,
            relative_time,
            published_at,
        )
    });

    SourceReport {
        rating: place.rating,
        total_review_count: place.user_ratings_total,
        reviews: collect_sample_reviews(candidates),
        review_page_url: place.url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk_loader::PlaceReview;

    fn review(rating: Option<f64>, relative: Option<&str>, time: Option<i64>) -> PlaceReview {
        PlaceReview {
            author_name: None,
            rating,
            text: Some("Très bien".into()),
            relative_time_description: relative.map(str::to_string),
            time,
        }
    }

    #[test]
    fn relative_description_wins_over_epoch() {
        let place = PlaceResult {
            rating: Some(4.8),
            user_ratings_total: Some(12),
            reviews: Some(vec![
                review(Some(5.0), Some("il y a 2 semaines"), Some(1_700_000_000)),
                review(Some(4.0), None, Some(1_600_000_000)),
                review(Some(3.0), Some(""), None),
                review(None, Some("hier"), Some(1_710_000_000)),
            ]),
            url: Some("https://maps.test/place".into()),
        };

        let report = normalize_place(place, Locale::Fr);
        assert_eq!(report.rating, Some(4.8));
        assert_eq!(report.total_review_count, Some(12));
        assert_eq!(report.reviews.len(), 3);
        assert_eq!(report.reviews[0].relative_time, "il y a 2 semaines");
        assert_eq!(report.reviews[1].relative_time, "13/09/2020");
        assert_eq!(report.reviews[2].relative_time, "");
        assert_eq!(report.reviews[0].author_name, "Client");
    }
}
