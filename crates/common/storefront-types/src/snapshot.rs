use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::review::{ReviewRecord, MAX_SAMPLE_REVIEWS};

/// Provenance of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    SdkLive,
    RestLive,
    BackendLive,
    StaticFallback,
}

impl SourceKind {
    /// Stable label used for metrics and structured logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::SdkLive => "sdk",
            SourceKind::RestLive => "rest",
            SourceKind::BackendLive => "backend",
            SourceKind::StaticFallback => "static",
        }
    }

    /// Short provenance tag shown in the site's debug line.
    pub fn diagnostic_label(&self) -> &'static str {
        match self {
            SourceKind::SdkLive | SourceKind::RestLive => "google-live",
            SourceKind::BackendLive => "backend-live",
            SourceKind::StaticFallback => "fallback",
        }
    }

    pub fn is_live(&self) -> bool {
        !matches!(self, SourceKind::StaticFallback)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a single source managed to fetch, already normalized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceReport {
    pub rating: Option<f64>,
    pub total_review_count: Option<u64>,
    pub reviews: Vec<ReviewRecord>,
    pub review_page_url: Option<String>,
}

impl SourceReport {
    /// A report is usable when it carries a rating or a review count.
    pub fn is_usable(&self) -> bool {
        self.rating.is_some() || self.total_review_count.is_some()
    }
}

/// Fixed business-profile constants backing the static fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusinessProfile {
    pub name: String,
    pub rating: f64,
    pub review_count: u64,
    pub review_page_url: String,
    #[serde(default)]
    pub featured_reviews: Vec<ReviewRecord>,
}

impl BusinessProfile {
    /// Clamp featured review ratings into 1..=5, dropping unrated entries.
    /// Returns how many entries were dropped or adjusted.
    pub fn sanitize_featured_reviews(&mut self) -> usize {
        let before = std::mem::take(&mut self.featured_reviews);
        let mut changed = 0;
        for review in before {
            let original = review.rating;
            match review.with_valid_rating() {
                Some(valid) => {
                    if valid.rating != original {
                        changed += 1;
                    }
                    self.featured_reviews.push(valid);
                }
                None => changed += 1,
            }
        }
        changed
    }
}

/// One immutable, fully resolved reputation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReputationSnapshot {
    pub rating: f64,
    pub total_review_count: u64,
    pub reviews: Vec<ReviewRecord>,
    pub review_page_url: String,
    pub source_kind: SourceKind,
    pub retrieved_at: DateTime<Utc>,
}

impl ReputationSnapshot {
    /// Build a snapshot from a usable report of a live source.
    ///
    /// A field the source did not supply is taken from the business profile
    /// constants, never from another live source.
    pub fn from_report(report: SourceReport, kind: SourceKind, profile: &BusinessProfile) -> Self {
        let mut reviews = report.reviews;
        reviews.truncate(MAX_SAMPLE_REVIEWS);
        Self {
            rating: report.rating.unwrap_or(profile.rating),
            total_review_count: report.total_review_count.unwrap_or(profile.review_count),
            reviews,
            review_page_url: report
                .review_page_url
                .filter(|url| !url.is_empty())
                .unwrap_or_else(|| profile.review_page_url.clone()),
            source_kind: kind,
            retrieved_at: Utc::now(),
        }
    }

    /// The always-available snapshot built purely from configuration.
    pub fn static_fallback(profile: &BusinessProfile) -> Self {
        let reviews = profile
            .featured_reviews
            .iter()
            .cloned()
            .filter_map(ReviewRecord::with_valid_rating)
            .take(MAX_SAMPLE_REVIEWS)
            .collect();
        Self {
            rating: profile.rating,
            total_review_count: profile.review_count,
            reviews,
            review_page_url: profile.review_page_url.clone(),
            source_kind: SourceKind::StaticFallback,
            retrieved_at: Utc::now(),
        }
    }

    pub fn is_live(&self) -> bool {
        self.source_kind.is_live()
    }
}
