use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on sample reviews carried by a snapshot.
pub const MAX_SAMPLE_REVIEWS: usize = 6;

/// Author shown when a source omits the reviewer's name.
pub const DEFAULT_AUTHOR_NAME: &str = "Client";

/// One third-party review, independent of the source it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub author_name: String,
    /// Always within 1..=5.
    pub rating: u8,
    pub text: String,
    /// Human-readable age ("2 weeks ago") or a locale-formatted date.
    pub relative_time: String,
}

impl ReviewRecord {
    /// Bring an already-built record (e.g. from configuration) back into the
    /// 1..=5 star range. A zero rating means "not rated" and drops the record.
    pub fn with_valid_rating(mut self) -> Option<Self> {
        self.rating = clamp_rating(f64::from(self.rating))?;
        Some(self)
    }
}

/// A normalized review plus the instant it was published, when the source
/// exposes one. The instant only drives ordering and never reaches the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCandidate {
    pub record: ReviewRecord,
    pub published_at: Option<DateTime<Utc>>,
}

impl ReviewCandidate {
    /// Build a candidate from raw source fields.
    ///
    /// Returns `None` when the source gave no usable rating: reviews without a
    /// rating are dropped rather than defaulted.
    pub fn normalize(
        author_name: Option<String>,
        raw_rating: Option<f64>,
        text: Option<String>,
        relative_time: String,
        published_at: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let rating = clamp_rating(raw_rating?)?;
        let author_name = author_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_AUTHOR_NAME.to_string());

        Some(Self {
            record: ReviewRecord {
                author_name,
                rating,
                text: text.unwrap_or_default(),
                relative_time,
            },
            published_at,
        })
    }
}

/// Round a raw star value into 1..=5. Non-finite and non-positive values
/// mean "not rated".
fn clamp_rating(raw: f64) -> Option<u8> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    Some(raw.round().clamp(1.0, 5.0) as u8)
}

/// Turn a source's review list (in the source's relevance order) into the
/// sample shown to visitors: at most [`MAX_SAMPLE_REVIEWS`] entries, most
/// recent first. Entries with no known publication instant keep their
/// relative order after the dated ones.
pub fn collect_sample_reviews<I>(candidates: I) -> Vec<ReviewRecord>
where
    I: IntoIterator<Item = ReviewCandidate>,
{
    let mut sample: Vec<ReviewCandidate> =
        candidates.into_iter().take(MAX_SAMPLE_REVIEWS).collect();
    // Stable sort: `None` compares lowest, so reversing puts undated last.
    sample.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    sample.into_iter().map(|c| c.record).collect()
}

/// Display locale for formatted review dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Fr,
    En,
}

impl Locale {
    pub fn format_date(&self, at: DateTime<Utc>) -> String {
        match self {
            Locale::Fr => at.format("%d/%m/%Y").to_string(),
            Locale::En => at.format("%m/%d/%Y").to_string(),
        }
    }

    /// Format an epoch-seconds timestamp; out-of-range values yield an empty
    /// string rather than a raw number.
    pub fn format_epoch_seconds(&self, secs: i64) -> String {
        DateTime::<Utc>::from_timestamp(secs, 0)
            .map(|at| self.format_date(at))
            .unwrap_or_default()
    }

    /// Language code sent to vendor APIs.
    pub fn language_code(&self) -> &'static str {
        match self {
            Locale::Fr => "fr",
            Locale::En => "en",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate(author: &str, rating: f64, published_secs: Option<i64>) -> ReviewCandidate {
        let published_at = published_secs.map(|s| Utc.timestamp_opt(s, 0).unwrap());
        ReviewCandidate::normalize(Some(author.into()), Some(rating), None, String::new(), published_at)
            .unwrap()
    }

    #[test]
    fn ratings_are_rounded_and_clamped() {
        assert_eq!(clamp_rating(4.4), Some(4));
        assert_eq!(clamp_rating(4.6), Some(5));
        assert_eq!(clamp_rating(9.0), Some(5));
        assert_eq!(clamp_rating(0.3), Some(1));
        assert_eq!(clamp_rating(0.0), None);
        assert_eq!(clamp_rating(-2.0), None);
        assert_eq!(clamp_rating(f64::NAN), None);
    }

    #[test]
    fn stored_records_are_brought_into_range() {
        let record = |rating| ReviewRecord {
            author_name: "Marie".into(),
            rating,
            text: String::new(),
            relative_time: String::new(),
        };
        assert_eq!(record(9).with_valid_rating().map(|r| r.rating), Some(5));
        assert_eq!(record(3).with_valid_rating().map(|r| r.rating), Some(3));
        assert!(record(0).with_valid_rating().is_none());
    }

    #[test]
    fn unrated_reviews_are_dropped() {
        let dropped = ReviewCandidate::normalize(Some("Ana".into()), None, Some("ok".into()), String::new(), None);
        assert!(dropped.is_none());
    }

    #[test]
    fn blank_author_falls_back_to_default() {
        let c = ReviewCandidate::normalize(Some("  ".into()), Some(5.0), None, "hier".into(), None).unwrap();
        assert_eq!(c.record.author_name, DEFAULT_AUTHOR_NAME);
        assert_eq!(c.record.text, "");
        assert_eq!(c.record.relative_time, "hier");
    }

    #[test]
    fn sample_is_capped_then_ordered_newest_first() {
        let mut input: Vec<ReviewCandidate> = (0..8)
            .map(|i| candidate(&format!("r{i}"), 5.0, Some(1_000 * i)))
            .collect();
        input.insert(2, candidate("undated", 3.0, None));

        let sample = collect_sample_reviews(input);
        assert_eq!(sample.len(), MAX_SAMPLE_REVIEWS);
        let names: Vec<&str> = sample.iter().map(|r| r.author_name.as_str()).collect();
        assert_eq!(names, vec!["r4", "r3", "r2", "r1", "r0", "undated"]);
    }

    #[test]
    fn dates_follow_locale() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        assert_eq!(Locale::Fr.format_date(at), "09/03/2024");
        assert_eq!(Locale::En.format_date(at), "03/09/2024");
        assert_eq!(Locale::Fr.format_epoch_seconds(at.timestamp()), "09/03/2024");
        assert_eq!(Locale::Fr.format_epoch_seconds(i64::MAX), "");
    }
}
