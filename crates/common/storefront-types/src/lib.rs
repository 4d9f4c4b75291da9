//! Core storefront reputation types shared by the resolver and its consumers.
#![forbid(unsafe_code)]

pub mod review;
pub mod snapshot;

pub use review::{
    collect_sample_reviews, Locale, ReviewCandidate, ReviewRecord, DEFAULT_AUTHOR_NAME,
    MAX_SAMPLE_REVIEWS,
};
pub use snapshot::{BusinessProfile, ReputationSnapshot, SourceKind, SourceReport};
