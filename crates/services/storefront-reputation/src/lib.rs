//! Storefront reputation resolver: live star rating, review count and sample
//! reviews from several unreliable sources, with static fallback and periodic
//! refresh.

pub mod config;
pub mod error;
pub mod metrics;
pub mod metrics_server;
pub mod polling;
pub mod resolver;
pub mod sdk_loader;
pub mod sources;

pub use config::ReputationConfig;
pub use error::SourceError;
pub use polling::{PollingController, REFRESH_INTERVAL};
pub use resolver::FallbackResolver;
pub use sdk_loader::SdkRegistry;
pub use sources::{SourceClient, SourceDescriptor};
