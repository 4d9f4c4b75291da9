//! Ordered fallback over the reputation sources.

use std::sync::Arc;
use std::time::{Duration, Instant};
use storefront_types::{BusinessProfile, ReputationSnapshot, SourceKind, SourceReport};

use crate::config::ReputationConfig;
use crate::error::SourceError;
use crate::metrics;
use crate::sdk_loader::SdkRegistry;
use crate::sources::{
    build_http_client, BackendClient, RestClient, SdkClient, SourceDescriptor,
};

/// Tries each source in order and returns the first usable result, or the
/// static fallback snapshot. Never fails.
pub struct FallbackResolver {
    chain: Vec<SourceDescriptor>,
    profile: BusinessProfile,
    source_timeout: Duration,
}

impl FallbackResolver {
    pub fn new(chain: Vec<SourceDescriptor>, profile: BusinessProfile) -> Self {
        Self {
            chain,
            profile,
            source_timeout: Duration::from_secs(crate::config::DEFAULT_SOURCE_TIMEOUT_SECS),
        }
    }

    pub fn with_source_timeout(mut self, timeout: Duration) -> Self {
        self.source_timeout = timeout;
        self
    }

    /// Standard chain `SDK -> REST -> backend`, sharing the process-wide SDK registry.
    pub fn from_config(config: &ReputationConfig) -> anyhow::Result<Self> {
        Self::from_config_with_registry(config, SdkRegistry::global())
    }

    pub fn from_config_with_registry(
        config: &ReputationConfig,
        registry: Arc<SdkRegistry>,
    ) -> anyhow::Result<Self> {
        let http = build_http_client(config.source_timeout())?;
        let chain = vec![
            SourceDescriptor::new(
                SourceKind::SdkLive,
                Arc::new(SdkClient::from_config(config, http.clone(), registry)),
            ),
            SourceDescriptor::new(
                SourceKind::RestLive,
                Arc::new(RestClient::from_config(config, http.clone())),
            ),
            SourceDescriptor::new(
                SourceKind::BackendLive,
                Arc::new(BackendClient::from_config(config, http)),
            ),
        ];
        Ok(Self::new(chain, config.business.clone()).with_source_timeout(config.source_timeout()))
    }

    /// Source kinds in the order they are attempted.
    pub fn chain(&self) -> Vec<SourceKind> {
        self.chain.iter().map(|s| s.kind).collect()
    }

    pub fn profile(&self) -> &BusinessProfile {
        &self.profile
    }

    pub fn static_snapshot(&self) -> ReputationSnapshot {
        ReputationSnapshot::static_fallback(&self.profile)
    }

    /// One pass over the chain. Sources are awaited strictly one after the
    /// other and the first usable result ends the pass.
    pub async fn resolve(&self) -> ReputationSnapshot {
        let started = Instant::now();

        for source in &self.chain {
            metrics::record_source_attempt(source.kind);
            match self.attempt(source).await {
                Ok(report) if report.is_usable() => {
                    tracing::info!(
                        "Reputation resolved from {} source: rating={:?} total={:?} reviews={}",
                        source.kind,
                        report.rating,
                        report.total_review_count,
                        report.reviews.len()
                    );
                    let snapshot = ReputationSnapshot::from_report(report, source.kind, &self.profile);
                    metrics::record_resolution(source.kind, started.elapsed().as_secs_f64());
                    return snapshot;
                }
                Ok(_) => {
                    tracing::warn!("{} source returned neither rating nor review count", source.kind);
                    metrics::record_source_failure(source.kind, "unusable");
                }
                Err(e) => {
                    tracing::warn!("{} source failed: {}", source.kind, e);
                    metrics::record_source_failure(source.kind, e.reason());
                }
            }
        }

        tracing::warn!(
            "All reputation sources failed ({}); serving static profile values",
            self.chain.len()
        );
        metrics::record_resolution(SourceKind::StaticFallback, started.elapsed().as_secs_f64());
        self.static_snapshot()
    }

    async fn attempt(&self, source: &SourceDescriptor) -> Result<SourceReport, SourceError> {
        match tokio::time::timeout(self.source_timeout, source.client.fetch_reputation()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(SourceError::Transport(format!(
                "no response within {:?}",
                self.source_timeout
            ))),
        }
    }
}
