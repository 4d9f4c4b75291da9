//! Reputation sources: one client per external system.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use storefront_types::{SourceKind, SourceReport};

use crate::error::SourceError;

pub mod backend;
pub mod rest;
pub mod sdk;

pub use backend::BackendClient;
pub use rest::RestClient;
pub use sdk::SdkClient;

/// Fetches reputation data from exactly one external system.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn fetch_reputation(&self) -> Result<SourceReport, SourceError>;
}

/// One entry of the fallback chain.
#[derive(Clone)]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    pub client: Arc<dyn SourceClient>,
}

impl SourceDescriptor {
    pub fn new(kind: SourceKind, client: Arc<dyn SourceClient>) -> Self {
        Self { kind, client }
    }
}

impl std::fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceDescriptor").field("kind", &self.kind).finish()
    }
}

/// HTTP client shared by the sources of one resolver.
pub fn build_http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create HTTP client for reputation sources")
}

/// Turn a non-2xx response into a transport error, logging the body.
pub(crate) async fn ensure_success(resp: Response, source: &str) -> Result<Response, SourceError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let error_body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read response>".to_string());
    tracing::debug!("{} source responded with HTTP {}: {}", source, status, error_body);
    Err(SourceError::Transport(format!(
        "{} request failed with HTTP {}",
        source, status
    )))
}
