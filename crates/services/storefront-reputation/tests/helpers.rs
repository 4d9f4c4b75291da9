#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storefront_reputation::{SourceClient, SourceDescriptor, SourceError};
use storefront_types::{BusinessProfile, SourceKind, SourceReport};
use tokio::sync::{Notify, Semaphore};

pub fn test_profile() -> BusinessProfile {
    BusinessProfile {
        name: "Test Bike Shop".to_string(),
        rating: 4.6,
        review_count: 174,
        review_page_url: "https://reviews.test/write".to_string(),
        featured_reviews: Vec::new(),
    }
}

pub fn report(rating: Option<f64>, total: Option<u64>) -> SourceReport {
    SourceReport {
        rating,
        total_review_count: total,
        reviews: Vec::new(),
        review_page_url: None,
    }
}

/// Source returning a fixed outcome and recording each call in a shared log.
pub struct ScriptedSource {
    kind: SourceKind,
    outcome: Result<SourceReport, SourceError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    log: Arc<Mutex<Vec<SourceKind>>>,
}

impl ScriptedSource {
    pub fn new(
        kind: SourceKind,
        outcome: Result<SourceReport, SourceError>,
        log: Arc<Mutex<Vec<SourceKind>>>,
    ) -> Arc<Self> {
        Arc::new(Self { kind, outcome, delay: None, calls: AtomicUsize::new(0), log })
    }

    pub fn delayed(
        kind: SourceKind,
        outcome: Result<SourceReport, SourceError>,
        delay: Duration,
        log: Arc<Mutex<Vec<SourceKind>>>,
    ) -> Arc<Self> {
        Arc::new(Self { kind, outcome, delay: Some(delay), calls: AtomicUsize::new(0), log })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceClient for ScriptedSource {
    async fn fetch_reputation(&self) -> Result<SourceReport, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().unwrap().push(self.kind);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

pub fn descriptor(source: &Arc<ScriptedSource>) -> SourceDescriptor {
    SourceDescriptor::new(source.kind, source.clone())
}

/// Source that blocks until the test releases it, tracking concurrency.
pub struct GatedSource {
    pub entered: Notify,
    release: Semaphore,
    calls: AtomicUsize,
    concurrent: AtomicUsize,
    max_concurrent: AtomicUsize,
    report: SourceReport,
}

impl GatedSource {
    pub fn new(report: SourceReport) -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            release: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            concurrent: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
            report,
        })
    }

    /// Let one blocked (or future) call complete.
    pub fn release_one(&self) {
        self.release.add_permits(1);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceClient for GatedSource {
    async fn fetch_reputation(&self) -> Result<SourceReport, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_concurrent.fetch_max(now, Ordering::SeqCst);
        self.entered.notify_one();

        let permit = self
            .release
            .acquire()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;
        permit.forget();

        self.concurrent.fetch_sub(1, Ordering::SeqCst);
        Ok(self.report.clone())
    }
}
