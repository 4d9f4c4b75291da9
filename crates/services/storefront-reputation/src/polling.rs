//! Periodic refresh of the reputation snapshot.
#![forbid(unsafe_code)]

use anyhow::{bail, Context, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use storefront_types::ReputationSnapshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::metrics;
use crate::resolver::FallbackResolver;

/// Fixed refresh period.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Whether results of a polling session may still reach the consumer.
/// Delivery and clearing take the same lock, so nothing is published once
/// `clear` has returned.
#[derive(Clone)]
struct Liveness(Arc<Mutex<bool>>);

impl Liveness {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(true)))
    }

    fn deliver<F: FnOnce()>(&self, publish: F) -> bool {
        let alive = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        if *alive {
            publish();
        }
        *alive
    }

    fn clear(&self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }
}

/// Marks a resolution as outstanding for as long as it lives.
struct InFlight(Arc<AtomicBool>);

impl InFlight {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Self(flag.clone()))
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

struct Session {
    cancel: CancellationToken,
    liveness: Liveness,
    ticker: JoinHandle<()>,
}

/// Drives [`FallbackResolver`] on start and every [`REFRESH_INTERVAL`],
/// publishing each snapshot to subscribers.
pub struct PollingController {
    resolver: Arc<FallbackResolver>,
    snapshot_tx: Arc<watch::Sender<ReputationSnapshot>>,
    skipped_ticks: Arc<AtomicU64>,
    // At most one outstanding resolution per controller, across sessions.
    busy: Arc<AtomicBool>,
    session: Option<Session>,
}

impl PollingController {
    /// Subscribers see the static fallback until the first resolution lands.
    pub fn new(resolver: Arc<FallbackResolver>) -> Self {
        let (snapshot_tx, _) = watch::channel(resolver.static_snapshot());
        Self {
            resolver,
            snapshot_tx: Arc::new(snapshot_tx),
            skipped_ticks: Arc::new(AtomicU64::new(0)),
            busy: Arc::new(AtomicBool::new(false)),
            session: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ReputationSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Most recently published snapshot.
    pub fn current(&self) -> ReputationSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Ticks dropped because a resolution was still outstanding.
    pub fn skipped_ticks(&self) -> u64 {
        self.skipped_ticks.load(Ordering::SeqCst)
    }

    /// Idle -> Active: resolve immediately, then every refresh interval.
    pub fn start(&mut self) -> Result<()> {
        if self.session.is_some() {
            bail!("reputation polling already active");
        }

        let cancel = CancellationToken::new();
        let liveness = Liveness::new();
        let ticker = tokio::spawn(poll_loop(
            self.resolver.clone(),
            self.snapshot_tx.clone(),
            cancel.clone(),
            liveness.clone(),
            self.skipped_ticks.clone(),
            self.busy.clone(),
        ));

        tracing::info!("Reputation polling started (every {:?})", REFRESH_INTERVAL);
        self.session = Some(Session { cancel, liveness, ticker });
        Ok(())
    }

    /// Active -> Idle. Outstanding resolutions keep running but their
    /// results are discarded, and they still hold the busy flag: a restart
    /// skips ticks until they finish. Stopping an idle controller is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };

        session.liveness.clear();
        session.cancel.cancel();
        session
            .ticker
            .await
            .context("reputation polling task failed to join")?;
        tracing::info!("Reputation polling stopped");
        Ok(())
    }
}

async fn poll_loop(
    resolver: Arc<FallbackResolver>,
    snapshot_tx: Arc<watch::Sender<ReputationSnapshot>>,
    cancel: CancellationToken,
    liveness: Liveness,
    skipped_ticks: Arc<AtomicU64>,
    busy: Arc<AtomicBool>,
) {
    let mut ticker = time::interval(REFRESH_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(in_flight) = InFlight::try_acquire(&busy) else {
                    tracing::debug!("Previous reputation resolution still in flight; skipping tick");
                    skipped_ticks.fetch_add(1, Ordering::SeqCst);
                    metrics::record_skipped_tick();
                    continue;
                };
                tokio::spawn(resolve_and_publish(
                    resolver.clone(),
                    snapshot_tx.clone(),
                    liveness.clone(),
                    in_flight,
                ));
            }
        }
    }
}

async fn resolve_and_publish(
    resolver: Arc<FallbackResolver>,
    snapshot_tx: Arc<watch::Sender<ReputationSnapshot>>,
    liveness: Liveness,
    _in_flight: InFlight,
) {
    let snapshot = resolver.resolve().await;
    let kind = snapshot.source_kind;
    if !liveness.deliver(|| {
        snapshot_tx.send_replace(snapshot);
    }) {
        tracing::debug!("Discarding {} snapshot resolved after polling stopped", kind);
    }
}
