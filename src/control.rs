// Control plane: quote admission control
//
// Concurrency limiting and sliding-window rate limiting in front of the
// venue adapters. Policy layered outside the swap core; admitted calls are
// forwarded unchanged and never retried.
//
// Numan Thabit 2025 Nov

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::debug;

use crate::errors::SwapError;
use crate::router::routes::{Route, TxTemplate, VenueKind};
use crate::types::SwapRequest;
use crate::venues::RouteSource;

const DEFAULT_MAX_INFLIGHT: usize = 8;

#[derive(Clone)]
pub struct AdmissionControl {
    max_inflight: Arc<Semaphore>,
    // allow up to rate_per_sec within a 1s sliding window
    inner: Arc<Mutex<RateLimiter>>,
}

struct RateLimiter {
    rate_per_sec: u32,
    timestamps: VecDeque<Instant>,
    window: Duration,
}

impl RateLimiter {
    /// Record an admission at `now`, or return how long to wait.
    fn try_admit(&mut self, now: Instant) -> Option<Duration> {
        while let Some(front) = self.timestamps.front() {
            if now.duration_since(*front) >= self.window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
        if (self.timestamps.len() as u32) < self.rate_per_sec {
            self.timestamps.push_back(now);
            return None;
        }
        self.timestamps
            .front()
            .map(|oldest| self.window.saturating_sub(now.duration_since(*oldest)))
    }
}

impl AdmissionControl {
    pub fn new(max_inflight: usize, rate_per_sec: u32) -> Self {
        let rl = RateLimiter {
            rate_per_sec: rate_per_sec.max(1),
            timestamps: VecDeque::with_capacity(rate_per_sec.max(1) as usize),
            window: Duration::from_secs(1),
        };
        Self {
            max_inflight: Arc::new(Semaphore::new(max_inflight.max(1))),
            inner: Arc::new(Mutex::new(rl)),
        }
    }

    /// Acquire an admission permit respecting max inflight and rate limit.
    pub async fn acquire(&self) -> Result<AdmissionPermit, SwapError> {
        loop {
            let wait = {
                let mut guard = self.inner.lock().await;
                guard.try_admit(Instant::now())
            };
            match wait {
                None => break,
                Some(wait) => {
                    debug!(wait_ms = wait.as_millis() as u64, "quote rate limited");
                    tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
                }
            }
        }
        let permit = self
            .max_inflight
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| SwapError::Upstream("admission control closed".into()))?;
        Ok(AdmissionPermit { _permit: permit })
    }
}

pub struct AdmissionPermit {
    _permit: OwnedSemaphorePermit,
}

/// Route source decorator that admits quote calls through [`AdmissionControl`].
pub struct RateLimitedSource<S> {
    inner: S,
    admission: AdmissionControl,
}

impl<S: RouteSource> RateLimitedSource<S> {
    pub fn new(inner: S, admission: AdmissionControl) -> Self {
        Self { inner, admission }
    }

    /// Shortcut for a private limiter with the default inflight cap.
    pub fn per_second(inner: S, rate_per_sec: u32) -> Self {
        Self::new(inner, AdmissionControl::new(DEFAULT_MAX_INFLIGHT, rate_per_sec))
    }
}

#[async_trait]
impl<S: RouteSource> RouteSource for RateLimitedSource<S> {
    fn kind(&self) -> VenueKind {
        self.inner.kind()
    }

    async fn quote(&self, req: &SwapRequest) -> Result<Route, SwapError> {
        let _permit = self.admission.acquire().await?;
        self.inner.quote(req).await
    }

    async fn step_transaction(
        &self,
        route: &Route,
        index: usize,
        signer_address: &str,
    ) -> Result<TxTemplate, SwapError> {
        self.inner.step_transaction(route, index, signer_address).await
    }
}
