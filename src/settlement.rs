// Settlement tracker
// Polls the bridge status RPC for a submitted cross-chain transfer on its
// own task until a terminal verdict or the deadline, streaming every
// observed status back to the owner
//
// Numan Thabit 2025 Nov

use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SettlementConfig;
use crate::metrics::SETTLEMENT_POLLS;
use crate::venues::{StatusQuery, StatusReport, StatusSource};

const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementStatus {
    /// Not final yet; `substatus` is the venue's progress hint.
    Pending { substatus: Option<String> },
    Done,
    Failed { substatus: Option<String> },
    /// Deadline passed without a terminal verdict. Not a failure.
    Unknown,
}

impl SettlementStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SettlementStatus::Pending { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            SettlementStatus::Pending { .. } => "pending",
            SettlementStatus::Done => "done",
            SettlementStatus::Failed { .. } => "failed",
            SettlementStatus::Unknown => "unknown",
        }
    }
}

/// Map a raw status document onto a settlement status.
pub fn classify(report: &StatusReport) -> SettlementStatus {
    match report.status.to_ascii_uppercase().as_str() {
        "DONE" => SettlementStatus::Done,
        "FAILED" => SettlementStatus::Failed {
            substatus: report.substatus.clone(),
        },
        _ => SettlementStatus::Pending {
            substatus: report.substatus.clone(),
        },
    }
}

#[derive(Clone)]
pub struct SettlementTracker {
    source: Arc<dyn StatusSource>,
    interval: Duration,
    deadline: Duration,
}

impl SettlementTracker {
    pub fn new(source: Arc<dyn StatusSource>, config: &SettlementConfig) -> Self {
        Self::with_timing(source, config.poll_interval(), config.deadline())
    }

    pub fn with_timing(source: Arc<dyn StatusSource>, interval: Duration, deadline: Duration) -> Self {
        Self {
            source,
            interval,
            deadline,
        }
    }

    /// Start polling for `query`. The first lookup happens one interval after
    /// this call. Dropping the handle stops the polling task.
    pub fn track(&self, query: StatusQuery) -> SettlementHandle {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let task = tokio::spawn(poll_until_settled(
            self.source.clone(),
            query,
            self.interval,
            self.deadline,
            tx,
        ));
        SettlementHandle { rx, task }
    }
}

/// Receiving end of one tracking task.
///
/// Yields every observed status; the last item is the single terminal one.
pub struct SettlementHandle {
    rx: mpsc::Receiver<SettlementStatus>,
    task: JoinHandle<()>,
}

impl SettlementHandle {
    pub async fn next_status(&mut self) -> Option<SettlementStatus> {
        self.rx.recv().await
    }

    /// Wait for the terminal status, passing each pending one to `on_pending`.
    pub async fn wait_terminal<F>(mut self, mut on_pending: F) -> SettlementStatus
    where
        F: FnMut(&SettlementStatus),
    {
        while let Some(status) = self.rx.recv().await {
            if status.is_terminal() {
                return status;
            }
            on_pending(&status);
        }
        // task gone without a verdict
        SettlementStatus::Unknown
    }
}

impl Stream for SettlementHandle {
    type Item = SettlementStatus;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for SettlementHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[tracing::instrument(skip_all, fields(tx_hash = %query.tx_hash, tool = %query.tool))]
async fn poll_until_settled(
    source: Arc<dyn StatusSource>,
    query: StatusQuery,
    interval: Duration,
    deadline: Duration,
    tx: mpsc::Sender<SettlementStatus>,
) {
    let start = Instant::now();
    let expiry = sleep_until(start + deadline);
    tokio::pin!(expiry);
    let mut ticker = interval_at(start + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut polls = 0u32;

    info!(
        interval_secs = interval.as_secs(),
        deadline_secs = deadline.as_secs(),
        "tracking settlement"
    );

    loop {
        tokio::select! {
            biased;
            _ = &mut expiry => break,
            _ = tx.closed() => {
                debug!(polls, "settlement receiver dropped");
                return;
            }
            _ = ticker.tick() => {}
        }

        polls += 1;
        let lookup = tokio::select! {
            biased;
            _ = &mut expiry => break,
            lookup = source.status(&query) => lookup,
        };

        let status = match lookup {
            Ok(report) => classify(&report),
            Err(err) => {
                SETTLEMENT_POLLS.with_label_values(&["error"]).inc();
                warn!(error = %err, polls, "settlement status lookup failed");
                continue;
            }
        };
        SETTLEMENT_POLLS.with_label_values(&[status.label()]).inc();

        let terminal = status.is_terminal();
        if terminal {
            info!(status = status.label(), polls, "settlement reached terminal status");
        } else {
            debug!(?status, polls, "settlement pending");
        }
        if tx.send(status).await.is_err() || terminal {
            return;
        }
    }

    SETTLEMENT_POLLS.with_label_values(&["unknown"]).inc();
    warn!(polls, "settlement deadline passed without a verdict");
    let _ = tx.send(SettlementStatus::Unknown).await;
}
