// Swap session - orchestrator state machine for one swap
// Quotes through the route selector, waits for the user's decision, runs
// the route steps strictly in order and hands cross-chain transfers to the
// settlement tracker
//
// Numan Thabit 2025 Nov

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::timeout;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::config::TimeoutConfig;
use crate::errors::{ErrorKind, SwapError};
use crate::metrics::SESSIONS;
use crate::router::{Route, RouteSelector, RouteStep, StepExecutor};
use crate::settlement::{SettlementStatus, SettlementTracker};
use crate::signers::SignerResolver;
use crate::types::SwapRequest;
use crate::venues::StatusQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case", tag = "phase", content = "error")]
pub enum SessionPhase {
    Quoting,
    Review,
    Executing,
    SameChainDone,
    Settling,
    Done,
    Failed(ErrorKind),
    Cancelled,
    Unknown,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPhase::Quoting => "quoting",
            SessionPhase::Review => "review",
            SessionPhase::Executing => "executing",
            SessionPhase::SameChainDone => "same_chain_done",
            SessionPhase::Settling => "settling",
            SessionPhase::Done => "done",
            SessionPhase::Failed(_) => "failed",
            SessionPhase::Cancelled => "cancelled",
            SessionPhase::Unknown => "unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionPhase::Done
                | SessionPhase::Failed(_)
                | SessionPhase::Cancelled
                | SessionPhase::Unknown
        )
    }

    /// Legal phase transitions.
    pub fn can_move_to(&self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        matches!(
            (self, next),
            (Quoting, Review)
                | (Quoting, Failed(_))
                | (Review, Executing)
                | (Review, Cancelled)
                | (Executing, SameChainDone)
                | (Executing, Settling)
                | (Executing, Failed(_))
                | (Executing, Unknown)
                | (SameChainDone, Done)
                | (Settling, Done)
                | (Settling, Failed(_))
                | (Settling, Unknown)
        )
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Failed(kind) => write!(f, "failed({})", kind.as_str()),
            other => f.write_str(other.as_str()),
        }
    }
}

/// Collaborators shared by every session of one engine
pub struct SessionServices {
    pub selector: RouteSelector,
    pub executor: Arc<StepExecutor>,
    pub tracker: SettlementTracker,
    pub signers: Arc<dyn SignerResolver>,
    pub timeouts: TimeoutConfig,
}

/// One swap, owned by one task. Discarded once terminal; a retry is a new
/// session with a fresh quote.
pub struct SwapSession {
    request: SwapRequest,
    services: Arc<SessionServices>,
    phase: SessionPhase,
    route: Option<Route>,
    completed_steps: usize,
    tx_hashes: Vec<String>,
    error: Option<SwapError>,
    settlement: Option<SettlementStatus>,
    history: Vec<SessionPhase>,
    phase_tx: watch::Sender<SessionPhase>,
}

impl SwapSession {
    pub fn new(request: SwapRequest, services: Arc<SessionServices>) -> Self {
        let (phase_tx, _) = watch::channel(SessionPhase::Quoting);
        Self {
            request,
            services,
            phase: SessionPhase::Quoting,
            route: None,
            completed_steps: 0,
            tx_hashes: Vec::new(),
            error: None,
            settlement: None,
            history: vec![SessionPhase::Quoting],
            phase_tx,
        }
    }

    pub fn request(&self) -> &SwapRequest {
        &self.request
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Every phase entered so far, in order.
    pub fn history(&self) -> &[SessionPhase] {
        &self.history
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn completed_steps(&self) -> usize {
        self.completed_steps
    }

    /// Included tx hash per completed step.
    pub fn tx_hashes(&self) -> &[String] {
        &self.tx_hashes
    }

    /// Classified error of a `Failed` or `Unknown` session.
    pub fn error(&self) -> Option<&SwapError> {
        self.error.as_ref()
    }

    /// Latest status observed by the settlement tracker.
    pub fn settlement_status(&self) -> Option<&SettlementStatus> {
        self.settlement.as_ref()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionPhase> {
        self.phase_tx.subscribe()
    }

    pub fn phase_stream(&self) -> WatchStream<SessionPhase> {
        WatchStream::new(self.phase_tx.subscribe())
    }

    fn invalid(&self, action: &'static str) -> SwapError {
        SwapError::InvalidState {
            phase: self.phase.to_string(),
            action,
        }
    }

    fn enter(&mut self, next: SessionPhase) {
        debug_assert!(
            self.phase.can_move_to(next),
            "illegal transition {} -> {}",
            self.phase,
            next
        );
        debug!(from = %self.phase, to = %next, "session phase change");
        self.phase = next;
        self.history.push(next);
        self.phase_tx.send_replace(next);
        if next.is_terminal() {
            SESSIONS.with_label_values(&[next.as_str()]).inc();
            info!(phase = %next, steps = self.completed_steps, "session finished");
        }
    }

    /// Record `err` and end the session: `Unknown` for an unknown settlement,
    /// `Failed` otherwise.
    fn finish_with(&mut self, err: SwapError) -> SwapError {
        let next = match err.kind() {
            ErrorKind::SettlementUnknown => SessionPhase::Unknown,
            kind => SessionPhase::Failed(kind),
        };
        warn!(error = %err, retry_safe = err.retry_safe(), "session ended with error");
        self.error = Some(err.clone());
        self.enter(next);
        err
    }

    /// Fetch a route. `Quoting -> Review` on success, `Quoting -> Failed` otherwise.
    #[tracing::instrument(skip_all, fields(from = %self.request.source_chain(), to = %self.request.destination_chain()))]
    pub async fn quote(&mut self) -> Result<&Route, SwapError> {
        if self.phase != SessionPhase::Quoting {
            return Err(self.invalid("quote"));
        }
        let limit = self.services.timeouts.quote();
        let selected = match timeout(limit, self.services.selector.select(&self.request)).await {
            Ok(selected) => selected,
            Err(_) => Err(SwapError::Upstream(format!(
                "quote timed out after {}ms",
                limit.as_millis()
            ))),
        };
        match selected {
            Ok(route) => {
                info!(
                    route = %route.id(),
                    venue = %route.venue(),
                    steps = route.steps().len(),
                    expected_output = %route.expected_output(),
                    "quote ready for review"
                );
                self.enter(SessionPhase::Review);
                Ok(self.route.insert(route))
            }
            Err(err) => Err(self.finish_with(err)),
        }
    }

    /// Abandon the quote. Only allowed while in review.
    pub fn cancel(&mut self) -> Result<(), SwapError> {
        if self.phase != SessionPhase::Review {
            return Err(self.invalid("cancel"));
        }
        self.enter(SessionPhase::Cancelled);
        Ok(())
    }

    /// Execute the reviewed route to a terminal phase.
    ///
    /// Returns the final phase (`Done`) or the classified error of a `Failed`
    /// or `Unknown` session.
    #[tracing::instrument(skip_all, fields(from = %self.request.source_chain(), to = %self.request.destination_chain()))]
    pub async fn confirm(&mut self) -> Result<SessionPhase, SwapError> {
        if self.phase != SessionPhase::Review {
            return Err(self.invalid("confirm"));
        }
        let route = match &self.route {
            Some(route) => route.clone(),
            None => return Err(self.invalid("confirm")),
        };
        self.enter(SessionPhase::Executing);

        while self.completed_steps < route.steps().len() {
            let index = self.completed_steps;
            let tx_hash = match self.run_step(&route, index).await {
                Ok(tx_hash) => tx_hash,
                Err(err) => return Err(self.finish_with(err)),
            };
            self.completed_steps += 1;
            self.tx_hashes.push(tx_hash.clone());

            let step = &route.steps()[index];
            let is_last = self.completed_steps == route.steps().len();
            if step.crosses_chains() && !is_last {
                // the next step spends funds that only exist once this hop lands
                info!(step = index, tx_hash = %tx_hash, "waiting for intermediate bridge hop");
                if let Err(err) = self.settle(step, &tx_hash).await {
                    return Err(self.finish_with(err));
                }
            }
        }

        if !route.is_cross_chain() {
            self.enter(SessionPhase::SameChainDone);
            self.enter(SessionPhase::Done);
            return Ok(SessionPhase::Done);
        }

        self.enter(SessionPhase::Settling);
        let last = route.last_step();
        let tx_hash = self.tx_hashes.last().cloned().unwrap_or_default();
        match self.settle(last, &tx_hash).await {
            Ok(()) => {
                self.enter(SessionPhase::Done);
                Ok(SessionPhase::Done)
            }
            Err(err) => Err(self.finish_with(err)),
        }
    }

    async fn run_step(&self, route: &Route, index: usize) -> Result<String, SwapError> {
        let step = &route.steps()[index];
        let signer = self.services.signers.signer_for(step.chain)?;
        let limit = self.services.timeouts.step();
        match timeout(
            limit,
            self.services
                .executor
                .execute_step(route, index, signer.as_ref()),
        )
        .await
        {
            Ok(result) => result,
            // the signer may already have broadcast
            Err(_) => Err(SwapError::StepSubmissionFailed {
                step: index,
                reason: format!("step timed out after {}ms", limit.as_millis()),
                tx_hash: None,
                may_have_landed: true,
            }),
        }
    }

    /// Track `step`'s transfer until a terminal status.
    async fn settle(&mut self, step: &RouteStep, tx_hash: &str) -> Result<(), SwapError> {
        let handle = self.services.tracker.track(StatusQuery {
            tx_hash: tx_hash.to_string(),
            tool: step.tool.clone(),
            from_chain: step.chain,
            to_chain: step.to_chain,
        });
        let settlement = &mut self.settlement;
        let terminal = handle
            .wait_terminal(|pending| *settlement = Some(pending.clone()))
            .await;
        self.settlement = Some(terminal.clone());
        match terminal {
            SettlementStatus::Done => Ok(()),
            SettlementStatus::Failed { substatus } => Err(SwapError::SettlementFailed {
                tx_hash: tx_hash.to_string(),
                substatus: substatus.unwrap_or_else(|| "UNKNOWN_ERROR".to_string()),
            }),
            SettlementStatus::Unknown | SettlementStatus::Pending { .. } => {
                Err(SwapError::SettlementUnknown {
                    tx_hash: tx_hash.to_string(),
                })
            }
        }
    }
}
