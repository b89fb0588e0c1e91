// Step executor - drives one route step from template to inclusion
// This file resolves a fresh transaction template from the producing venue,
// grants token allowance when the step needs it, then signs and submits
//
// Numan Thabit 2025 Nov

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::errors::{SignerError, SwapError};
use crate::router::routes::Route;
use crate::signers::ChainSigner;
use crate::venues::VenueSet;

/// Execution statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ExecutionStats {
    pub steps_attempted: u64,
    pub steps_succeeded: u64,
    pub steps_failed: u64,
    pub approvals_sent: u64,
}

/// Executes route steps through the venue that produced the route
pub struct StepExecutor {
    venues: VenueSet,
    steps_attempted: AtomicU64,
    steps_succeeded: AtomicU64,
    steps_failed: AtomicU64,
    approvals_sent: AtomicU64,
}

impl StepExecutor {
    pub fn new(venues: VenueSet) -> Self {
        Self {
            venues,
            steps_attempted: AtomicU64::new(0),
            steps_succeeded: AtomicU64::new(0),
            steps_failed: AtomicU64::new(0),
            approvals_sent: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> ExecutionStats {
        ExecutionStats {
            steps_attempted: self.steps_attempted.load(Ordering::Relaxed),
            steps_succeeded: self.steps_succeeded.load(Ordering::Relaxed),
            steps_failed: self.steps_failed.load(Ordering::Relaxed),
            approvals_sent: self.approvals_sent.load(Ordering::Relaxed),
        }
    }

    /// Execute step `index` of `route` and return its locally included tx hash.
    ///
    /// Nothing here is retried: a failed signed submission must not be
    /// resubmitted blindly, the caller re-quotes instead.
    #[tracing::instrument(skip_all, fields(route = %route.id(), step = index))]
    pub async fn execute_step(
        &self,
        route: &Route,
        index: usize,
        signer: &dyn ChainSigner,
    ) -> Result<String, SwapError> {
        self.steps_attempted.fetch_add(1, Ordering::Relaxed);
        let result = self.run_step(route, index, signer).await;
        match &result {
            Ok(tx_hash) => {
                self.steps_succeeded.fetch_add(1, Ordering::Relaxed);
                info!(tx_hash = %tx_hash, "step included");
            }
            Err(err) => {
                self.steps_failed.fetch_add(1, Ordering::Relaxed);
                warn!(error = %err, retry_safe = err.retry_safe(), "step failed");
            }
        }
        result
    }

    async fn run_step(
        &self,
        route: &Route,
        index: usize,
        signer: &dyn ChainSigner,
    ) -> Result<String, SwapError> {
        let step = route.step(index).ok_or_else(|| {
            SwapError::MalformedRoute(format!(
                "route {} has no step {index}",
                route.id()
            ))
        })?;
        let venue = self.venues.get(route.venue()).ok_or_else(|| {
            SwapError::MalformedRoute(format!(
                "no {} adapter for route {}",
                route.venue(),
                route.id()
            ))
        })?;

        let address = signer.address();
        let template = venue
            .step_transaction(route, index, &address)
            .await
            .map_err(|err| match err {
                SwapError::MalformedRoute(_) => err,
                other => SwapError::StepSubmissionFailed {
                    step: index,
                    reason: format!("transaction template: {other}"),
                    tx_hash: None,
                    may_have_landed: false,
                },
            })?;
        if template.chain != step.chain {
            return Err(SwapError::MalformedRoute(format!(
                "template for step {index} targets chain {}, step runs on {}",
                template.chain, step.chain
            )));
        }

        if let (true, Some(spender), Some(token)) = (
            step.needs_approval_check(),
            step.approval_spender.as_deref(),
            step.from_asset.address(),
        ) {
            self.ensure_allowance(index, signer, token, spender, step.from_amount)
                .await?;
        }

        signer
            .sign_and_send(&template)
            .await
            .map_err(|err| submission_failed(index, err))
    }

    /// Grant `amount` to `spender` unless the current allowance covers it.
    /// Returns only once the approval is included.
    async fn ensure_allowance(
        &self,
        index: usize,
        signer: &dyn ChainSigner,
        token: &str,
        spender: &str,
        amount: u128,
    ) -> Result<(), SwapError> {
        let current = signer
            .allowance(token, spender)
            .await
            .map_err(|err| approval_failed(index, "allowance query", err))?;
        if current >= amount {
            debug!(allowance = %current, required = %amount, "allowance sufficient");
            return Ok(());
        }

        info!(token = %token, spender = %spender, amount = %amount, "approving spender");
        let approval = signer
            .approval_template(token, spender, amount)
            .map_err(|err| approval_failed(index, "approval template", err))?;
        let tx_hash = signer
            .sign_and_send(&approval)
            .await
            .map_err(|err| approval_failed(index, "approval submission", err))?;
        self.approvals_sent.fetch_add(1, Ordering::Relaxed);
        info!(tx_hash = %tx_hash, "approval included");
        Ok(())
    }
}

fn approval_failed(index: usize, stage: &str, err: SignerError) -> SwapError {
    SwapError::ApprovalFailed {
        step: index,
        reason: match err.tx_hash() {
            Some(hash) => format!("{stage}: {err} (tx {hash})"),
            None => format!("{stage}: {err}"),
        },
        may_have_landed: err.may_have_landed(),
    }
}

fn submission_failed(index: usize, err: SignerError) -> SwapError {
    SwapError::StepSubmissionFailed {
        step: index,
        reason: err.to_string(),
        tx_hash: err.tx_hash().map(str::to_string),
        may_have_landed: err.may_have_landed(),
    }
}
