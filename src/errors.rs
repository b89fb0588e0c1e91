// Error types and error classification module
// This file defines the swap error taxonomy and the retry-safety
// classification surfaced to the wallet UI
//
// Numan Thabit 2025 Nov

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwapError {
    #[error("no liquidity: {0}")]
    NoLiquidity(String),
    #[error("invalid pair: {0}")]
    InvalidPair(String),
    #[error("malformed route: {0}")]
    MalformedRoute(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("approval failed on step {step}: {reason}")]
    ApprovalFailed {
        step: usize,
        reason: String,
        may_have_landed: bool,
    },
    #[error("step {step} submission failed: {reason}")]
    StepSubmissionFailed {
        step: usize,
        reason: String,
        tx_hash: Option<String>,
        may_have_landed: bool,
    },
    #[error("settlement failed for {tx_hash}: {substatus}")]
    SettlementFailed { tx_hash: String, substatus: String },
    #[error("settlement status unknown for {tx_hash} after deadline")]
    SettlementUnknown { tx_hash: String },
    #[error("unsupported chain {0}")]
    UnsupportedChain(u64),
    #[error("action `{action}` not allowed in phase {phase}")]
    InvalidState { phase: String, action: &'static str },
}

/// Copyable classification of a [`SwapError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NoLiquidity,
    InvalidPair,
    MalformedRoute,
    Upstream,
    ApprovalFailed,
    StepSubmissionFailed,
    SettlementFailed,
    SettlementUnknown,
    UnsupportedChain,
    InvalidState,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NoLiquidity => "no_liquidity",
            ErrorKind::InvalidPair => "invalid_pair",
            ErrorKind::MalformedRoute => "malformed_route",
            ErrorKind::Upstream => "upstream_error",
            ErrorKind::ApprovalFailed => "approval_failed",
            ErrorKind::StepSubmissionFailed => "step_submission_failed",
            ErrorKind::SettlementFailed => "settlement_failed",
            ErrorKind::SettlementUnknown => "settlement_unknown",
            ErrorKind::UnsupportedChain => "unsupported_chain",
            ErrorKind::InvalidState => "invalid_state",
        }
    }
}

impl SwapError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SwapError::NoLiquidity(_) => ErrorKind::NoLiquidity,
            SwapError::InvalidPair(_) => ErrorKind::InvalidPair,
            SwapError::MalformedRoute(_) => ErrorKind::MalformedRoute,
            SwapError::Upstream(_) => ErrorKind::Upstream,
            SwapError::ApprovalFailed { .. } => ErrorKind::ApprovalFailed,
            SwapError::StepSubmissionFailed { .. } => ErrorKind::StepSubmissionFailed,
            SwapError::SettlementFailed { .. } => ErrorKind::SettlementFailed,
            SwapError::SettlementUnknown { .. } => ErrorKind::SettlementUnknown,
            SwapError::UnsupportedChain(_) => ErrorKind::UnsupportedChain,
            SwapError::InvalidState { .. } => ErrorKind::InvalidState,
        }
    }

    /// Whether a fresh session (new quote) may be offered without risking a
    /// duplicate transfer.
    pub fn retry_safe(&self) -> bool {
        match self {
            SwapError::ApprovalFailed {
                may_have_landed, ..
            }
            | SwapError::StepSubmissionFailed {
                may_have_landed, ..
            } => !may_have_landed,
            SwapError::SettlementUnknown { .. } => false,
            _ => true,
        }
    }

    /// True for classifications after which the selector may try the other venue.
    pub fn allows_fallback(&self) -> bool {
        matches!(self, SwapError::NoLiquidity(_) | SwapError::InvalidPair(_))
    }
}

/// Failures reported by a chain signer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// Rejected before broadcast (bad template, key, encoding, node rejection).
    #[error("rejected: {0}")]
    Rejected(String),
    /// Broadcast and included, but execution failed on chain.
    #[error("transaction {tx_hash} reverted")]
    Reverted { tx_hash: String },
    /// Broadcast, but inclusion was not observed in time.
    #[error("transaction {tx_hash} not included in time")]
    InclusionTimeout { tx_hash: String },
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("operation not supported by {family} signer: {operation}")]
    Unsupported {
        family: &'static str,
        operation: &'static str,
    },
}

impl SignerError {
    pub fn tx_hash(&self) -> Option<&str> {
        match self {
            SignerError::Reverted { tx_hash } | SignerError::InclusionTimeout { tx_hash } => {
                Some(tx_hash)
            }
            _ => None,
        }
    }

    /// A broadcast transaction whose outcome was never observed.
    pub fn may_have_landed(&self) -> bool {
        matches!(self, SignerError::InclusionTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_settlement_is_never_retry_safe() {
        let err = SwapError::SettlementUnknown {
            tx_hash: "0xabc".into(),
        };
        assert_eq!(err.kind(), ErrorKind::SettlementUnknown);
        assert!(!err.retry_safe());
    }

    #[test]
    fn submission_retry_safety_follows_landing_state() {
        let rejected = SwapError::StepSubmissionFailed {
            step: 0,
            reason: "nonce too low".into(),
            tx_hash: None,
            may_have_landed: false,
        };
        let pending = SwapError::StepSubmissionFailed {
            step: 1,
            reason: "timeout".into(),
            tx_hash: Some("0x01".into()),
            may_have_landed: true,
        };
        assert!(rejected.retry_safe());
        assert!(!pending.retry_safe());
    }

    #[test]
    fn only_liquidity_and_pair_errors_allow_fallback() {
        assert!(SwapError::NoLiquidity("x".into()).allows_fallback());
        assert!(SwapError::InvalidPair("x".into()).allows_fallback());
        assert!(!SwapError::Upstream("x".into()).allows_fallback());
        assert!(!SwapError::MalformedRoute("x".into()).allows_fallback());
    }

    #[test]
    fn inclusion_timeout_keeps_hash() {
        let err = SignerError::InclusionTimeout {
            tx_hash: "sig".into(),
        };
        assert_eq!(err.tx_hash(), Some("sig"));
        assert!(err.may_have_landed());
        assert!(!SignerError::Rejected("bad".into()).may_have_landed());
    }
}
