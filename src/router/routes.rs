// Route types
// This file defines the normalized route model every venue adapter
// produces: ordered steps, fee line items and settlement estimate
//
// Numan Thabit 2025 Nov

use serde::Serialize;
use std::fmt;

use crate::errors::SwapError;
use crate::types::{Asset, ChainId};

/// Which adapter produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueKind {
    /// Single-chain DEX aggregator
    SingleChain,
    /// Bridge aggregator (same-chain or cross-chain)
    Bridge,
}

impl VenueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VenueKind::SingleChain => "single_chain",
            VenueKind::Bridge => "bridge",
        }
    }
}

impl fmt::Display for VenueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeCategory {
    Protocol,
    Gas,
    Bridge,
    Integrator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeeItem {
    pub chain: ChainId,
    /// Asset the fee is paid in
    pub asset: Asset,
    pub amount: u128,
    pub category: FeeCategory,
}

/// One atomic on-chain action.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStep {
    /// Chain the transaction is submitted on
    pub chain: ChainId,
    /// Chain where the step's output lands
    pub to_chain: ChainId,
    /// Bridge / DEX tool reported by the venue (status lookup key)
    pub tool: String,
    /// Asset consumed by this step
    pub from_asset: Asset,
    /// Amount consumed, smallest unit (approval amount)
    pub from_amount: u128,
    /// Set only when an allowance must be granted before the step
    pub approval_spender: Option<String>,
    /// Venue document; only the producing adapter reads it
    pub venue_payload: serde_json::Value,
}

impl RouteStep {
    pub fn crosses_chains(&self) -> bool {
        self.chain != self.to_chain
    }

    pub fn needs_approval_check(&self) -> bool {
        self.approval_spender
            .as_deref()
            .is_some_and(|s| !s.is_empty())
            && !self.from_asset.is_native()
    }
}

/// Normalized, immutable quote.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    id: String,
    venue: VenueKind,
    source_chain: ChainId,
    destination_chain: ChainId,
    source_asset: Asset,
    destination_asset: Asset,
    source_amount: u128,
    expected_output: u128,
    min_output: u128,
    steps: Vec<RouteStep>,
    fees: Vec<FeeItem>,
    estimated_duration_secs: u64,
}

/// Field bundle for [`Route::new`].
#[derive(Debug, Clone)]
pub struct RouteParts {
    pub id: String,
    pub venue: VenueKind,
    pub source_chain: ChainId,
    pub destination_chain: ChainId,
    pub source_asset: Asset,
    pub destination_asset: Asset,
    pub source_amount: u128,
    pub expected_output: u128,
    pub min_output: u128,
    pub steps: Vec<RouteStep>,
    pub fees: Vec<FeeItem>,
    pub estimated_duration_secs: u64,
}

impl Route {
    pub fn new(parts: RouteParts) -> Result<Self, SwapError> {
        if parts.steps.is_empty() {
            return Err(SwapError::MalformedRoute(format!(
                "route {} has no steps",
                parts.id
            )));
        }
        if parts.min_output > parts.expected_output {
            return Err(SwapError::MalformedRoute(format!(
                "route {} minimum output {} exceeds expected {}",
                parts.id, parts.min_output, parts.expected_output
            )));
        }
        let estimated_duration_secs = if parts.source_chain == parts.destination_chain {
            0
        } else {
            parts.estimated_duration_secs
        };
        Ok(Self {
            id: parts.id,
            venue: parts.venue,
            source_chain: parts.source_chain,
            destination_chain: parts.destination_chain,
            source_asset: parts.source_asset,
            destination_asset: parts.destination_asset,
            source_amount: parts.source_amount,
            expected_output: parts.expected_output,
            min_output: parts.min_output,
            steps: parts.steps,
            fees: parts.fees,
            estimated_duration_secs,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn venue(&self) -> VenueKind {
        self.venue
    }

    pub fn source_chain(&self) -> ChainId {
        self.source_chain
    }

    pub fn destination_chain(&self) -> ChainId {
        self.destination_chain
    }

    pub fn source_asset(&self) -> &Asset {
        &self.source_asset
    }

    pub fn destination_asset(&self) -> &Asset {
        &self.destination_asset
    }

    pub fn source_amount(&self) -> u128 {
        self.source_amount
    }

    pub fn expected_output(&self) -> u128 {
        self.expected_output
    }

    pub fn min_output(&self) -> u128 {
        self.min_output
    }

    pub fn steps(&self) -> &[RouteStep] {
        &self.steps
    }

    pub fn step(&self, index: usize) -> Option<&RouteStep> {
        self.steps.get(index)
    }

    pub fn last_step(&self) -> &RouteStep {
        // non-empty by construction
        &self.steps[self.steps.len() - 1]
    }

    pub fn fees(&self) -> &[FeeItem] {
        &self.fees
    }

    /// Advisory for same-chain routes (always 0).
    pub fn estimated_duration_secs(&self) -> u64 {
        self.estimated_duration_secs
    }

    pub fn is_cross_chain(&self) -> bool {
        self.source_chain != self.destination_chain
    }
}

/// Opaque unsigned transaction document for one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxTemplate {
    pub chain: ChainId,
    pub payload: serde_json::Value,
}
