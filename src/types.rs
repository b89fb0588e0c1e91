// Core value types
// Chain identifiers, chain families, assets and the immutable swap request
//
// Numan Thabit 2025 Nov

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::amounts::BPS_DENOMINATOR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl ChainId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        ChainId(id)
    }
}

/// Key model family of a chain. Signers are resolved per family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    /// Account-based chains signing RLP / typed transactions.
    Evm,
    /// Ed25519 keypair chain signing serialized (legacy or versioned) transactions.
    Solana,
}

impl ChainFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChainFamily::Evm => "evm",
            ChainFamily::Solana => "solana",
        }
    }
}

/// The wallet's logical asset reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Asset {
    /// The chain's native asset (ETH, SOL, ...).
    Native,
    /// Token contract address or mint.
    Token(String),
}

impl Asset {
    pub fn token(address: impl Into<String>) -> Self {
        Asset::Token(address.into())
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Asset::Native)
    }

    pub fn address(&self) -> Option<&str> {
        match self {
            Asset::Native => None,
            Asset::Token(addr) => Some(addr),
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Asset::Native => write!(f, "native"),
            Asset::Token(addr) => write!(f, "{addr}"),
        }
    }
}

/// One user swap intent. Built once per user action and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapRequest {
    source_chain: ChainId,
    destination_chain: ChainId,
    source_asset: Asset,
    destination_asset: Asset,
    amount: u128,
    signer: String,
    recipient: Option<String>,
    slippage_bps: u16,
}

impl SwapRequest {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_chain: ChainId,
        source_asset: Asset,
        destination_chain: ChainId,
        destination_asset: Asset,
        amount: u128,
        signer: impl Into<String>,
        slippage_bps: u16,
    ) -> Result<Self> {
        let signer = signer.into();
        ensure!(amount > 0, "swap amount must be positive");
        ensure!(!signer.trim().is_empty(), "signer address must be set");
        ensure!(
            u128::from(slippage_bps) <= BPS_DENOMINATOR,
            "slippage {slippage_bps} bps exceeds 100%"
        );
        ensure!(
            source_chain != destination_chain || source_asset != destination_asset,
            "source and destination are the same asset"
        );
        Ok(Self {
            source_chain,
            destination_chain,
            source_asset,
            destination_asset,
            amount,
            signer,
            recipient: None,
            slippage_bps,
        })
    }

    /// Receiving address on the destination chain, when it differs from the signer
    /// (e.g. EVM to Solana).
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
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

    pub fn amount(&self) -> u128 {
        self.amount
    }

    pub fn signer(&self) -> &str {
        &self.signer
    }

    pub fn recipient(&self) -> &str {
        self.recipient.as_deref().unwrap_or(&self.signer)
    }

    pub fn slippage_bps(&self) -> u16 {
        self.slippage_bps
    }

    pub fn is_same_chain(&self) -> bool {
        self.source_chain == self.destination_chain
    }
}
