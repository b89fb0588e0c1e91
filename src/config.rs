// Configuration management module
// This file handles loading and parsing of configuration settings
// from environment variables and YAML documents, and exposes the chain registry
//
// Numan Thabit 2025 Nov

use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use url::Url;

use crate::types::{ChainFamily, ChainId};

pub const DEFAULT_LIFI_URL: &str = "https://li.quest/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct SwapConfig {
    /// Chains the wallet can sign on
    #[serde(default)]
    pub chains: Vec<ChainConfig>,
    /// Bridge aggregator settings
    #[serde(default)]
    pub lifi: LifiConfig,
    /// Single-chain swap API (optional; without it every quote goes to the bridge aggregator)
    pub swap_api: Option<SwapApiConfig>,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    /// Chains whose same-chain swaps query the bridge aggregator first
    #[serde(default)]
    pub bridge_first_chains: Vec<u64>,
    /// Quote admission rate (quotes per second across all adapters)
    pub quote_rate_per_sec: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub id: u64,
    pub name: String,
    pub family: ChainFamily,
    /// JSON-RPC endpoint used for submission and inclusion polling
    pub rpc_url: Url,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LifiConfig {
    #[serde(default = "default_lifi_url")]
    pub base_url: Url,
    pub api_key: Option<String>,
    pub integrator: Option<String>,
}

impl Default for LifiConfig {
    fn default() -> Self {
        Self {
            base_url: default_lifi_url(),
            api_key: None,
            integrator: None,
        }
    }
}

fn default_lifi_url() -> Url {
    Url::parse(DEFAULT_LIFI_URL).expect("valid default LI.FI url")
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwapApiConfig {
    /// Per-chain API hosts, e.g. 1 -> https://api.0x.org
    pub endpoints: HashMap<u64, Url>,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutConfig {
    /// Quote calls: short, quotes go stale quickly
    #[serde(default = "default_quote_ms")]
    pub quote_ms: u64,
    /// Step calls: template + approval + submission + inclusion
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,
    /// Inclusion wait inside a signer
    #[serde(default = "default_inclusion_secs")]
    pub inclusion_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            quote_ms: default_quote_ms(),
            step_ms: default_step_ms(),
            inclusion_secs: default_inclusion_secs(),
        }
    }
}

impl TimeoutConfig {
    pub fn quote(&self) -> Duration {
        Duration::from_millis(self.quote_ms)
    }

    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_ms)
    }

    pub fn inclusion(&self) -> Duration {
        Duration::from_secs(self.inclusion_secs)
    }
}

fn default_quote_ms() -> u64 {
    15_000
}

fn default_step_ms() -> u64 {
    180_000
}

fn default_inclusion_secs() -> u64 {
    120
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettlementConfig {
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: u64,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            deadline_secs: default_deadline_secs(),
        }
    }
}

impl SettlementConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_deadline_secs() -> u64 {
    600
}

impl SwapConfig {
    /// Load from `XSWAP__*` environment variables, layered over the YAML file named
    /// by `XSWAP_CONFIG` when set.
    pub fn load() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var("XSWAP_CONFIG") {
            builder = builder.add_source(config::File::with_name(&path));
        }
        let cfg = builder
            .add_source(config::Environment::with_prefix("XSWAP").separator("__"))
            .build()
            .context("build configuration sources")?;
        let parsed: SwapConfig = cfg
            .try_deserialize()
            .context("deserialize swap configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn from_yaml_str(doc: &str) -> Result<Self> {
        let parsed: SwapConfig = serde_yaml::from_str(doc).context("parse YAML configuration")?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for chain in &self.chains {
            if !seen.insert(chain.id) {
                bail!("duplicate chain id {} in configuration", chain.id);
            }
        }
        ensure!(
            self.settlement.poll_interval_secs > 0,
            "settlement poll interval must be positive"
        );
        ensure!(
            self.settlement.deadline_secs >= self.settlement.poll_interval_secs,
            "settlement deadline shorter than poll interval"
        );
        ensure!(self.timeouts.quote_ms > 0, "quote timeout must be positive");
        ensure!(self.timeouts.step_ms > 0, "step timeout must be positive");
        if let Some(rate) = self.quote_rate_per_sec {
            ensure!(rate > 0, "quote rate must be positive when set");
        }
        Ok(())
    }

    pub fn registry(&self) -> ChainRegistry {
        ChainRegistry::new(self.chains.clone())
    }

    pub fn bridge_first(&self) -> HashSet<ChainId> {
        self.bridge_first_chains.iter().copied().map(ChainId).collect()
    }
}

/// Chain id -> family / RPC lookup, passed explicitly to adapters and signers.
#[derive(Debug, Clone, Default)]
pub struct ChainRegistry {
    chains: HashMap<ChainId, ChainConfig>,
}

impl ChainRegistry {
    pub fn new(chains: Vec<ChainConfig>) -> Self {
        Self {
            chains: chains.into_iter().map(|c| (ChainId(c.id), c)).collect(),
        }
    }

    pub fn get(&self, chain: ChainId) -> Option<&ChainConfig> {
        self.chains.get(&chain)
    }

    pub fn family(&self, chain: ChainId) -> Option<ChainFamily> {
        self.chains.get(&chain).map(|c| c.family)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
