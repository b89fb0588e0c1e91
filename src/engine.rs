// Engine assembly
// Builds the venue adapters, signer factory, executor and tracker from
// configuration and hands out swap sessions that share them
//
// Numan Thabit 2025 Nov

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::SwapConfig;
use crate::control::{AdmissionControl, RateLimitedSource};
use crate::router::{ExecutionStats, RouteSelector, StepExecutor};
use crate::session::{SessionServices, SwapSession};
use crate::settlement::SettlementTracker;
use crate::signers::{Keyring, SignerFactory, SignerResolver};
use crate::types::SwapRequest;
use crate::venues::{LifiAdapter, RouteSource, StatusSource, SwapApiAdapter, VenueSet};

const QUOTE_MAX_INFLIGHT: usize = 8;

pub struct SwapEngine {
    services: Arc<SessionServices>,
}

impl SwapEngine {
    /// Build real adapters and signers from `config`.
    pub fn from_config(config: &SwapConfig, keyring: Arc<dyn Keyring>) -> Result<Self> {
        config.validate()?;
        let registry = config.registry();

        let lifi = Arc::new(
            LifiAdapter::new(&config.lifi, registry.clone()).context("initialize LI.FI adapter")?,
        );
        let single_chain = match &config.swap_api {
            Some(settings) => Some(Arc::new(
                SwapApiAdapter::new(settings).context("initialize swap api adapter")?,
            )),
            None => {
                warn!("swap api not configured; same-chain quotes use the bridge aggregator");
                None
            }
        };

        let (bridge, single_chain): (Arc<dyn RouteSource>, Option<Arc<dyn RouteSource>>) =
            match config.quote_rate_per_sec {
                Some(rate) => {
                    let admission = AdmissionControl::new(QUOTE_MAX_INFLIGHT, rate);
                    (
                        Arc::new(RateLimitedSource::new(lifi.clone(), admission.clone()))
                            as Arc<dyn RouteSource>,
                        single_chain.map(|s| {
                            Arc::new(RateLimitedSource::new(s, admission)) as Arc<dyn RouteSource>
                        }),
                    )
                }
                None => (
                    lifi.clone() as Arc<dyn RouteSource>,
                    single_chain.map(|s| s as Arc<dyn RouteSource>),
                ),
            };

        let signers = Arc::new(SignerFactory::new(
            registry,
            keyring,
            config.timeouts.inclusion(),
        ));
        info!(
            chains = config.chains.len(),
            single_chain = single_chain.is_some(),
            rate_limited = config.quote_rate_per_sec.is_some(),
            "swap engine configured"
        );
        Ok(Self::from_parts(
            VenueSet::new(single_chain, bridge),
            lifi,
            signers,
            config,
        ))
    }

    /// Assemble from explicit collaborators.
    pub fn from_parts(
        venues: VenueSet,
        status: Arc<dyn StatusSource>,
        signers: Arc<dyn SignerResolver>,
        config: &SwapConfig,
    ) -> Self {
        let services = SessionServices {
            selector: RouteSelector::new(venues.clone(), config.bridge_first()),
            executor: Arc::new(StepExecutor::new(venues)),
            tracker: SettlementTracker::new(status, &config.settlement),
            signers,
            timeouts: config.timeouts.clone(),
        };
        Self {
            services: Arc::new(services),
        }
    }

    pub fn new_session(&self, request: SwapRequest) -> SwapSession {
        SwapSession::new(request, self.services.clone())
    }

    pub fn executor_stats(&self) -> ExecutionStats {
        self.services.executor.stats()
    }
}
