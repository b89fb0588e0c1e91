// Test doubles for the swap core
// Scripted route sources, status source and signers that record every call
// into a shared log so tests can assert call order
//
// Numan Thabit 2025 Nov

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use xswap::config::SwapConfig;
use xswap::errors::{SignerError, SwapError};
use xswap::router::{FeeItem, Route, RouteParts, RouteStep, TxTemplate, VenueKind};
use xswap::signers::{ChainSigner, SignerResolver};
use xswap::venues::{RouteSource, StatusQuery, StatusReport, StatusSource, VenueSet};
use xswap::{Asset, ChainFamily, ChainId, SwapEngine, SwapRequest};

pub const ETH: u64 = 1;
pub const ARB: u64 = 42161;
pub const SOL: u64 = 1151111081099710;
pub const USDC: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const SPENDER: &str = "0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE";

/// Shared, ordered record of calls across mocks.
#[derive(Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|e| e.starts_with(prefix)).count()
    }
}

/// Route source returning scripted quotes.
pub struct MockSource {
    kind: VenueKind,
    quotes: Mutex<VecDeque<Result<Route, SwapError>>>,
    template_error: Option<SwapError>,
    log: CallLog,
}

impl MockSource {
    pub fn new(kind: VenueKind, log: CallLog) -> Self {
        Self {
            kind,
            quotes: Mutex::new(VecDeque::new()),
            template_error: None,
            log,
        }
    }

    pub fn with_quote(self, quote: Result<Route, SwapError>) -> Self {
        self.quotes.lock().unwrap().push_back(quote);
        self
    }

    pub fn with_template_error(mut self, err: SwapError) -> Self {
        self.template_error = Some(err);
        self
    }

    fn name(&self) -> &'static str {
        match self.kind {
            VenueKind::SingleChain => "single",
            VenueKind::Bridge => "bridge",
        }
    }
}

#[async_trait]
impl RouteSource for MockSource {
    fn kind(&self) -> VenueKind {
        self.kind
    }

    async fn quote(&self, _req: &SwapRequest) -> Result<Route, SwapError> {
        self.log.push(format!("quote:{}", self.name()));
        self.quotes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(SwapError::NoLiquidity("no scripted quote".into())))
    }

    async fn step_transaction(
        &self,
        route: &Route,
        index: usize,
        signer_address: &str,
    ) -> Result<TxTemplate, SwapError> {
        self.log.push(format!("template:{}:{index}", self.name()));
        if let Some(err) = &self.template_error {
            return Err(err.clone());
        }
        let step = &route.steps()[index];
        Ok(TxTemplate {
            chain: step.chain,
            payload: json!({ "step": index, "from": signer_address }),
        })
    }
}

/// Status source replaying a script, then reporting `fallback` forever.
pub struct MockStatus {
    script: Mutex<VecDeque<Result<StatusReport, SwapError>>>,
    fallback: StatusReport,
    queries: Mutex<Vec<StatusQuery>>,
    log: CallLog,
}

impl MockStatus {
    pub fn new(log: CallLog) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: StatusReport::new("PENDING", Some("WAIT_DESTINATION_TRANSACTION")),
            queries: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn then(self, status: &str, substatus: Option<&str>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Ok(StatusReport::new(status, substatus)));
        self
    }

    pub fn then_error(self, err: SwapError) -> Self {
        self.script.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn polls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<StatusQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatusSource for MockStatus {
    async fn status(&self, query: &StatusQuery) -> Result<StatusReport, SwapError> {
        self.log.push(format!("status:{}", query.tx_hash));
        self.queries.lock().unwrap().push(query.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}

/// Signer with a fixed allowance that records every call.
pub struct MockSigner {
    family: ChainFamily,
    allowance: Mutex<u128>,
    send_errors: Mutex<VecDeque<SignerError>>,
    send_delay: Option<Duration>,
    sent: Mutex<Vec<TxTemplate>>,
    log: CallLog,
}

impl MockSigner {
    pub fn new(family: ChainFamily, allowance: u128, log: CallLog) -> Self {
        Self {
            family,
            allowance: Mutex::new(allowance),
            send_errors: Mutex::new(VecDeque::new()),
            send_delay: None,
            sent: Mutex::new(Vec::new()),
            log,
        }
    }

    pub fn failing_with(self, err: SignerError) -> Self {
        self.send_errors.lock().unwrap().push_back(err);
        self
    }

    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    pub fn sent(&self) -> Vec<TxTemplate> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainSigner for MockSigner {
    fn family(&self) -> ChainFamily {
        self.family
    }

    fn address(&self) -> String {
        "0xuser".to_string()
    }

    async fn allowance(&self, token: &str, spender: &str) -> Result<u128, SignerError> {
        self.log.push(format!("allowance:{token}:{spender}"));
        Ok(*self.allowance.lock().unwrap())
    }

    fn approval_template(
        &self,
        token: &str,
        spender: &str,
        amount: u128,
    ) -> Result<TxTemplate, SignerError> {
        Ok(TxTemplate {
            chain: ChainId(ETH),
            payload: json!({ "approve": token, "spender": spender, "amount": amount.to_string() }),
        })
    }

    async fn sign_and_send(&self, template: &TxTemplate) -> Result<String, SignerError> {
        let is_approval = template.payload.get("approve").is_some();
        let n = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(template.clone());
            sent.len()
        };
        self.log.push(if is_approval {
            format!("sign:approve:{n}")
        } else {
            format!("sign:step:{n}")
        });
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.send_errors.lock().unwrap().pop_front() {
            return Err(err);
        }
        if is_approval {
            *self.allowance.lock().unwrap() = u128::MAX;
        }
        Ok(format!("0xtx{n}"))
    }
}

/// Resolves the same signer for every known chain.
pub struct MockSigners {
    signer: Arc<MockSigner>,
    chains: Vec<u64>,
}

impl MockSigners {
    pub fn new(signer: Arc<MockSigner>, chains: &[u64]) -> Self {
        Self {
            signer,
            chains: chains.to_vec(),
        }
    }
}

impl SignerResolver for MockSigners {
    fn signer_for(&self, chain: ChainId) -> Result<Arc<dyn ChainSigner>, SwapError> {
        if self.chains.contains(&chain.as_u64()) {
            Ok(self.signer.clone() as Arc<dyn ChainSigner>)
        } else {
            Err(SwapError::UnsupportedChain(chain.as_u64()))
        }
    }
}

pub fn step(chain: u64, to_chain: u64, asset: Asset, spender: Option<&str>) -> RouteStep {
    RouteStep {
        chain: ChainId(chain),
        to_chain: ChainId(to_chain),
        tool: if chain == to_chain { "dex".into() } else { "bridge".into() },
        from_asset: asset,
        from_amount: 1_000_000,
        approval_spender: spender.map(str::to_string),
        venue_payload: json!({}),
    }
}

pub fn route(venue: VenueKind, src: u64, dst: u64, steps: Vec<RouteStep>) -> Route {
    let source_asset = steps[0].from_asset.clone();
    Route::new(RouteParts {
        id: format!("{}-{src}-{dst}", venue.as_str()),
        venue,
        source_chain: ChainId(src),
        destination_chain: ChainId(dst),
        source_asset,
        destination_asset: Asset::Native,
        source_amount: 1_000_000,
        expected_output: 990_000,
        min_output: 985_000,
        steps,
        fees: Vec::<FeeItem>::new(),
        estimated_duration_secs: 90,
    })
    .unwrap()
}

pub fn same_chain_request(asset: Asset) -> SwapRequest {
    SwapRequest::new(ChainId(ETH), asset, ChainId(ETH), Asset::token("0xdai"), 1_000_000, "0xuser", 50)
        .unwrap()
}

pub fn cross_chain_request() -> SwapRequest {
    SwapRequest::new(ChainId(ETH), Asset::token(USDC), ChainId(ARB), Asset::Native, 1_000_000, "0xuser", 50)
        .unwrap()
}

pub fn config() -> SwapConfig {
    SwapConfig::from_yaml_str(
        r#"
settlement:
  poll_interval_secs: 5
  deadline_secs: 600
bridge_first_chains: [1151111081099710]
"#,
    )
    .unwrap()
}

/// Everything a session test needs, wired through the public engine.
pub struct Harness {
    pub log: CallLog,
    pub single: Arc<MockSource>,
    pub bridge: Arc<MockSource>,
    pub status: Arc<MockStatus>,
    pub signer: Arc<MockSigner>,
    pub engine: SwapEngine,
}

pub fn harness(
    log: CallLog,
    single: MockSource,
    bridge: MockSource,
    status: MockStatus,
    signer: MockSigner,
) -> Harness {
    let single = Arc::new(single);
    let bridge = Arc::new(bridge);
    let status = Arc::new(status);
    let signer = Arc::new(signer);
    let venues = VenueSet::new(
        Some(single.clone() as Arc<dyn RouteSource>),
        bridge.clone() as Arc<dyn RouteSource>,
    );
    let signers = Arc::new(MockSigners::new(signer.clone(), &[ETH, ARB, SOL]));
    let engine = SwapEngine::from_parts(venues, status.clone(), signers, &config());
    Harness {
        log,
        single,
        bridge,
        status,
        signer,
        engine,
    }
}
