// Bridge aggregator adapter (LI.FI API)
// Quotes same-chain and cross-chain routes, resolves per-step transactions
// and answers bridge status lookups
//
// Numan Thabit 2025 Nov

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::amounts::{bps_to_fraction, parse_amount};
use crate::config::{ChainRegistry, LifiConfig};
use crate::errors::SwapError;
use crate::router::routes::{
    FeeCategory, FeeItem, Route, RouteParts, RouteStep, TxTemplate, VenueKind,
};
use crate::transport::http::{send_json, HttpReply};
use crate::types::{Asset, ChainFamily, ChainId, SwapRequest};
use crate::venues::{RouteSource, StatusQuery, StatusReport, StatusSource};

const SERVICE: &str = "lifi";

pub const EVM_NATIVE_SENTINEL: &str = "0x0000000000000000000000000000000000000000";
pub const EVM_NATIVE_ALT_SENTINEL: &str = "0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee";
pub const SOLANA_NATIVE_SENTINEL: &str = "11111111111111111111111111111111";

// venue error codes
const CODE_NO_QUOTE: u64 = 1002;
const CODE_NOT_FOUND: u64 = 1003;
const CODE_VALIDATION: u64 = 1011;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoutesResponse {
    #[serde(default)]
    routes: Vec<LifiRoute>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiRoute {
    id: String,
    from_chain_id: u64,
    to_chain_id: u64,
    from_amount: String,
    to_amount: String,
    to_amount_min: String,
    #[serde(default)]
    steps: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiStep {
    tool: String,
    action: LifiAction,
    estimate: LifiEstimate,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiAction {
    from_chain_id: u64,
    to_chain_id: u64,
    from_token: LifiToken,
    from_amount: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiEstimate {
    approval_address: Option<String>,
    #[serde(default)]
    execution_duration: f64,
    #[serde(default)]
    fee_costs: Vec<LifiCost>,
    #[serde(default)]
    gas_costs: Vec<LifiCost>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiCost {
    #[serde(default)]
    name: Option<String>,
    amount: String,
    token: LifiToken,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LifiToken {
    address: String,
    chain_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: String,
    substatus: Option<String>,
}

/// LI.FI bridge aggregator adapter
pub struct LifiAdapter {
    http: Client,
    base_url: Url,
    integrator: Option<String>,
    chains: ChainRegistry,
}

impl LifiAdapter {
    pub fn new(config: &LifiConfig, chains: ChainRegistry) -> Result<Self, SwapError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| SwapError::Upstream(format!("invalid LI.FI api key header: {e}")))?;
            headers.insert(HeaderName::from_static("x-lifi-api-key"), value);
        }
        let http = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| SwapError::Upstream(format!("build LI.FI client: {e}")))?;

        info!(base_url = %config.base_url, chains = chains.len(), "LI.FI adapter initialized");

        Ok(Self {
            http,
            base_url: config.base_url.clone(),
            integrator: config.integrator.clone(),
            chains,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Key family of a chain the request names. Unregistered chains have no
    /// native sentinel to send.
    fn family(&self, chain: ChainId) -> Result<ChainFamily, SwapError> {
        self.chains
            .family(chain)
            .ok_or(SwapError::UnsupportedChain(chain.as_u64()))
    }

    /// Wallet asset for a token the venue reports on `chain`.
    fn asset_on(&self, address: &str, chain: ChainId) -> Asset {
        match self.chains.family(chain) {
            Some(family) => wallet_asset(address, family),
            None => {
                let native = [ChainFamily::Evm, ChainFamily::Solana]
                    .into_iter()
                    .any(|family| wallet_asset(address, family) == Asset::Native);
                if native {
                    Asset::Native
                } else {
                    Asset::Token(address.to_string())
                }
            }
        }
    }

    fn routes_body(&self, req: &SwapRequest) -> Result<Value, SwapError> {
        let mut options = json!({
            "slippage": bps_to_fraction(req.slippage_bps()).parse::<f64>().unwrap_or(0.0),
            "order": "CHEAPEST",
            "allowSwitchChain": false,
        });
        if let Some(integrator) = &self.integrator {
            options["integrator"] = json!(integrator);
        }
        Ok(json!({
            "fromChainId": req.source_chain().as_u64(),
            "toChainId": req.destination_chain().as_u64(),
            "fromTokenAddress": venue_address(req.source_asset(), self.family(req.source_chain())?),
            "toTokenAddress": venue_address(
                req.destination_asset(),
                self.family(req.destination_chain())?
            ),
            "fromAmount": req.amount().to_string(),
            "fromAddress": req.signer(),
            "toAddress": req.recipient(),
            "options": options,
        }))
    }
}

/// Wallet asset -> venue token address.
pub fn venue_address(asset: &Asset, family: ChainFamily) -> String {
    match (asset, family) {
        (Asset::Native, ChainFamily::Evm) => EVM_NATIVE_SENTINEL.to_string(),
        (Asset::Native, ChainFamily::Solana) => SOLANA_NATIVE_SENTINEL.to_string(),
        (Asset::Token(addr), _) => addr.clone(),
    }
}

/// Venue token address -> wallet asset.
pub fn wallet_asset(address: &str, family: ChainFamily) -> Asset {
    let is_native = match family {
        ChainFamily::Evm => {
            address.eq_ignore_ascii_case(EVM_NATIVE_SENTINEL)
                || address.eq_ignore_ascii_case(EVM_NATIVE_ALT_SENTINEL)
        }
        ChainFamily::Solana => address == SOLANA_NATIVE_SENTINEL,
    };
    if is_native {
        Asset::Native
    } else {
        Asset::Token(address.to_string())
    }
}

fn classify_error(reply: &HttpReply, method: &str) -> SwapError {
    let message = reply.error_message();
    let code = reply.body.get("code").and_then(Value::as_u64);
    match (code, reply.status) {
        (Some(CODE_NO_QUOTE), _) => SwapError::NoLiquidity(message),
        (Some(CODE_VALIDATION | CODE_NOT_FOUND), _) => SwapError::InvalidPair(message),
        (Some(_), _) => SwapError::Upstream(format!("lifi {method}: {message}")),
        (None, StatusCode::NOT_FOUND) => SwapError::NoLiquidity(message),
        (None, StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY) => {
            SwapError::InvalidPair(message)
        }
        (None, _) => SwapError::Upstream(format!("lifi {method}: {message}")),
    }
}

fn malformed(detail: impl std::fmt::Display) -> SwapError {
    SwapError::MalformedRoute(format!("lifi: {detail}"))
}

fn amount(raw: &str, what: &str) -> Result<u128, SwapError> {
    parse_amount(raw).map_err(|e| malformed(format!("{what}: {e}")))
}

fn is_zero_address(addr: &str) -> bool {
    addr.is_empty() || addr.eq_ignore_ascii_case(EVM_NATIVE_SENTINEL)
}

fn fee_category(name: Option<&str>, crosses: bool) -> FeeCategory {
    let is_integrator = name
        .map(|n| n.to_ascii_lowercase().contains("integrator"))
        .unwrap_or(false);
    if is_integrator {
        FeeCategory::Integrator
    } else if crosses {
        FeeCategory::Bridge
    } else {
        FeeCategory::Protocol
    }
}

/// Check the step chain invariants the venue must uphold.
pub fn validate_step_chain(req: &SwapRequest, steps: &[RouteStep]) -> Result<(), SwapError> {
    let (first, last) = match (steps.first(), steps.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(malformed("route has no steps")),
    };
    if first.chain != req.source_chain() {
        return Err(malformed(format!(
            "first step on chain {} but source chain is {}",
            first.chain,
            req.source_chain()
        )));
    }
    if last.to_chain != req.destination_chain() {
        return Err(malformed(format!(
            "last step ends on chain {} but destination chain is {}",
            last.to_chain,
            req.destination_chain()
        )));
    }
    for (i, pair) in steps.windows(2).enumerate() {
        if pair[0].to_chain != pair[1].chain {
            return Err(malformed(format!(
                "step {} ends on chain {} but step {} starts on chain {}",
                i,
                pair[0].to_chain,
                i + 1,
                pair[1].chain
            )));
        }
    }
    Ok(())
}

impl LifiAdapter {
    fn normalize_step(&self, raw: Value) -> Result<(RouteStep, Vec<FeeItem>, f64), SwapError> {
        let step: LifiStep =
            serde_json::from_value(raw.clone()).map_err(|e| malformed(format!("step: {e}")))?;
        let chain = ChainId(step.action.from_chain_id);
        let to_chain = ChainId(step.action.to_chain_id);
        let crosses = chain != to_chain;

        let mut fees = Vec::new();
        for cost in &step.estimate.fee_costs {
            let token_chain = ChainId(cost.token.chain_id);
            fees.push(FeeItem {
                chain: token_chain,
                asset: self.asset_on(&cost.token.address, token_chain),
                amount: amount(&cost.amount, "fee amount")?,
                category: fee_category(cost.name.as_deref(), crosses),
            });
        }
        for cost in &step.estimate.gas_costs {
            let token_chain = ChainId(cost.token.chain_id);
            fees.push(FeeItem {
                chain: token_chain,
                asset: self.asset_on(&cost.token.address, token_chain),
                amount: amount(&cost.amount, "gas amount")?,
                category: FeeCategory::Gas,
            });
        }

        let approval_spender = step
            .estimate
            .approval_address
            .filter(|addr| !is_zero_address(addr));

        let route_step = RouteStep {
            chain,
            to_chain,
            tool: step.tool,
            from_asset: self.asset_on(&step.action.from_token.address, chain),
            from_amount: amount(&step.action.from_amount, "step fromAmount")?,
            approval_spender,
            venue_payload: raw,
        };
        Ok((route_step, fees, step.estimate.execution_duration.max(0.0)))
    }

    fn normalize_route(&self, req: &SwapRequest, route: LifiRoute) -> Result<Route, SwapError> {
        if route.from_chain_id != req.source_chain().as_u64()
            || route.to_chain_id != req.destination_chain().as_u64()
        {
            return Err(malformed(format!(
                "route {} covers {} -> {}, requested {} -> {}",
                route.id,
                route.from_chain_id,
                route.to_chain_id,
                req.source_chain(),
                req.destination_chain()
            )));
        }

        let mut steps = Vec::with_capacity(route.steps.len());
        let mut fees = Vec::new();
        let mut duration = 0.0f64;
        for raw in route.steps {
            let (step, step_fees, step_duration) = self.normalize_step(raw)?;
            steps.push(step);
            fees.extend(step_fees);
            duration += step_duration;
        }
        validate_step_chain(req, &steps)?;

        Route::new(RouteParts {
            id: route.id,
            venue: VenueKind::Bridge,
            source_chain: req.source_chain(),
            destination_chain: req.destination_chain(),
            source_asset: req.source_asset().clone(),
            destination_asset: req.destination_asset().clone(),
            source_amount: amount(&route.from_amount, "route fromAmount")?,
            expected_output: amount(&route.to_amount, "route toAmount")?,
            min_output: amount(&route.to_amount_min, "route toAmountMin")?,
            steps,
            fees,
            estimated_duration_secs: duration.ceil() as u64,
        })
    }

    /// Normalize a routes document into the best route.
    fn route_from_document(&self, req: &SwapRequest, body: Value) -> Result<Route, SwapError> {
        let parsed: RoutesResponse = serde_json::from_value(body)
            .map_err(|e| SwapError::Upstream(format!("lifi routes decode: {e}")))?;
        let best = parsed.routes.into_iter().next().ok_or_else(|| {
            SwapError::NoLiquidity(format!(
                "no routes for {} on {} -> {} on {}",
                req.source_asset(),
                req.source_chain(),
                req.destination_asset(),
                req.destination_chain()
            ))
        })?;
        self.normalize_route(req, best)
    }
}

#[async_trait]
impl RouteSource for LifiAdapter {
    fn kind(&self) -> VenueKind {
        VenueKind::Bridge
    }

    #[tracing::instrument(skip_all, fields(from = %req.source_chain(), to = %req.destination_chain()))]
    async fn quote(&self, req: &SwapRequest) -> Result<Route, SwapError> {
        let body = self.routes_body(req)?;
        let reply = send_json(
            self.http.post(self.endpoint("advanced/routes")).json(&body),
            SERVICE,
            "routes",
        )
        .await?;
        if !reply.is_success() {
            let err = classify_error(&reply, "routes");
            debug!(status = %reply.status, error = %err, "LI.FI quote rejected");
            return Err(err);
        }
        let route = self.route_from_document(req, reply.body)?;
        debug!(
            route = %route.id(),
            steps = route.steps().len(),
            expected_output = %route.expected_output(),
            "LI.FI route normalized"
        );
        Ok(route)
    }

    async fn step_transaction(
        &self,
        route: &Route,
        index: usize,
        _signer_address: &str,
    ) -> Result<TxTemplate, SwapError> {
        let step = route
            .step(index)
            .ok_or_else(|| malformed(format!("step {index} out of range")))?;
        let reply = send_json(
            self.http
                .post(self.endpoint("advanced/stepTransaction"))
                .json(&step.venue_payload),
            SERVICE,
            "stepTransaction",
        )
        .await?;
        if !reply.is_success() {
            return Err(classify_error(&reply, "stepTransaction"));
        }
        let payload = reply
            .body
            .get("transactionRequest")
            .cloned()
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                SwapError::Upstream(format!(
                    "lifi stepTransaction returned no transaction for step {index}"
                ))
            })?;
        Ok(TxTemplate {
            chain: step.chain,
            payload,
        })
    }
}

#[async_trait]
impl StatusSource for LifiAdapter {
    async fn status(&self, query: &StatusQuery) -> Result<StatusReport, SwapError> {
        let from_chain = query.from_chain.to_string();
        let to_chain = query.to_chain.to_string();
        let request = self.http.get(self.endpoint("status")).query(&[
            ("txHash", query.tx_hash.as_str()),
            ("bridge", query.tool.as_str()),
            ("fromChain", from_chain.as_str()),
            ("toChain", to_chain.as_str()),
        ]);
        let reply = send_json(request, SERVICE, "status").await?;
        if reply.status == StatusCode::NOT_FOUND && reply.body.get("status").is_none() {
            return Ok(StatusReport::new("NOT_FOUND", None));
        }
        if !reply.is_success() {
            warn!(status = %reply.status, tx_hash = %query.tx_hash, "LI.FI status lookup failed");
            return Err(SwapError::Upstream(format!(
                "lifi status: {}",
                reply.error_message()
            )));
        }
        let parsed: StatusResponse = serde_json::from_value(reply.body)
            .map_err(|e| SwapError::Upstream(format!("lifi status decode: {e}")))?;
        Ok(StatusReport {
            status: parsed.status,
            substatus: parsed.substatus,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;

    const SOL: u64 = 1151111081099710;

    fn adapter() -> LifiAdapter {
        let chains = ChainRegistry::new(vec![
            ChainConfig {
                id: 1,
                name: "ethereum".into(),
                family: ChainFamily::Evm,
                rpc_url: Url::parse("https://eth.example.org").unwrap(),
            },
            ChainConfig {
                id: SOL,
                name: "solana".into(),
                family: ChainFamily::Solana,
                rpc_url: Url::parse("https://sol.example.org").unwrap(),
            },
        ]);
        LifiAdapter::new(&LifiConfig::default(), chains).unwrap()
    }

    fn usdc() -> Asset {
        Asset::token("0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48")
    }

    fn request(dst: u64) -> SwapRequest {
        SwapRequest::new(ChainId(1), usdc(), ChainId(dst), Asset::Native, 1_000_000, "0xabc", 50)
            .unwrap()
    }

    fn step_doc(from: u64, to: u64, token: &str, approval: Option<&str>) -> Value {
        json!({
            "id": "step",
            "type": "lifi",
            "tool": "mayan",
            "action": {
                "fromChainId": from,
                "toChainId": to,
                "fromToken": { "address": token, "chainId": from },
                "toToken": { "address": SOLANA_NATIVE_SENTINEL, "chainId": to },
                "fromAmount": "1000000",
            },
            "estimate": {
                "approvalAddress": approval,
                "executionDuration": 62.5,
                "feeCosts": [
                    { "name": "LIFI Fixed Fee", "amount": "2500",
                      "token": { "address": token, "chainId": from } },
                    { "name": "Integrator Fee", "amount": "1000",
                      "token": { "address": token, "chainId": from } }
                ],
                "gasCosts": [
                    { "type": "SEND", "amount": "21000000000",
                      "token": { "address": EVM_NATIVE_SENTINEL, "chainId": from } }
                ]
            }
        })
    }

    fn routes_doc(steps: Vec<Value>, from: u64, to: u64) -> Value {
        json!({
            "routes": [{
                "id": "route-1",
                "fromChainId": from,
                "toChainId": to,
                "fromAmount": "1000000",
                "toAmount": "4000000",
                "toAmountMin": "3980000",
                "steps": steps,
            }]
        })
    }

    #[test]
    fn native_sentinels_round_trip_per_family() {
        assert_eq!(venue_address(&Asset::Native, ChainFamily::Evm), EVM_NATIVE_SENTINEL);
        assert_eq!(
            venue_address(&Asset::Native, ChainFamily::Solana),
            SOLANA_NATIVE_SENTINEL
        );
        assert_eq!(wallet_asset(EVM_NATIVE_SENTINEL, ChainFamily::Evm), Asset::Native);
        assert_eq!(
            wallet_asset("0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE", ChainFamily::Evm),
            Asset::Native
        );
        assert_eq!(
            wallet_asset(SOLANA_NATIVE_SENTINEL, ChainFamily::Solana),
            Asset::Native
        );
        // wrapped SOL stays a token
        assert_eq!(
            wallet_asset("So11111111111111111111111111111111111111112", ChainFamily::Solana),
            Asset::token("So11111111111111111111111111111111111111112")
        );
    }

    #[test]
    fn request_body_uses_venue_sentinels() {
        let a = adapter();
        let req = request(SOL).with_recipient("7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        let body = a.routes_body(&req).unwrap();
        assert_eq!(body["toTokenAddress"], SOLANA_NATIVE_SENTINEL);
        assert_eq!(body["fromAmount"], "1000000");
        assert_eq!(body["toAddress"], "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU");
        assert_eq!(body["options"]["slippage"], 0.005);
    }

    #[test]
    fn unregistered_chain_is_unsupported() {
        let a = adapter();
        let unknown = 1399811149;
        let req = SwapRequest::new(
            ChainId(1),
            usdc(),
            ChainId(unknown),
            Asset::Native,
            1_000_000,
            "0xabc",
            50,
        )
        .unwrap();
        assert_eq!(
            a.routes_body(&req).unwrap_err(),
            SwapError::UnsupportedChain(unknown)
        );
        // reported tokens on unknown chains still recognize native sentinels
        assert_eq!(a.asset_on(SOLANA_NATIVE_SENTINEL, ChainId(unknown)), Asset::Native);
        assert_eq!(a.asset_on(EVM_NATIVE_SENTINEL, ChainId(137)), Asset::Native);
        assert_eq!(
            a.asset_on("0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174", ChainId(137)),
            Asset::token("0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174")
        );
    }

    #[test]
    fn normalizes_cross_chain_route() {
        let a = adapter();
        let token = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
        let doc = routes_doc(
            vec![step_doc(1, SOL, token, Some("0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE"))],
            1,
            SOL,
        );
        let route = a.route_from_document(&request(SOL), doc).unwrap();

        assert_eq!(route.venue(), VenueKind::Bridge);
        assert_eq!(route.expected_output(), 4_000_000);
        assert_eq!(route.min_output(), 3_980_000);
        assert_eq!(route.estimated_duration_secs(), 63);
        assert_eq!(route.steps().len(), 1);

        let step = &route.steps()[0];
        assert_eq!(step.chain, ChainId(1));
        assert_eq!(step.to_chain, ChainId(SOL));
        assert_eq!(step.tool, "mayan");
        assert_eq!(step.from_asset, Asset::token(token));
        assert_eq!(
            step.approval_spender.as_deref(),
            Some("0x1231DEB6f5749EF6cE6943a275A1D3E7486F4EaE")
        );

        let categories: Vec<_> = route.fees().iter().map(|f| f.category).collect();
        assert_eq!(
            categories,
            vec![FeeCategory::Bridge, FeeCategory::Integrator, FeeCategory::Gas]
        );
        assert_eq!(route.fees()[2].asset, Asset::Native);
    }

    #[test]
    fn zero_approval_address_means_no_approval() {
        let a = adapter();
        let doc = routes_doc(
            vec![step_doc(1, SOL, EVM_NATIVE_SENTINEL, Some(EVM_NATIVE_SENTINEL))],
            1,
            SOL,
        );
        let req = SwapRequest::new(
            ChainId(1),
            Asset::Native,
            ChainId(SOL),
            Asset::Native,
            1_000_000,
            "0xabc",
            50,
        )
        .unwrap();
        let route = a.route_from_document(&req, doc).unwrap();
        assert_eq!(route.steps()[0].approval_spender, None);
        assert_eq!(route.steps()[0].from_asset, Asset::Native);
    }

    #[test]
    fn inconsistent_step_chains_are_malformed() {
        let a = adapter();
        let token = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";

        // last step lands on chain 10, not on the requested destination
        let doc = routes_doc(vec![step_doc(1, 10, token, None)], 1, SOL);
        let err = a.route_from_document(&request(SOL), doc).unwrap_err();
        assert!(matches!(err, SwapError::MalformedRoute(_)), "{err:?}");

        // first step not on the source chain
        let doc = routes_doc(vec![step_doc(137, SOL, token, None)], 1, SOL);
        let err = a.route_from_document(&request(SOL), doc).unwrap_err();
        assert!(matches!(err, SwapError::MalformedRoute(_)), "{err:?}");

        // gap between steps
        let doc = routes_doc(
            vec![step_doc(1, 137, token, None), step_doc(10, SOL, token, None)],
            1,
            SOL,
        );
        let err = a.route_from_document(&request(SOL), doc).unwrap_err();
        assert!(matches!(err, SwapError::MalformedRoute(_)), "{err:?}");
    }

    #[test]
    fn empty_route_list_is_no_liquidity() {
        let a = adapter();
        let err = a
            .route_from_document(&request(SOL), json!({ "routes": [] }))
            .unwrap_err();
        assert!(matches!(err, SwapError::NoLiquidity(_)));
    }

    #[test]
    fn error_codes_are_classified() {
        let reply = |status: u16, body: Value| HttpReply {
            status: StatusCode::from_u16(status).unwrap(),
            body,
        };
        assert!(matches!(
            classify_error(&reply(404, json!({"code": 1002, "message": "No available quotes"})), "routes"),
            SwapError::NoLiquidity(_)
        ));
        assert!(matches!(
            classify_error(&reply(400, json!({"code": 1011, "message": "Invalid toToken"})), "routes"),
            SwapError::InvalidPair(_)
        ));
        assert!(matches!(
            classify_error(&reply(429, json!({"code": 1005, "message": "Rate limit"})), "routes"),
            SwapError::Upstream(_)
        ));
        assert!(matches!(
            classify_error(&reply(502, Value::Null), "routes"),
            SwapError::Upstream(_)
        ));
        assert!(matches!(
            classify_error(&reply(404, Value::Null), "routes"),
            SwapError::NoLiquidity(_)
        ));
    }
}
