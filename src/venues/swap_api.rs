// Single-chain DEX aggregator adapter (0x-compatible swap API)
// Quotes same-chain swaps against per-chain API hosts and turns the
// firm quote into a one-step route
//
// Numan Thabit 2025 Nov

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::amounts::{apply_slippage, bps_to_fraction, min_output_from_price, parse_amount};
use crate::config::SwapApiConfig;
use crate::errors::SwapError;
use crate::router::routes::{
    FeeCategory, FeeItem, Route, RouteParts, RouteStep, TxTemplate, VenueKind,
};
use crate::transport::http::{send_json, HttpReply};
use crate::types::{Asset, ChainId, SwapRequest};
use crate::venues::RouteSource;

const SERVICE: &str = "swap_api";

pub const NATIVE_SENTINEL: &str = "0xEeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE";
const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// validation reasons reported by the venue
const REASON_NO_LIQUIDITY: &str = "INSUFFICIENT_ASSET_LIQUIDITY";
const REASON_UNSUPPORTED_TOKEN: &str = "TOKEN_NOT_SUPPORTED";
const REASON_INVALID_ADDRESS: &str = "INVALID_ADDRESS";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResponse {
    price: String,
    guaranteed_price: Option<String>,
    to: String,
    data: String,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    gas: Option<String>,
    #[serde(default)]
    gas_price: Option<String>,
    buy_amount: String,
    sell_amount: String,
    #[serde(default)]
    allowance_target: Option<String>,
    #[serde(default)]
    sources: Vec<LiquiditySource>,
}

#[derive(Debug, Clone, Deserialize)]
struct LiquiditySource {
    name: String,
    proportion: String,
}

impl LiquiditySource {
    fn used(&self) -> bool {
        self.proportion.trim().parse::<f64>().map(|p| p > 0.0).unwrap_or(false)
    }
}

/// 0x-compatible single-chain swap adapter
pub struct SwapApiAdapter {
    http: Client,
    endpoints: HashMap<ChainId, Url>,
}

impl SwapApiAdapter {
    pub fn new(config: &SwapApiConfig) -> Result<Self, SwapError> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| SwapError::Upstream(format!("invalid swap api key header: {e}")))?;
            headers.insert(HeaderName::from_static("0x-api-key"), value);
        }
        let http = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| SwapError::Upstream(format!("build swap api client: {e}")))?;
        let endpoints = config
            .endpoints
            .iter()
            .map(|(id, url)| (ChainId(*id), url.clone()))
            .collect::<HashMap<_, _>>();

        info!(chains = endpoints.len(), "swap api adapter initialized");
        Ok(Self { http, endpoints })
    }

    fn quote_url(&self, chain: ChainId) -> Result<String, SwapError> {
        let base = self.endpoints.get(&chain).ok_or_else(|| {
            SwapError::InvalidPair(format!("no single-chain swap endpoint for chain {chain}"))
        })?;
        Ok(format!(
            "{}/swap/v1/quote",
            base.as_str().trim_end_matches('/')
        ))
    }

    async fn fetch_quote(&self, req: &SwapRequest, taker: &str) -> Result<Value, SwapError> {
        if !req.is_same_chain() {
            return Err(SwapError::InvalidPair(format!(
                "single-chain venue cannot route {} -> {}",
                req.source_chain(),
                req.destination_chain()
            )));
        }
        let url = self.quote_url(req.source_chain())?;
        let params = quote_params(req, taker);
        let reply = send_json(self.http.get(url).query(&params), SERVICE, "quote").await?;
        if !reply.is_success() {
            let err = classify_error(&reply);
            debug!(status = %reply.status, error = %err, "swap api quote rejected");
            return Err(err);
        }
        Ok(reply.body)
    }
}

/// Wallet asset -> venue token parameter.
pub fn venue_token(asset: &Asset) -> String {
    match asset {
        Asset::Native => NATIVE_SENTINEL.to_string(),
        Asset::Token(addr) => addr.clone(),
    }
}

/// Venue token parameter -> wallet asset.
pub fn wallet_token(address: &str) -> Asset {
    if address.eq_ignore_ascii_case(NATIVE_SENTINEL) {
        Asset::Native
    } else {
        Asset::Token(address.to_string())
    }
}

fn quote_params(req: &SwapRequest, taker: &str) -> Vec<(&'static str, String)> {
    vec![
        ("sellToken", venue_token(req.source_asset())),
        ("buyToken", venue_token(req.destination_asset())),
        ("sellAmount", req.amount().to_string()),
        ("takerAddress", taker.to_string()),
        ("slippagePercentage", bps_to_fraction(req.slippage_bps())),
    ]
}

fn validation_reasons(body: &Value) -> Vec<String> {
    body.get("validationErrors")
        .and_then(Value::as_array)
        .map(|errs| {
            errs.iter()
                .filter_map(|e| e.get("reason").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn classify_error(reply: &HttpReply) -> SwapError {
    let message = reply.error_message();
    let reasons = validation_reasons(&reply.body);
    if reasons.iter().any(|r| r == REASON_NO_LIQUIDITY) {
        return SwapError::NoLiquidity(message);
    }
    if reasons
        .iter()
        .any(|r| r == REASON_UNSUPPORTED_TOKEN || r == REASON_INVALID_ADDRESS)
    {
        return SwapError::InvalidPair(message);
    }
    if reply.status.is_client_error() && reply.status.as_u16() != 429 && !reasons.is_empty() {
        return SwapError::InvalidPair(message);
    }
    SwapError::Upstream(format!("swap api: {message}"))
}

fn malformed(detail: impl std::fmt::Display) -> SwapError {
    SwapError::MalformedRoute(format!("swap api: {detail}"))
}

fn amount(raw: &str, what: &str) -> Result<u128, SwapError> {
    parse_amount(raw).map_err(|e| malformed(format!("{what}: {e}")))
}

/// Build the one-step route for a quote document.
fn route_from_quote(req: &SwapRequest, body: Value) -> Result<Route, SwapError> {
    let quote: QuoteResponse = serde_json::from_value(body.clone())
        .map_err(|e| SwapError::Upstream(format!("swap api quote decode: {e}")))?;

    let used: Vec<&str> = quote
        .sources
        .iter()
        .filter(|s| s.used())
        .map(|s| s.name.as_str())
        .collect();
    if used.is_empty() {
        return Err(SwapError::NoLiquidity(format!(
            "no liquidity sources for {} -> {} on chain {}",
            req.source_asset(),
            req.destination_asset(),
            req.source_chain()
        )));
    }

    let sell_amount = amount(&quote.sell_amount, "sellAmount")?;
    let buy_amount = amount(&quote.buy_amount, "buyAmount")?;
    let min_output = match &quote.guaranteed_price {
        Some(guaranteed) => min_output_from_price(buy_amount, &quote.price, guaranteed)
            .map_err(|e| malformed(format!("guaranteedPrice: {e}")))?,
        None => apply_slippage(buy_amount, req.slippage_bps())
            .map_err(|e| malformed(format!("slippage: {e}")))?,
    };

    let approval_spender = match (&quote.allowance_target, req.source_asset()) {
        (_, Asset::Native) => None,
        (Some(target), _) if !target.is_empty() && !target.eq_ignore_ascii_case(ZERO_ADDRESS) => {
            Some(target.clone())
        }
        _ => None,
    };

    let mut fees = Vec::new();
    if let (Some(gas), Some(gas_price)) = (&quote.gas, &quote.gas_price) {
        let gas_fee = amount(gas, "gas")?.saturating_mul(amount(gas_price, "gasPrice")?);
        fees.push(FeeItem {
            chain: req.source_chain(),
            asset: Asset::Native,
            amount: gas_fee,
            category: FeeCategory::Gas,
        });
    }

    let chain = req.source_chain();
    let step = RouteStep {
        chain,
        to_chain: chain,
        tool: used.join("+"),
        from_asset: req.source_asset().clone(),
        from_amount: sell_amount,
        approval_spender,
        venue_payload: body,
    };

    Route::new(RouteParts {
        id: format!("{SERVICE}:{chain}:{}", quote.to.to_ascii_lowercase()),
        venue: VenueKind::SingleChain,
        source_chain: chain,
        destination_chain: chain,
        source_asset: req.source_asset().clone(),
        destination_asset: req.destination_asset().clone(),
        source_amount: sell_amount,
        expected_output: buy_amount,
        min_output,
        steps: vec![step],
        fees,
        estimated_duration_secs: 0,
    })
}

/// Unsigned transaction document out of a quote document.
fn template_from_quote(chain: ChainId, body: &Value) -> Result<TxTemplate, SwapError> {
    let quote: QuoteResponse = serde_json::from_value(body.clone())
        .map_err(|e| SwapError::Upstream(format!("swap api quote decode: {e}")))?;
    let mut payload = json!({
        "to": quote.to,
        "data": quote.data,
        "value": quote.value.unwrap_or_else(|| "0".to_string()),
        "chainId": chain.as_u64(),
    });
    if let Some(gas) = quote.gas {
        payload["gasLimit"] = json!(gas);
    }
    if let Some(gas_price) = quote.gas_price {
        payload["gasPrice"] = json!(gas_price);
    }
    Ok(TxTemplate { chain, payload })
}

#[async_trait]
impl RouteSource for SwapApiAdapter {
    fn kind(&self) -> VenueKind {
        VenueKind::SingleChain
    }

    #[tracing::instrument(skip_all, fields(chain = %req.source_chain()))]
    async fn quote(&self, req: &SwapRequest) -> Result<Route, SwapError> {
        let body = self.fetch_quote(req, req.signer()).await?;
        let route = route_from_quote(req, body)?;
        debug!(
            route = %route.id(),
            expected_output = %route.expected_output(),
            min_output = %route.min_output(),
            "swap api route normalized"
        );
        Ok(route)
    }

    /// Firm quotes expire quickly; each submission re-quotes the same pair.
    async fn step_transaction(
        &self,
        route: &Route,
        index: usize,
        signer_address: &str,
    ) -> Result<TxTemplate, SwapError> {
        if index != 0 {
            return Err(malformed(format!("single-step route has no step {index}")));
        }
        let req = SwapRequest::new(
            route.source_chain(),
            route.source_asset().clone(),
            route.destination_chain(),
            route.destination_asset().clone(),
            route.source_amount(),
            signer_address,
            slippage_of(route),
        )
        .map_err(|e| malformed(e))?;
        let body = self.fetch_quote(&req, signer_address).await?;
        requote_template(route, &req, body)
    }
}

/// Template for a re-quote of `route`, or an error when the re-quote no longer
/// honors what was reviewed.
fn requote_template(route: &Route, req: &SwapRequest, body: Value) -> Result<TxTemplate, SwapError> {
    let template = template_from_quote(route.source_chain(), &body)?;
    let fresh = route_from_quote(req, body)?;
    check_requote(route, &fresh)?;
    Ok(template)
}

/// The re-quote must sell the same amount, guarantee at least the reviewed
/// minimum and pull funds through the spender that was approved.
fn check_requote(reviewed: &Route, fresh: &Route) -> Result<(), SwapError> {
    let drifted = |reason: String| {
        warn!(route = %reviewed.id(), %reason, "re-quote rejected");
        SwapError::StepSubmissionFailed {
            step: 0,
            reason: format!("re-quote {reason}"),
            tx_hash: None,
            may_have_landed: false,
        }
    };
    if fresh.source_amount() != reviewed.source_amount() {
        return Err(drifted(format!(
            "sells {} instead of {}",
            fresh.source_amount(),
            reviewed.source_amount()
        )));
    }
    if fresh.min_output() < reviewed.min_output() {
        return Err(drifted(format!(
            "guarantees {} below reviewed minimum {}",
            fresh.min_output(),
            reviewed.min_output()
        )));
    }
    let spender = |route: &Route| {
        route
            .step(0)
            .and_then(|step| step.approval_spender.clone())
            .map(|s| s.to_ascii_lowercase())
    };
    if spender(fresh) != spender(reviewed) {
        return Err(drifted(format!(
            "allowance target {:?} differs from reviewed {:?}",
            spender(fresh),
            spender(reviewed)
        )));
    }
    Ok(())
}

/// Slippage implied by the route's own bounds, in basis points (rounded
/// down so the re-quote is never looser than the review).
fn slippage_of(route: &Route) -> u16 {
    let expected = route.expected_output();
    if expected == 0 {
        return 0;
    }
    let gap = expected - route.min_output();
    let bps = gap.saturating_mul(10_000) / expected;
    bps.min(10_000) as u16
}
