// JSON-RPC transport layer implementation
// This file implements a JSON-RPC 2.0 client over HTTP for talking
// to EVM and Solana nodes (submission, receipts, reads)
//
// Numan Thabit 2025 Nov

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::SignerError;
use crate::metrics::{REQ_ERRORS, REQ_LATENCY};

/// Error object returned by a node.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcFault {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct JsonRpc {
    http: Client,
    url: String,
    service: &'static str,
    next_id: Arc<AtomicU64>,
}

impl JsonRpc {
    pub fn new(url: impl Into<String>, service: &'static str) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            url: url.into(),
            service,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }

    /// Call `method` and decode `result`. A node error object becomes
    /// [`SignerError::Rpc`]; use [`JsonRpc::call_raw`] to inspect it.
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, SignerError> {
        match self.call_raw(method, params).await? {
            Ok(result) => serde_json::from_value(result)
                .map_err(|e| SignerError::Rpc(format!("{method}: decode result: {e}"))),
            Err(fault) => Err(SignerError::Rpc(format!(
                "{method}: {} (code {})",
                fault.message, fault.code
            ))),
        }
    }

    /// Transport failures are `Err`; a node-side error object is `Ok(Err(fault))`.
    pub async fn call_raw(
        &self,
        method: &str,
        params: Value,
    ) -> Result<Result<Value, RpcFault>, SignerError> {
        let _timer = REQ_LATENCY
            .with_label_values(&[self.service, method])
            .start_timer();
        let payload = json!({
            "jsonrpc": "2.0",
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
            "method": method,
            "params": params,
        });
        let resp = self
            .http
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| self.fail(method, format!("jsonrpc send: {e}")))?;
        if !resp.status().is_success() {
            return Err(self.fail(method, format!("http {}", resp.status())));
        }
        let body: Value = resp
            .json()
            .await
            .map_err(|e| self.fail(method, format!("json parse: {e}")))?;
        if let Some(err) = body.get("error").filter(|e| !e.is_null()) {
            REQ_ERRORS
                .with_label_values(&[self.service, method])
                .inc();
            return Ok(Err(RpcFault {
                code: err.get("code").and_then(Value::as_i64).unwrap_or_default(),
                message: err
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| err.to_string()),
            }));
        }
        Ok(Ok(body.get("result").cloned().unwrap_or(Value::Null)))
    }

    fn fail(&self, method: &str, detail: String) -> SignerError {
        REQ_ERRORS
            .with_label_values(&[self.service, method])
            .inc();
        SignerError::Rpc(format!("{method}: {detail}"))
    }
}
