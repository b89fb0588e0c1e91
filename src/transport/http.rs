// HTTP transport helpers for venue APIs
// Sends a request, records latency/error metrics and hands back the status
// code with the decoded JSON body so each adapter can classify failures
//
// Numan Thabit 2025 Nov

use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;

use crate::errors::SwapError;
use crate::metrics::{REQ_ERRORS, REQ_LATENCY};

#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    /// `Value::Null` when a non-success body is not JSON
    pub body: Value,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// `message` field of an error body, or the raw body.
    pub fn error_message(&self) -> String {
        self.body
            .get("message")
            .or_else(|| self.body.get("reason"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("http {}: {}", self.status, self.body))
    }
}

pub async fn send_json(
    request: RequestBuilder,
    service: &str,
    method: &str,
) -> Result<HttpReply, SwapError> {
    let _timer = REQ_LATENCY
        .with_label_values(&[service, method])
        .start_timer();
    let resp = match request.send().await {
        Ok(resp) => resp,
        Err(err) => {
            REQ_ERRORS.with_label_values(&[service, method]).inc();
            return Err(SwapError::Upstream(format!("{service} {method} send: {err}")));
        }
    };
    let status = resp.status();
    let bytes = resp.bytes().await.map_err(|err| {
        REQ_ERRORS.with_label_values(&[service, method]).inc();
        SwapError::Upstream(format!("{service} {method} read body: {err}"))
    })?;
    let body = match serde_json::from_slice::<Value>(&bytes) {
        Ok(body) => body,
        Err(err) if status.is_success() => {
            REQ_ERRORS.with_label_values(&[service, method]).inc();
            return Err(SwapError::Upstream(format!(
                "{service} {method} json parse: {err}"
            )));
        }
        Err(_) => Value::Null,
    };
    if !status.is_success() {
        REQ_ERRORS.with_label_values(&[service, method]).inc();
    }
    Ok(HttpReply { status, body })
}
