// Metrics and observability module
// This file handles collection of upstream latency, error counts,
// session outcomes and settlement polling statistics
//
// Numan Thabit 2025 Nov

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter_vec, CounterVec,
    HistogramVec, IntCounterVec,
};

pub static REQ_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "xswap_request_latency_seconds",
        "latency for upstream calls",
        &["service", "method"]
    )
    .unwrap()
});

pub static REQ_ERRORS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "xswap_request_errors_total",
        "errors by upstream",
        &["service", "method"]
    )
    .unwrap()
});

pub static SESSIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "xswap_sessions_total",
        "swap sessions by terminal outcome",
        &["outcome"]
    )
    .unwrap()
});

pub static SETTLEMENT_POLLS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "xswap_settlement_polls_total",
        "settlement status lookups by result",
        &["result"]
    )
    .unwrap()
});
