// Amount helpers
// This file handles integer amount parsing and slippage math for
// venue quotes (smallest-unit integers, basis points)
//
// Numan Thabit 2025 Nov

use anyhow::{ensure, Context, Result};

pub const BPS_DENOMINATOR: u128 = 10_000;

const RATIO_SCALE: u128 = 1_000_000_000_000;

/// Parse a decimal smallest-unit amount as returned by venue APIs.
pub fn parse_amount(raw: &str) -> Result<u128> {
    let trimmed = raw.trim();
    ensure!(!trimmed.is_empty(), "empty amount");
    trimmed
        .parse::<u128>()
        .with_context(|| format!("invalid integer amount: {trimmed}"))
}

/// Minimum acceptable output after `slippage_bps`, rounded down.
pub fn apply_slippage(amount: u128, slippage_bps: u16) -> Result<u128> {
    ensure!(
        u128::from(slippage_bps) <= BPS_DENOMINATOR,
        "slippage {slippage_bps} bps exceeds 100%"
    );
    let keep = BPS_DENOMINATOR - u128::from(slippage_bps);
    // split to avoid overflow on very large amounts
    let whole = (amount / BPS_DENOMINATOR) * keep;
    let rest = (amount % BPS_DENOMINATOR) * keep / BPS_DENOMINATOR;
    Ok(whole + rest)
}

/// Basis points as a decimal fraction string (50 -> "0.005").
pub fn bps_to_fraction(slippage_bps: u16) -> String {
    let value = f64::from(slippage_bps) / BPS_DENOMINATOR as f64;
    let mut s = format!("{value:.4}");
    while s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.push('0');
    }
    s
}

/// Minimum output implied by a quoted price and its guaranteed (worst) price.
///
/// Both prices are output-per-input in display units; their ratio is
/// decimal-free, so it scales the smallest-unit `buy_amount` directly.
/// Clamped to `buy_amount`.
pub fn min_output_from_price(buy_amount: u128, price: &str, guaranteed_price: &str) -> Result<u128> {
    let price = parse_price(price)?;
    let guaranteed = parse_price(guaranteed_price)?;
    ensure!(price > 0.0, "quoted price must be positive");
    let ratio = guaranteed / price;
    if ratio >= 1.0 {
        return Ok(buy_amount);
    }
    // f64 cannot hold 18-decimal amounts exactly; scale in integers
    let keep = (ratio * RATIO_SCALE as f64).floor() as u128;
    let whole = (buy_amount / RATIO_SCALE) * keep;
    let rest = (buy_amount % RATIO_SCALE) * keep / RATIO_SCALE;
    Ok((whole + rest).min(buy_amount))
}

fn parse_price(raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid price: {raw}"))?;
    ensure!(
        value.is_finite() && value >= 0.0,
        "price must be finite and non-negative"
    );
    Ok(value)
}
