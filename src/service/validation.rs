//! Admission validation: syntactic checks, business rules, risk rules.
//!
//! Checks run in that order and short-circuit on the first failure.

use super::config::CoreConfig;
use super::error::ServiceError;
use super::requests::OrderRequest;
use crate::types::OrderKind;
use chrono::{NaiveTime, Utc};

/// Upper bound on order quantity, external units.
pub const MAX_QUANTITY: f64 = 1_000_000.0;

/// Upper bound on limit prices, external units.
pub const MAX_PRICE: f64 = 1_000_000.0;

/// Maximum lifetime of a Day order, milliseconds.
const DAY_ORDER_MAX_LIFETIME_MS: u64 = 24 * 60 * 60 * 1_000;

/// Syntactic validation: field presence, ranges, and the price-by-type table.
pub fn validate_syntax(request: &OrderRequest, now_ms: u64) -> Result<(), ServiceError> {
    if request.user_id.trim().is_empty() {
        return Err(ServiceError::InvalidRequest("user_id is required".into()));
    }
    if !valid_symbol(&request.symbol) {
        return Err(ServiceError::InvalidRequest(format!(
            "symbol {:?} must be 2-20 characters from [A-Za-z0-9._-]",
            request.symbol
        )));
    }
    if !(request.quantity > 0.0 && request.quantity <= MAX_QUANTITY) {
        return Err(ServiceError::InvalidRequest(format!(
            "quantity {} outside (0, {MAX_QUANTITY}]",
            request.quantity
        )));
    }
    if let Some(cid) = &request.client_order_id
        && cid.trim().is_empty()
    {
        return Err(ServiceError::InvalidRequest(
            "client_order_id must be non-empty when present".into(),
        ));
    }

    let price_positive = request.price.is_some_and(|p| p > 0.0);
    let stop_positive = request.stop_price.is_some_and(|p| p > 0.0);
    match request.kind {
        OrderKind::Market => {}
        OrderKind::Limit => {
            if !price_positive || request.price.is_some_and(|p| p > MAX_PRICE) {
                return Err(ServiceError::InvalidRequest(format!(
                    "limit order requires price in (0, {MAX_PRICE}]"
                )));
            }
        }
        OrderKind::StopLimit => {
            if !price_positive {
                return Err(ServiceError::InvalidRequest(
                    "stop-limit order requires a positive price".into(),
                ));
            }
            if !stop_positive {
                return Err(ServiceError::InvalidRequest(
                    "stop-limit order requires a positive stop_price".into(),
                ));
            }
        }
        OrderKind::StopMarket => {
            if !stop_positive {
                return Err(ServiceError::InvalidRequest(
                    "stop-market order requires a positive stop_price".into(),
                ));
            }
        }
    }

    if request.time_in_force == crate::types::TimeInForce::Day {
        let Some(expires_at) = request.expires_at else {
            return Err(ServiceError::InvalidRequest(
                "day order requires expires_at".into(),
            ));
        };
        if expires_at <= now_ms || expires_at > now_ms + DAY_ORDER_MAX_LIFETIME_MS {
            return Err(ServiceError::InvalidRequest(
                "day order expires_at must be within the next 24 hours".into(),
            ));
        }
    }

    Ok(())
}

/// Business rules: notional cap, symbol allow-list, trading hours, daily cap.
///
/// `effective_price` is the limit price when present, otherwise the last
/// trade price of the symbol; with neither available the notional check is
/// skipped.
pub fn validate_business(
    request: &OrderRequest,
    config: &CoreConfig,
    effective_price: Option<f64>,
    daily_count: u32,
) -> Result<(), ServiceError> {
    if let Some(price) = effective_price {
        let notional = price * request.quantity;
        if notional > config.max_order_value {
            return Err(ServiceError::BusinessRuleViolated(format!(
                "order value {notional:.2} exceeds maximum {:.2}",
                config.max_order_value
            )));
        }
    }

    if let Some(allowed) = &config.allowed_symbols
        && !allowed.contains(&request.symbol)
    {
        return Err(ServiceError::BusinessRuleViolated(format!(
            "symbol {} is not tradable",
            request.symbol
        )));
    }

    if let (Some(start), Some(end)) = (config.trading_hours_start, config.trading_hours_end) {
        let now = Utc::now().time();
        if !within_trading_hours(now, start, end) {
            return Err(ServiceError::BusinessRuleViolated(
                "outside trading hours".into(),
            ));
        }
    }

    if daily_count >= config.max_daily_orders {
        return Err(ServiceError::BusinessRuleViolated(format!(
            "daily order limit {} reached",
            config.max_daily_orders
        )));
    }

    Ok(())
}

/// Risk rules: resulting position and the leverage proxy.
pub fn validate_risk(
    request: &OrderRequest,
    config: &CoreConfig,
    current_position: f64,
    effective_price: Option<f64>,
) -> Result<(), ServiceError> {
    let signed = request.side.sign() * request.quantity;
    let resulting = current_position + signed;
    if resulting.abs() > config.max_position_size {
        return Err(ServiceError::RiskLimitExceeded(format!(
            "resulting position {resulting:.2} exceeds maximum {:.2}",
            config.max_position_size
        )));
    }

    if let Some(price) = effective_price
        && config.account_equity > 0.0
    {
        let leverage = price * request.quantity / config.account_equity;
        if leverage > config.max_leverage {
            return Err(ServiceError::RiskLimitExceeded(format!(
                "leverage {leverage:.2} exceeds maximum {:.2}",
                config.max_leverage
            )));
        }
    }

    Ok(())
}

fn valid_symbol(symbol: &str) -> bool {
    (2..=20).contains(&symbol.len())
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Whether `now` falls inside the window. Windows with `start > end` wrap
/// midnight.
fn within_trading_hours(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        now >= start && now <= end
    } else {
        now >= start || now <= end
    }
}
