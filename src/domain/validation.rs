//! Write-boundary validation for lots, options and the store config.
//!
//! Rows that pass here satisfy the invariants the cost basis allocator
//! relies on (positive share counts, ordered dates, known option types).

use crate::domain::error::WheelerError;
use crate::domain::lot::NewLot;
use crate::domain::option_event::NewOptionEvent;
use crate::ports::config_port::ConfigPort;

/// Trim and upper-case a ticker. Returns `None` if nothing is left.
pub fn normalize_symbol(symbol: &str) -> Option<String> {
    let symbol = symbol.trim().to_uppercase();
    if symbol.is_empty() { None } else { Some(symbol) }
}

pub fn validate_lot(lot: &NewLot) -> Result<NewLot, WheelerError> {
    let invalid = |reason: &str| WheelerError::InvalidLot {
        reason: reason.to_string(),
    };

    let symbol = normalize_symbol(&lot.symbol).ok_or_else(|| invalid("symbol is required"))?;
    if lot.shares == 0 {
        return Err(invalid("shares must be positive"));
    }
    if !lot.buy_price.is_finite() || lot.buy_price < 0.0 {
        return Err(invalid("buy_price must be a non-negative number"));
    }
    if let Some(exit) = lot.exit_price {
        if !exit.is_finite() || exit < 0.0 {
            return Err(invalid("exit_price must be a non-negative number"));
        }
    }
    if let Some(closed) = lot.closed {
        if closed < lot.opened {
            return Err(invalid("closed date is before opened date"));
        }
    }

    Ok(NewLot {
        symbol,
        ..lot.clone()
    })
}

pub fn validate_option(option: &NewOptionEvent) -> Result<NewOptionEvent, WheelerError> {
    let invalid = |reason: &str| WheelerError::InvalidOption {
        reason: reason.to_string(),
    };

    let symbol =
        normalize_symbol(&option.symbol).ok_or_else(|| invalid("symbol is required"))?;
    if option.contracts == 0 {
        return Err(invalid("contracts must be positive"));
    }
    if !option.strike.is_finite() || option.strike <= 0.0 {
        return Err(invalid("strike must be positive"));
    }
    if !option.premium.is_finite() || option.premium < 0.0 {
        return Err(invalid("premium must be a non-negative number"));
    }
    if !option.commission.is_finite() || option.commission < 0.0 {
        return Err(invalid("commission must be a non-negative number"));
    }
    if let Some(exit) = option.exit_price {
        if !exit.is_finite() || exit < 0.0 {
            return Err(invalid("exit_price must be a non-negative number"));
        }
    }
    if option.expiration < option.opened {
        return Err(invalid("expiration is before opened date"));
    }
    if let Some(closed) = option.closed {
        if closed < option.opened {
            return Err(invalid("closed date is before opened date"));
        }
    }

    Ok(NewOptionEvent {
        symbol,
        ..option.clone()
    })
}

pub fn validate_database_config(config: &dyn ConfigPort) -> Result<(), WheelerError> {
    match config.get_string("database", "path") {
        Some(p) if !p.trim().is_empty() => {}
        _ => {
            return Err(WheelerError::ConfigMissing {
                section: "database".to_string(),
                key: "path".to_string(),
            });
        }
    }

    let pool_size = config.get_int("database", "pool_size", 4);
    if pool_size < 1 || u32::try_from(pool_size).is_err() {
        return Err(WheelerError::ConfigInvalid {
            section: "database".to_string(),
            key: "pool_size".to_string(),
            reason: format!("pool_size must be between 1 and {}", u32::MAX),
        });
    }

    let busy_timeout = config.get_int("database", "busy_timeout_ms", 10_000);
    if busy_timeout < 0 || u32::try_from(busy_timeout).is_err() {
        return Err(WheelerError::ConfigInvalid {
            section: "database".to_string(),
            key: "busy_timeout_ms".to_string(),
            reason: format!("busy_timeout_ms must be between 0 and {}", u32::MAX),
        });
    }
    Ok(())
}
