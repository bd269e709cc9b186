//! Option contracts opened against a symbol.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Shares controlled by one contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OptionType {
    Put,
    Call,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptionType::Put => "Put",
            OptionType::Call => "Call",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Put" => Ok(OptionType::Put),
            "Call" => Ok(OptionType::Call),
            other => Err(format!("option type must be 'Put' or 'Call', got '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionEvent {
    pub id: i64,
    pub symbol: String,
    pub option_type: OptionType,
    pub opened: NaiveDate,
    pub closed: Option<NaiveDate>,
    pub strike: f64,
    pub expiration: NaiveDate,
    pub premium: f64,
    pub contracts: u32,
    pub exit_price: Option<f64>,
    pub commission: f64,
}

impl OptionEvent {
    pub fn exit_price_or_zero(&self) -> f64 {
        self.exit_price.unwrap_or(0.0)
    }

    /// Premium kept after buying back and paying fees. Negative for a losing trade.
    pub fn net_premium(&self) -> f64 {
        (self.premium - self.exit_price_or_zero()) * f64::from(self.contracts) * CONTRACT_MULTIPLIER
            - self.commission
    }

    /// Shares a covered call can be written against.
    pub fn coverage_shares(&self) -> u64 {
        u64::from(self.contracts) * 100
    }

    /// Realised profit in whole dollars, less commission.
    pub fn total_profit(&self) -> f64 {
        let gross = ((self.premium - self.exit_price_or_zero())
            * f64::from(self.contracts)
            * CONTRACT_MULTIPLIER)
            .floor();
        gross - self.commission
    }

    pub fn is_profit(&self) -> bool {
        self.total_profit() > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.total_profit() < 0.0
    }

    /// Share of the maximum premium actually kept, in percent.
    pub fn percent_of_profit(&self) -> f64 {
        if self.premium == 0.0 {
            return 0.0;
        }
        let max_profit = self.premium * f64::from(self.contracts) * CONTRACT_MULTIPLIER;
        self.total_profit() / max_profit * 100.0
    }

    pub fn days_to_expiration(&self) -> i64 {
        (self.expiration - self.opened).num_days().max(0)
    }

    pub fn days_to_close(&self) -> i64 {
        match self.closed {
            Some(closed) => (closed - self.opened).num_days(),
            None => 0,
        }
    }

    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.expiration - today).num_days()
    }

    fn end_date(&self, today: NaiveDate) -> NaiveDate {
        self.closed.unwrap_or(today)
    }

    /// Elapsed share of the contract's life, in percent, clamped to [0, 100].
    pub fn percent_of_time(&self, today: NaiveDate) -> f64 {
        let total_days = (self.expiration - self.opened).num_days() as f64;
        if total_days <= 0.0 {
            return 0.0;
        }
        let used_days = ((self.end_date(today) - self.opened).num_days() as f64).max(1.0);
        (used_days / total_days * 100.0).clamp(0.0, 100.0)
    }

    /// Profit captured relative to time spent.
    pub fn multiplier(&self, today: NaiveDate) -> f64 {
        let pct_time = self.percent_of_time(today);
        if pct_time == 0.0 {
            return 0.0;
        }
        self.percent_of_profit() / pct_time
    }

    /// Annualised return on the strike exposure, in percent.
    pub fn aroi(&self, today: NaiveDate) -> f64 {
        let mut days_in_trade = (self.end_date(today) - self.opened).num_days() as f64;
        if days_in_trade <= 0.0 {
            days_in_trade = 1.0;
        }
        let capital = self.strike * f64::from(self.contracts) * CONTRACT_MULTIPLIER;
        if capital <= 0.0 {
            return 0.0;
        }
        let period_return = self.total_profit() / capital * 100.0;
        period_return * (365.25 / days_in_trade)
    }

    /// Distance out of the money as a percent of `current_price`; 0 when in the money.
    pub fn percent_otm(&self, current_price: f64) -> f64 {
        if current_price <= 0.0 {
            return 0.0;
        }
        match self.option_type {
            OptionType::Put if current_price >= self.strike => {
                ((current_price - self.strike) / current_price * 100.0).abs()
            }
            OptionType::Call if current_price <= self.strike => {
                ((self.strike - current_price) / current_price * 100.0).abs()
            }
            _ => 0.0,
        }
    }
}

/// Fields supplied by the caller when recording or editing an option.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOptionEvent {
    pub symbol: String,
    pub option_type: OptionType,
    pub opened: NaiveDate,
    pub strike: f64,
    pub expiration: NaiveDate,
    pub premium: f64,
    pub contracts: u32,
    pub commission: f64,
    pub closed: Option<NaiveDate>,
    pub exit_price: Option<f64>,
}
