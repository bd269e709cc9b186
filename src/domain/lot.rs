//! Stock lots: blocks of shares bought together.

use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lot {
    pub id: i64,
    pub symbol: String,
    pub opened: NaiveDate,
    pub closed: Option<NaiveDate>,
    pub shares: u32,
    pub buy_price: f64,
    pub adjusted_cost_basis_per_share: f64,
    pub adjusted_cost_basis_total: f64,
    pub exit_price: Option<f64>,
}

impl Lot {
    /// Unadjusted cost of the whole lot.
    pub fn base_total(&self) -> f64 {
        self.buy_price * f64::from(self.shares)
    }

    /// True if the shares were held at any point on `date`. A lot closed on
    /// `date` still counts as held that day.
    pub fn is_held_on(&self, date: NaiveDate) -> bool {
        if self.opened > date {
            return false;
        }
        match self.closed {
            None => true,
            Some(closed) => closed >= date,
        }
    }

    pub fn is_open(&self) -> bool {
        self.closed.is_none()
    }

    /// Adjusted per-share basis, falling back to the buy price for rows that
    /// were never recalculated.
    pub fn cost_basis_per_share(&self) -> f64 {
        if self.adjusted_cost_basis_per_share > 0.0 {
            self.adjusted_cost_basis_per_share
        } else {
            self.buy_price
        }
    }

    pub fn amount(&self) -> f64 {
        self.cost_basis_per_share() * f64::from(self.shares)
    }

    fn exit_or(&self, current_price: f64) -> f64 {
        self.exit_price.unwrap_or(current_price)
    }

    pub fn profit_loss(&self, current_price: f64) -> f64 {
        (self.exit_or(current_price) - self.cost_basis_per_share()) * f64::from(self.shares)
    }

    /// Percent return against the adjusted basis.
    pub fn roi(&self, current_price: f64) -> f64 {
        let basis = self.cost_basis_per_share();
        if basis == 0.0 {
            return 0.0;
        }
        (self.exit_or(current_price) - basis) / basis * 100.0
    }

    /// Annualised dividend yield on cost, in percent.
    pub fn dividend_yield(&self, quarterly_dividend: f64) -> f64 {
        let basis = self.cost_basis_per_share();
        if basis == 0.0 {
            return 0.0;
        }
        quarterly_dividend * 4.0 / basis * 100.0
    }
}

/// Fields supplied by the caller when recording or editing a lot.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLot {
    pub symbol: String,
    pub opened: NaiveDate,
    pub shares: u32,
    pub buy_price: f64,
    pub closed: Option<NaiveDate>,
    pub exit_price: Option<f64>,
}
