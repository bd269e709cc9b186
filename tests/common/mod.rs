#![allow(dead_code)]

use chrono::NaiveDate;
use std::collections::HashSet;
use wheeler::adapters::sqlite_adapter::SqliteAdapter;
use wheeler::domain::cost_basis::LotAdjustment;
use wheeler::domain::error::WheelerError;
pub use wheeler::domain::lot::{Lot, NewLot};
pub use wheeler::domain::option_event::{NewOptionEvent, OptionEvent, OptionType};
use wheeler::ports::ledger_port::{CostBasisPort, LedgerPort};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn ledger() -> SqliteAdapter {
    let adapter = SqliteAdapter::in_memory().unwrap();
    adapter.initialize_schema().unwrap();
    adapter
}

pub fn new_lot(symbol: &str, opened: NaiveDate, shares: u32, buy_price: f64) -> NewLot {
    NewLot {
        symbol: symbol.to_string(),
        opened,
        shares,
        buy_price,
        closed: None,
        exit_price: None,
    }
}

pub fn new_option(
    symbol: &str,
    option_type: OptionType,
    opened: NaiveDate,
    premium: f64,
    contracts: u32,
) -> NewOptionEvent {
    NewOptionEvent {
        symbol: symbol.to_string(),
        option_type,
        opened,
        strike: 50.0,
        expiration: opened + chrono::Duration::days(30),
        premium,
        contracts,
        commission: 0.0,
        closed: None,
        exit_price: None,
    }
}

/// Put sold and assigned: closed the same day the resulting lot opens.
pub fn assigned_put(
    symbol: &str,
    assigned: NaiveDate,
    premium: f64,
    commission: f64,
) -> NewOptionEvent {
    NewOptionEvent {
        closed: Some(assigned),
        exit_price: Some(0.0),
        commission,
        ..new_option(symbol, OptionType::Put, assigned, premium, 1)
    }
}

pub fn make_lot(
    id: i64,
    opened: NaiveDate,
    closed: Option<NaiveDate>,
    shares: u32,
    price: f64,
) -> Lot {
    Lot {
        id,
        symbol: "AAA".to_string(),
        opened,
        closed,
        shares,
        buy_price: price,
        adjusted_cost_basis_per_share: price,
        adjusted_cost_basis_total: price * f64::from(shares),
        exit_price: None,
    }
}

pub fn make_option(
    id: i64,
    option_type: OptionType,
    opened: NaiveDate,
    closed: Option<NaiveDate>,
    premium: f64,
    contracts: u32,
) -> OptionEvent {
    OptionEvent {
        id,
        symbol: "AAA".to_string(),
        option_type,
        opened,
        closed,
        strike: 50.0,
        expiration: opened + chrono::Duration::days(30),
        premium,
        contracts,
        exit_price: None,
        commission: 0.0,
    }
}

/// Ledger whose recalculation fails for chosen symbols; everything else
/// goes to an in-memory SQLite store.
pub struct FlakyLedger {
    pub inner: SqliteAdapter,
    pub failing: HashSet<String>,
}

impl FlakyLedger {
    pub fn new() -> Self {
        Self {
            inner: ledger(),
            failing: HashSet::new(),
        }
    }

    pub fn failing_on(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }
}

impl CostBasisPort for FlakyLedger {
    fn recalculate_for_symbol(&self, symbol: &str) -> Result<Vec<LotAdjustment>, WheelerError> {
        if self.failing.contains(symbol) {
            return Err(WheelerError::recalculation(
                symbol,
                WheelerError::Database {
                    reason: "database is locked".to_string(),
                },
            ));
        }
        self.inner.recalculate_for_symbol(symbol)
    }
}

impl LedgerPort for FlakyLedger {
    fn create_lot(&self, lot: &NewLot) -> Result<Lot, WheelerError> {
        self.inner.create_lot(lot)
    }
    fn get_lot(&self, id: i64) -> Result<Lot, WheelerError> {
        self.inner.get_lot(id)
    }
    fn lots_for_symbol(&self, symbol: &str) -> Result<Vec<Lot>, WheelerError> {
        self.inner.lots_for_symbol(symbol)
    }
    fn open_lots(&self) -> Result<Vec<Lot>, WheelerError> {
        self.inner.open_lots()
    }
    fn update_lot(&self, id: i64, lot: &NewLot) -> Result<Lot, WheelerError> {
        self.inner.update_lot(id, lot)
    }
    fn close_lot(&self, id: i64, closed: NaiveDate, exit_price: f64) -> Result<Lot, WheelerError> {
        self.inner.close_lot(id, closed, exit_price)
    }
    fn delete_lot(&self, id: i64) -> Result<(), WheelerError> {
        self.inner.delete_lot(id)
    }
    fn create_option(&self, option: &NewOptionEvent) -> Result<OptionEvent, WheelerError> {
        self.inner.create_option(option)
    }
    fn get_option(&self, id: i64) -> Result<OptionEvent, WheelerError> {
        self.inner.get_option(id)
    }
    fn options_for_symbol(&self, symbol: &str) -> Result<Vec<OptionEvent>, WheelerError> {
        self.inner.options_for_symbol(symbol)
    }
    fn update_option(&self, id: i64, option: &NewOptionEvent) -> Result<OptionEvent, WheelerError> {
        self.inner.update_option(id, option)
    }
    fn close_option(
        &self,
        id: i64,
        closed: NaiveDate,
        exit_price: f64,
    ) -> Result<OptionEvent, WheelerError> {
        self.inner.close_option(id, closed, exit_price)
    }
    fn delete_option(&self, id: i64) -> Result<(), WheelerError> {
        self.inner.delete_option(id)
    }
    fn symbols(&self) -> Result<Vec<String>, WheelerError> {
        self.inner.symbols()
    }
}
