//! Store ports for lots and options.

use crate::domain::cost_basis::LotAdjustment;
use crate::domain::error::WheelerError;
use crate::domain::lot::{Lot, NewLot};
use crate::domain::option_event::{NewOptionEvent, OptionEvent};
use chrono::NaiveDate;

/// Recomputes stored cost basis for a symbol from its current lots and options.
pub trait CostBasisPort {
    /// Overwrite the adjusted basis of every lot of `symbol` atomically.
    /// On failure no lot is changed.
    fn recalculate_for_symbol(&self, symbol: &str) -> Result<Vec<LotAdjustment>, WheelerError>;
}

/// CRUD over lots and options. Every mutation recalculates the affected
/// symbol(s) once its own write has committed.
pub trait LedgerPort: CostBasisPort {
    fn create_lot(&self, lot: &NewLot) -> Result<Lot, WheelerError>;
    fn get_lot(&self, id: i64) -> Result<Lot, WheelerError>;
    fn lots_for_symbol(&self, symbol: &str) -> Result<Vec<Lot>, WheelerError>;
    fn open_lots(&self) -> Result<Vec<Lot>, WheelerError>;
    fn update_lot(&self, id: i64, lot: &NewLot) -> Result<Lot, WheelerError>;
    fn close_lot(&self, id: i64, closed: NaiveDate, exit_price: f64) -> Result<Lot, WheelerError>;
    fn delete_lot(&self, id: i64) -> Result<(), WheelerError>;

    fn create_option(&self, option: &NewOptionEvent) -> Result<OptionEvent, WheelerError>;
    fn get_option(&self, id: i64) -> Result<OptionEvent, WheelerError>;
    fn options_for_symbol(&self, symbol: &str) -> Result<Vec<OptionEvent>, WheelerError>;
    fn update_option(&self, id: i64, option: &NewOptionEvent)
    -> Result<OptionEvent, WheelerError>;
    fn close_option(
        &self,
        id: i64,
        closed: NaiveDate,
        exit_price: f64,
    ) -> Result<OptionEvent, WheelerError>;
    fn delete_option(&self, id: i64) -> Result<(), WheelerError>;

    /// Every symbol with at least one lot or option, sorted.
    fn symbols(&self) -> Result<Vec<String>, WheelerError>;
}
