//! Wheel-aware cost basis allocation.
//!
//! Option premium collected around a stock lot is credited back onto the lot:
//!
//! - a put closed on the same calendar day a lot was opened is treated as the
//!   assignment that created the lot, and its net premium goes to that lot;
//! - a call's net premium is spread over the lots held on the day the call
//!   was opened, oldest first, in proportion to the shares each lot covers.
//!
//! No stored link between options and lots exists; everything here is
//! inferred from dates. [`allocate`] is a pure function of its inputs, so
//! running it again over the same rows yields identical numbers.

use crate::domain::lot::Lot;
use crate::domain::option_event::{OptionEvent, OptionType};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContributionKind {
    /// Put closed on the lot's open date.
    Assignment,
    /// Call written while the lot was held.
    CoveredCall,
}

/// One option's share of a lot's premium credit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PremiumContribution {
    pub option_id: i64,
    pub kind: ContributionKind,
    /// Shares of the lot the option covered. Assignments cover the whole lot.
    pub shares: u64,
    pub amount: f64,
}

/// Recomputed basis for a single lot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LotAdjustment {
    pub lot_id: i64,
    pub premium_credit: f64,
    pub adjusted_cost_basis_total: f64,
    pub adjusted_cost_basis_per_share: f64,
    /// Set when the credit exceeded the lot's cost and the unadjusted
    /// total was kept instead.
    pub floored: bool,
    pub contributions: Vec<PremiumContribution>,
}

struct LotCredit<'a> {
    lot: &'a Lot,
    total: f64,
    contributions: Vec<PremiumContribution>,
}

impl<'a> LotCredit<'a> {
    fn new(lot: &'a Lot) -> Self {
        Self {
            lot,
            total: 0.0,
            contributions: Vec::new(),
        }
    }

    fn add(&mut self, option_id: i64, kind: ContributionKind, shares: u64, amount: f64) {
        self.total += amount;
        self.contributions.push(PremiumContribution {
            option_id,
            kind,
            shares,
            amount,
        });
    }

    fn finish(self) -> LotAdjustment {
        let lot = self.lot;
        let base_total = lot.base_total();
        let mut adjusted_total = base_total - self.total;
        let floored = adjusted_total < 0.0;
        if floored {
            tracing::warn!(
                symbol = %lot.symbol,
                lot_id = lot.id,
                base = base_total,
                adjustments = self.total,
                "adjusted cost basis below zero, keeping unadjusted total"
            );
            adjusted_total = base_total;
        }
        LotAdjustment {
            lot_id: lot.id,
            premium_credit: self.total,
            adjusted_cost_basis_total: adjusted_total,
            adjusted_cost_basis_per_share: adjusted_total / f64::from(lot.shares),
            floored,
            contributions: self.contributions,
        }
    }
}

/// Compute adjusted cost basis for every lot of one symbol.
///
/// Results come back in `(opened, id)` order regardless of input order. Lots
/// are assumed to have a positive share count.
pub fn allocate(lots: &[Lot], options: &[OptionEvent]) -> Vec<LotAdjustment> {
    let mut lots: Vec<&Lot> = lots.iter().collect();
    lots.sort_by_key(|lot| (lot.opened, lot.id));

    let mut options: Vec<&OptionEvent> = options.iter().collect();
    options.sort_by_key(|opt| (opt.opened, opt.id));
    let (puts, calls): (Vec<&OptionEvent>, Vec<&OptionEvent>) = options
        .into_iter()
        .partition(|opt| opt.option_type == OptionType::Put);

    let mut credits: Vec<LotCredit> = lots.iter().copied().map(LotCredit::new).collect();

    apply_assignments(&mut credits, &puts);
    for call in &calls {
        apply_covered_call(&mut credits, call);
    }

    credits.into_iter().map(LotCredit::finish).collect()
}

// Every lot opened on a put's close date receives the put's full premium.
// Several lots opened the same day therefore each get the whole amount.
fn apply_assignments(credits: &mut [LotCredit], puts: &[&OptionEvent]) {
    for credit in credits.iter_mut() {
        let opened = credit.lot.opened;
        for put in puts.iter().filter(|put| put.closed == Some(opened)) {
            let shares = u64::from(credit.lot.shares);
            credit.add(put.id, ContributionKind::Assignment, shares, put.net_premium());
        }
    }
}

fn apply_covered_call(credits: &mut [LotCredit], call: &OptionEvent) {
    let coverage = call.coverage_shares();
    let net_premium = call.net_premium();
    if net_premium == 0.0 || coverage == 0 {
        return;
    }

    let mut remaining = coverage;
    for credit in credits.iter_mut() {
        if remaining == 0 {
            break;
        }
        if !credit.lot.is_held_on(call.opened) {
            continue;
        }
        let covered = remaining.min(u64::from(credit.lot.shares));
        let amount = net_premium * (covered as f64 / coverage as f64);
        credit.add(call.id, ContributionKind::CoveredCall, covered, amount);
        remaining -= covered;
    }
}
