//! Quote pricing engine.
//!
//! Every stored amount on a quote is derived from its line items in one
//! deterministic pass. The engine never reads previously stored amounts, so
//! recomputing an already computed quote changes nothing.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::{ItemKind, QuoteSection};

/// Fully derived money amounts for a quote.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub total_materials: Decimal,
    pub total_labor: Decimal,
    pub subtotal: Decimal,
    pub discount_amount: Decimal,
    pub iva_amount: Decimal,
    pub total: Decimal,
}

/// Recomputes item totals and section subtotals in place, then derives the
/// quote-level amounts.
///
/// Manual items count toward the labor bucket: only `ItemKind::Material`
/// lines feed `total_materials`, everything else is labor.
pub fn compute_totals(
    sections: &mut [QuoteSection],
    discount_percentage: Decimal,
    iva_rate: Decimal,
) -> Totals {
    let mut total_materials = Decimal::ZERO;
    let mut total_labor = Decimal::ZERO;

    for section in sections.iter_mut() {
        let mut subtotal = Decimal::ZERO;
        for item in section.items.iter_mut() {
            item.total = item.quantity * item.unit_price;
            subtotal += item.total;
            match item.kind {
                ItemKind::Material => total_materials += item.total,
                ItemKind::Labor | ItemKind::Manual => total_labor += item.total,
            }
        }
        section.subtotal = subtotal;
    }

    let subtotal = total_materials + total_labor;
    let discount_amount = subtotal * discount_percentage / Decimal::ONE_HUNDRED;
    let iva_amount = (subtotal - discount_amount) * iva_rate / Decimal::ONE_HUNDRED;
    let total = subtotal - discount_amount + iva_amount;

    Totals { total_materials, total_labor, subtotal, discount_amount, iva_amount, total }
}
