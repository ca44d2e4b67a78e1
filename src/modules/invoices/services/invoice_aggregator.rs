use rust_decimal::Decimal;

use crate::core::{round_money, round_to_unit, within_tolerance, AppError, Result};
use crate::modules::invoices::models::{ComputedLineItem, InvoiceTotals};

/// Folds computed line items into document totals
///
/// Components are summed from the exact per-line split and rounded once,
/// so rounding error does not compound across many lines.
pub struct InvoiceAggregator;

impl InvoiceAggregator {
    /// Aggregate items into totals, optionally rounding the grand total to
    /// the nearest whole unit. An empty item list yields all-zero totals.
    ///
    /// Fails with `InvalidLineItem` when the lines sum past the representable range.
    pub fn aggregate(items: &[ComputedLineItem], apply_round_off: bool) -> Result<InvoiceTotals> {
        let mut taxable = Decimal::ZERO;
        let mut cgst = Decimal::ZERO;
        let mut sgst = Decimal::ZERO;
        let mut igst = Decimal::ZERO;
        let mut total = Decimal::ZERO;

        for item in items {
            taxable = add(taxable, item.split.taxable_value)?;
            cgst = add(cgst, item.split.cgst_amount)?;
            sgst = add(sgst, item.split.sgst_amount)?;
            igst = add(igst, item.split.igst_amount)?;
            total = add(total, item.split.total)?;
        }

        let unrounded_grand_total = round_money(total);
        let (grand_total, round_off) = if apply_round_off {
            let rounded = round_to_unit(total);
            let delta = rounded
                .checked_sub(unrounded_grand_total)
                .ok_or_else(overflow)?;
            (rounded, round_money(delta))
        } else {
            (unrounded_grand_total, round_money(Decimal::ZERO))
        };

        Ok(InvoiceTotals {
            taxable_value: round_money(taxable),
            cgst: round_money(cgst),
            sgst: round_money(sgst),
            igst: round_money(igst),
            unrounded_grand_total,
            round_off,
            grand_total,
        })
    }

    /// grand_total − round_off must reconstruct the component sum within 0.01
    pub fn is_consistent(totals: &InvoiceTotals) -> bool {
        let components = [totals.cgst, totals.sgst, totals.igst]
            .into_iter()
            .try_fold(totals.taxable_value, Decimal::checked_add);

        match (components, totals.grand_total.checked_sub(totals.round_off)) {
            (Some(components), Some(reconstructed)) => within_tolerance(reconstructed, components),
            _ => false,
        }
    }
}

fn add(acc: Decimal, value: Decimal) -> Result<Decimal> {
    acc.checked_add(value).ok_or_else(overflow)
}

fn overflow() -> AppError {
    AppError::invalid_line_item("Invoice total overflows")
}
