use rust_decimal::Decimal;

use crate::core::{AppError, Result};
use crate::modules::invoices::models::{ComputedLineItem, LineItem};
use crate::modules::taxes::models::{TaxRegime, TaxSplit};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const TWO: Decimal = Decimal::TWO;

/// TaxSplitter turns a line item into its GST breakdown
///
/// taxable_value = quantity × rate, gst = taxable_value × gst_rate / 100.
/// Intra-state lines split gst into equal CGST/SGST halves, inter-state
/// lines carry it all as IGST. The split is exact; rounding happens when the
/// line is stored.
pub struct TaxSplitter;

impl TaxSplitter {
    pub fn new() -> Self {
        Self
    }

    /// Compute the stored form of a line item under the given regime
    pub fn compute_line_item(&self, item: &LineItem, regime: TaxRegime) -> Result<ComputedLineItem> {
        if let Some(amount_to_pay) = item.amount_to_pay {
            if amount_to_pay < Decimal::ZERO {
                return Err(AppError::invalid_line_item(format!(
                    "Amount to pay cannot be negative, got: {}",
                    amount_to_pay
                )));
            }
        }

        let split = self.split(item.quantity, item.rate, item.gst_rate, regime)?;

        Ok(ComputedLineItem::from_split(item, split))
    }

    /// Compute every line of an invoice, stopping at the first invalid one
    pub fn compute_all(&self, items: &[LineItem], regime: TaxRegime) -> Result<Vec<ComputedLineItem>> {
        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                self.compute_line_item(item, regime).map_err(|e| match e {
                    AppError::InvalidLineItem(msg) => {
                        AppError::InvalidLineItem(format!("line {}: {}", idx + 1, msg))
                    }
                    other => other,
                })
            })
            .collect()
    }

    /// Exact GST split of quantity × rate at gst_rate percent
    pub fn split(
        &self,
        quantity: Decimal,
        rate: Decimal,
        gst_rate: Decimal,
        regime: TaxRegime,
    ) -> Result<TaxSplit> {
        Self::validate_non_negative("Quantity", quantity)?;
        Self::validate_non_negative("Rate", rate)?;
        Self::validate_non_negative("GST rate", gst_rate)?;

        let taxable_value = quantity
            .checked_mul(rate)
            .ok_or_else(|| AppError::invalid_line_item("Quantity × rate overflows"))?;
        let gst_amount = taxable_value
            .checked_mul(gst_rate)
            .map(|v| v / HUNDRED)
            .ok_or_else(|| AppError::invalid_line_item("GST amount overflows"))?;
        let total = taxable_value
            .checked_add(gst_amount)
            .ok_or_else(|| AppError::invalid_line_item("Line total overflows"))?;

        let split = match regime {
            TaxRegime::InterState => TaxSplit {
                taxable_value,
                gst_amount,
                cgst_rate: Decimal::ZERO,
                cgst_amount: Decimal::ZERO,
                sgst_rate: Decimal::ZERO,
                sgst_amount: Decimal::ZERO,
                igst_rate: gst_rate,
                igst_amount: gst_amount,
                total,
            },
            TaxRegime::IntraState => {
                let half_rate = gst_rate / TWO;
                let half_amount = gst_amount / TWO;
                TaxSplit {
                    taxable_value,
                    gst_amount,
                    cgst_rate: half_rate,
                    cgst_amount: half_amount,
                    sgst_rate: half_rate,
                    sgst_amount: half_amount,
                    igst_rate: Decimal::ZERO,
                    igst_amount: Decimal::ZERO,
                    total,
                }
            }
        };

        Ok(split)
    }

    fn validate_non_negative(field: &str, value: Decimal) -> Result<()> {
        if value < Decimal::ZERO {
            return Err(AppError::invalid_line_item(format!(
                "{} cannot be negative, got: {}",
                field, value
            )));
        }

        Ok(())
    }
}

impl Default for TaxSplitter {
    fn default() -> Self {
        Self::new()
    }
}
