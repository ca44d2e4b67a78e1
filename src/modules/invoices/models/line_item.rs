// A line item is a single product or service on a bill. The input carries
// quantity, rate and GST percentage; the computed form adds the tax split
// (CGST/SGST or IGST), the line total and the outstanding balance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::round_money;
use crate::modules::taxes::TaxSplit;

/// Line item as entered on the billing form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Description of the product or service
    #[serde(default)]
    pub description: String,

    /// HSN/SAC classification code
    #[serde(default)]
    pub hsn_code: Option<String>,

    /// Quantity (fractional quantities allowed, must be >= 0)
    pub quantity: Decimal,

    /// Price per unit before tax (must be >= 0)
    pub rate: Decimal,

    /// GST percentage, e.g. 18 for 18% (must be >= 0)
    pub gst_rate: Decimal,

    /// Amount paid against this line at billing time (defaults to 0)
    #[serde(default)]
    pub amount_to_pay: Option<Decimal>,
}

impl LineItem {
    pub fn new(
        description: impl Into<String>,
        quantity: Decimal,
        rate: Decimal,
        gst_rate: Decimal,
    ) -> Self {
        Self {
            description: description.into(),
            hsn_code: None,
            quantity,
            rate,
            gst_rate,
            amount_to_pay: None,
        }
    }

    pub fn with_amount_to_pay(mut self, amount: Decimal) -> Self {
        self.amount_to_pay = Some(amount);
        self
    }
}

/// Line item after the tax split
///
/// Monetary fields are rounded to 2 dp for storage and display. The exact
/// split is retained in `split` so invoice totals accumulate unrounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComputedLineItem {
    pub description: String,
    pub hsn_code: Option<String>,
    pub quantity: Decimal,
    pub rate: Decimal,
    pub gst_rate: Decimal,
    pub taxable_value: Decimal,
    pub cgst_rate: Decimal,
    pub cgst_amount: Decimal,
    pub sgst_rate: Decimal,
    pub sgst_amount: Decimal,
    pub igst_rate: Decimal,
    pub igst_amount: Decimal,
    pub total: Decimal,
    pub amount_to_pay: Decimal,
    pub balance_amount: Decimal,
    #[serde(skip)]
    pub split: TaxSplit,
}

impl ComputedLineItem {
    /// Build the stored form of a line from its input and exact split
    pub(crate) fn from_split(item: &LineItem, split: TaxSplit) -> Self {
        let total = round_money(split.total);
        let amount_to_pay = round_money(item.amount_to_pay.unwrap_or(Decimal::ZERO));
        let balance_amount = (total - amount_to_pay).max(Decimal::ZERO);

        Self {
            description: item.description.clone(),
            hsn_code: item.hsn_code.clone(),
            quantity: item.quantity,
            rate: item.rate,
            gst_rate: item.gst_rate,
            taxable_value: round_money(split.taxable_value),
            cgst_rate: split.cgst_rate,
            cgst_amount: round_money(split.cgst_amount),
            sgst_rate: split.sgst_rate,
            sgst_amount: round_money(split.sgst_amount),
            igst_rate: split.igst_rate,
            igst_amount: round_money(split.igst_amount),
            total,
            amount_to_pay,
            balance_amount,
            split,
        }
    }
}
