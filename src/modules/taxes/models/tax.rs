use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// GST regime applied to every line of an invoice
///
/// Intra-state sales split the rate into equal CGST and SGST halves;
/// inter-state sales charge the full rate as IGST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    IntraState,
    InterState,
}

impl TaxRegime {
    pub fn from_other_state(is_other_state: bool) -> Self {
        if is_other_state {
            TaxRegime::InterState
        } else {
            TaxRegime::IntraState
        }
    }

    /// Derive the regime from company and customer state codes.
    ///
    /// Missing codes on either side fall back to intra-state.
    pub fn from_state_codes(company_state: Option<&str>, customer_state: Option<&str>) -> Self {
        match (company_state, customer_state) {
            (Some(company), Some(customer))
                if !company.trim().is_empty() && !customer.trim().is_empty() =>
            {
                Self::from_other_state(!company.trim().eq_ignore_ascii_case(customer.trim()))
            }
            _ => TaxRegime::IntraState,
        }
    }

    pub fn is_other_state(&self) -> bool {
        matches!(self, TaxRegime::InterState)
    }
}

impl std::fmt::Display for TaxRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaxRegime::IntraState => write!(f, "intra_state"),
            TaxRegime::InterState => write!(f, "inter_state"),
        }
    }
}

/// Exact (unrounded) tax split of one line item
///
/// Kept at full precision so invoice totals are accumulated before rounding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct TaxSplit {
    pub taxable_value: Decimal,
    pub gst_amount: Decimal,
    pub cgst_rate: Decimal,
    pub cgst_amount: Decimal,
    pub sgst_rate: Decimal,
    pub sgst_amount: Decimal,
    pub igst_rate: Decimal,
    pub igst_amount: Decimal,
    pub total: Decimal,
}

impl TaxSplit {
    /// Sum of all tax components
    pub fn tax_total(&self) -> Decimal {
        self.cgst_amount + self.sgst_amount + self.igst_amount
    }
}
