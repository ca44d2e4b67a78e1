use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerEntryType {
    CreditBill,
    DebitNote,
}

/// One row of the reconstructed payment history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_type: LedgerEntryType,
    pub paid: Decimal,
    /// Remaining balance after this row, never negative
    pub balance: Decimal,
    pub date: Option<NaiveDate>,
    /// Payment note id
    pub reference: Option<String>,
    pub note_number: Option<String>,
    pub description: String,
    /// Part of `paid` that exceeded the balance at that point
    pub overpayment: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    FullyPaid,
    PartiallyPaid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::FullyPaid => "Fully Paid",
            PaymentStatus::PartiallyPaid => "Partially Paid",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Audit warnings raised while folding notes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LedgerWarning {
    Overpayment { note_id: String, excess: Decimal },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerResult {
    pub history: Vec<LedgerEntry>,
    pub current_balance: Decimal,
    pub is_fully_paid: bool,
    pub payment_status: PaymentStatus,
    pub total_paid: Decimal,
    pub total_overpaid: Decimal,
    pub warnings: Vec<LedgerWarning>,
}

impl LedgerResult {
    /// Amount of recorded payments actually applied against the bill
    pub fn total_applied(&self) -> Decimal {
        self.total_paid - self.total_overpaid
    }

    /// Note ids in history order
    pub fn note_ids(&self) -> Vec<String> {
        self.history
            .iter()
            .filter_map(|entry| entry.reference.clone())
            .collect()
    }

    pub fn entry_for_note(&self, note_id: &str) -> Option<&LedgerEntry> {
        self.history
            .iter()
            .find(|entry| entry.reference.as_deref() == Some(note_id))
    }
}

/// Ledger of one invoice as served to callers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceLedger {
    pub invoice_id: String,
    pub document_number: String,
    pub invoice_total: Decimal,
    pub cancelled: bool,
    #[serde(flatten)]
    pub ledger: LedgerResult,
}
