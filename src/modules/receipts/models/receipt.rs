use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::modules::invoices::models::{Customer, Invoice};
use crate::modules::ledger::models::{LedgerEntry, PaymentStatus};
use crate::modules::sequences::models::DocumentNumber;

/// Customer fields needed to hand a receipt over
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl DeliveryInfo {
    /// Required fields that are absent or blank
    pub fn missing_fields(&self) -> Vec<String> {
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());

        let mut missing = Vec::new();
        if blank(&self.name) {
            missing.push("name".to_string());
        }
        if blank(&self.contact) {
            missing.push("contact".to_string());
        }
        missing
    }
}

impl From<&Customer> for DeliveryInfo {
    fn from(customer: &Customer) -> Self {
        Self {
            name: customer.name.clone(),
            contact: customer.contact.clone(),
            email: customer.email.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateReceiptRequest {
    /// Scope the receipt to one installment
    #[serde(default)]
    pub payment_note_id: Option<String>,
    pub requested_amount: Decimal,
    /// Falls back to the invoice customer when omitted
    #[serde(default)]
    pub delivery: Option<DeliveryInfo>,
}

/// Accepted view of the ledger at issuance time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptSnapshot {
    pub payment_note_id: Option<String>,
    pub total_product_amount: Decimal,
    pub total_paid_amount: Decimal,
    pub remaining_balance: Decimal,
    pub payment_status: PaymentStatus,
    pub history: Vec<LedgerEntry>,
    pub referenced_note_ids: Vec<String>,
}

/// Point-in-time receipt; never recomputed from live data
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentReceipt {
    pub id: String,
    pub receipt_number: String,
    pub receipt_number_unconfirmed: bool,
    pub invoice_id: String,
    pub invoice_number: String,
    pub payment_note_id: Option<String>,
    pub total_product_amount: Decimal,
    pub total_paid_amount: Decimal,
    pub remaining_balance: Decimal,
    pub payment_status: PaymentStatus,
    pub history: Vec<LedgerEntry>,
    pub referenced_note_ids: Vec<String>,
    /// Invoice was cancelled; rendered with a watermark downstream
    pub cancelled: bool,
    pub delivery: DeliveryInfo,
    pub issued_at: DateTime<Utc>,
}

impl PaymentReceipt {
    pub fn issue(
        number: DocumentNumber,
        invoice: &Invoice,
        snapshot: ReceiptSnapshot,
        delivery: DeliveryInfo,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            receipt_number: number.value,
            receipt_number_unconfirmed: !number.confirmed,
            invoice_id: invoice.id.clone(),
            invoice_number: invoice.document_number.clone(),
            payment_note_id: snapshot.payment_note_id,
            total_product_amount: snapshot.total_product_amount,
            total_paid_amount: snapshot.total_paid_amount,
            remaining_balance: snapshot.remaining_balance,
            payment_status: snapshot.payment_status,
            history: snapshot.history,
            referenced_note_ids: snapshot.referenced_note_ids,
            cancelled: invoice.cancelled,
            delivery,
            issued_at: Utc::now(),
        }
    }
}
