use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{round_money, AppError, Result, MAX_AMOUNT};

/// A debit note recording one payment installment against a bill
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentNote {
    pub id: String,
    pub invoice_id: String,
    /// Debit note number, when one was issued
    pub note_number: Option<String>,
    pub note_number_unconfirmed: bool,
    pub date: NaiveDate,
    pub amount_paid: Decimal,
    /// Insertion order assigned by the repository; breaks ties between equal dates
    pub seq: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentNote {
    pub fn new(invoice_id: impl Into<String>, date: NaiveDate, amount_paid: Decimal) -> Result<Self> {
        let amount_paid = validate_amount(amount_paid)?;
        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            invoice_id: invoice_id.into(),
            note_number: None,
            note_number_unconfirmed: false,
            date,
            amount_paid,
            seq: 0,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply an in-place correction
    pub fn apply_edit(&mut self, edit: &EditPaymentNoteRequest) -> Result<()> {
        if let Some(amount) = edit.amount_paid {
            self.amount_paid = validate_amount(amount)?;
        }
        if let Some(date) = edit.date {
            self.date = date;
        }
        self.updated_at = Utc::now();
        Ok(())
    }
}

fn validate_amount(amount: Decimal) -> Result<Decimal> {
    let amount = round_money(amount);
    if amount <= Decimal::ZERO {
        return Err(AppError::validation("Payment amount must be greater than 0"));
    }
    if amount > MAX_AMOUNT {
        return Err(AppError::validation(format!(
            "Payment amount must not exceed {}",
            MAX_AMOUNT
        )));
    }
    Ok(amount)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordPaymentNoteRequest {
    pub date: NaiveDate,
    pub amount_paid: Decimal,
    /// Allocate a debit note number for this installment
    #[serde(default)]
    pub issue_note_number: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditPaymentNoteRequest {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub amount_paid: Option<Decimal>,
}
