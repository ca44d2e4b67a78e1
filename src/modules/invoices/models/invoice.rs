// An invoice (cash or credit bill) is created once by the billing form and
// carries its computed line items and totals. Totals are recomputed whenever
// the items change; cancellation is a terminal flag, never a deletion.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::line_item::{ComputedLineItem, LineItem};
use crate::core::{AppError, Result};
use crate::modules::sequences::models::{DocumentNumber, DocumentType};
use crate::modules::taxes::models::TaxRegime;

/// Version of the invoice ingestion schema accepted by the service
pub const INVOICE_SCHEMA_VERSION: u16 = 1;

fn current_schema_version() -> u16 {
    INVOICE_SCHEMA_VERSION
}

/// Issuing company
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    /// Document number prefix, e.g. "WNF" for WYENFOS
    pub prefix: String,
    pub state_code: Option<String>,
}

/// Billed customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
}

/// Document totals produced by the InvoiceAggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub taxable_value: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    /// Grand total before round-off
    pub unrounded_grand_total: Decimal,
    /// grand_total − unrounded_grand_total (0 when round-off is off)
    pub round_off: Decimal,
    pub grand_total: Decimal,
}

/// A cash bill, credit bill, credit note or quotation
#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub id: String,
    pub document_type: DocumentType,
    pub document_number: String,
    /// Number came from the fallback path and must be reconciled
    pub number_unconfirmed: bool,
    pub company: Company,
    pub customer: Customer,
    pub is_other_state: bool,
    pub apply_round_off: bool,
    pub invoice_date: NaiveDate,
    pub items: Vec<ComputedLineItem>,
    pub totals: InvoiceTotals,
    pub cancelled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        document_type: DocumentType,
        number: DocumentNumber,
        company: Company,
        customer: Customer,
        regime: TaxRegime,
        apply_round_off: bool,
        invoice_date: NaiveDate,
        items: Vec<ComputedLineItem>,
        totals: InvoiceTotals,
    ) -> Result<Self> {
        if !document_type.is_billable() {
            return Err(AppError::validation(format!(
                "Document type '{}' cannot be billed",
                document_type
            )));
        }

        let now = Utc::now();

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            document_type,
            document_number: number.value,
            number_unconfirmed: !number.confirmed,
            company,
            customer,
            is_other_state: regime.is_other_state(),
            apply_round_off,
            invoice_date,
            items,
            totals,
            cancelled: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn regime(&self) -> TaxRegime {
        TaxRegime::from_other_state(self.is_other_state)
    }

    pub fn grand_total(&self) -> Decimal {
        self.totals.grand_total
    }

    /// Replace line items and their recomputed totals
    pub fn replace_items(&mut self, items: Vec<ComputedLineItem>, totals: InvoiceTotals) -> Result<()> {
        if self.cancelled {
            return Err(AppError::conflict(format!(
                "Invoice {} is cancelled and cannot be edited",
                self.document_number
            )));
        }

        self.items = items;
        self.totals = totals;
        self.updated_at = Utc::now();

        Ok(())
    }

    /// Flag the invoice as cancelled (terminal)
    pub fn cancel(&mut self) -> Result<()> {
        if self.cancelled {
            return Err(AppError::conflict(format!(
                "Invoice {} is already cancelled",
                self.document_number
            )));
        }

        self.cancelled = true;
        self.updated_at = Utc::now();

        Ok(())
    }

    /// Swap an unconfirmed number for a confirmed one
    pub fn confirm_number(&mut self, number: DocumentNumber) -> Result<()> {
        if !number.confirmed {
            return Err(AppError::internal(
                "Cannot replace a document number with another unconfirmed number",
            ));
        }

        self.document_number = number.value;
        self.number_unconfirmed = false;
        self.updated_at = Utc::now();

        Ok(())
    }
}

/// Company as sent by the billing form; prefix is resolved from the registry when absent
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanyInput {
    pub name: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub state_code: Option<String>,
}

/// Invoice creation request: the single ingestion schema for bills
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateInvoiceRequest {
    #[serde(default = "current_schema_version")]
    pub schema_version: u16,
    #[serde(default)]
    pub document_type: DocumentType,
    pub company: CompanyInput,
    pub customer: Customer,
    /// Inter-state sale; derived from state codes when omitted
    #[serde(default)]
    pub is_other_state: Option<bool>,
    /// Defaults to the configured round-off policy when omitted
    #[serde(default)]
    pub apply_round_off: Option<bool>,
    #[serde(default)]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default)]
    pub items: Vec<LineItem>,
}

impl CreateInvoiceRequest {
    pub fn validate_schema(&self) -> Result<()> {
        if self.schema_version != INVOICE_SCHEMA_VERSION {
            return Err(AppError::validation(format!(
                "Unsupported invoice schema version {} (expected {})",
                self.schema_version, INVOICE_SCHEMA_VERSION
            )));
        }

        if self.company.name.trim().is_empty() {
            return Err(AppError::validation("Company name cannot be empty"));
        }

        if self.customer.id.trim().is_empty() {
            return Err(AppError::validation("Customer id cannot be empty"));
        }

        Ok(())
    }

    /// Tax regime: explicit flag wins, otherwise compare state codes
    pub fn regime(&self) -> TaxRegime {
        match self.is_other_state {
            Some(flag) => TaxRegime::from_other_state(flag),
            None => TaxRegime::from_state_codes(
                self.company.state_code.as_deref(),
                self.customer.state_code.as_deref(),
            ),
        }
    }
}

/// Replace the items of an existing invoice
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplaceItemsRequest {
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub apply_round_off: Option<bool>,
}
