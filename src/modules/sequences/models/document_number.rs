use serde::{Deserialize, Serialize};

use crate::core::{AppError, Result};

/// Kind of document that draws its own number sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    CashBill,
    CreditBill,
    CreditNote,
    DebitNote,
    PaymentReceipt,
    Quotation,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CashBill => "cash_bill",
            Self::CreditBill => "credit_bill",
            Self::CreditNote => "credit_note",
            Self::DebitNote => "debit_note",
            Self::PaymentReceipt => "payment_receipt",
            Self::Quotation => "quotation",
        }
    }

    /// Whether an invoice of this type can be created from line items
    pub fn is_billable(&self) -> bool {
        matches!(
            self,
            Self::CashBill | Self::CreditBill | Self::CreditNote | Self::Quotation
        )
    }

    /// Whether payment notes may be recorded against this type
    pub fn accepts_payments(&self) -> bool {
        matches!(self, Self::CashBill | Self::CreditBill)
    }
}

impl Default for DocumentType {
    fn default() -> Self {
        DocumentType::CreditBill
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DocumentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cash_bill" => Ok(Self::CashBill),
            "credit_bill" => Ok(Self::CreditBill),
            "credit_note" => Ok(Self::CreditNote),
            "debit_note" => Ok(Self::DebitNote),
            "payment_receipt" => Ok(Self::PaymentReceipt),
            "quotation" => Ok(Self::Quotation),
            _ => Err(AppError::validation(format!("Invalid document type: {}", s))),
        }
    }
}

impl TryFrom<String> for DocumentType {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Counter key: one sequence per (company prefix, document type)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceKey {
    pub company_prefix: String,
    pub document_type: DocumentType,
}

impl SequenceKey {
    pub fn new(company_prefix: impl Into<String>, document_type: DocumentType) -> Result<Self> {
        let company_prefix = company_prefix.into().trim().to_uppercase();
        Self::validate_prefix(&company_prefix)?;

        Ok(Self {
            company_prefix,
            document_type,
        })
    }

    fn validate_prefix(prefix: &str) -> Result<()> {
        if prefix.is_empty() {
            return Err(AppError::validation("Company prefix cannot be empty"));
        }

        if prefix.len() > 16 {
            return Err(AppError::validation(
                "Company prefix cannot exceed 16 characters",
            ));
        }

        if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(AppError::validation(format!(
                "Company prefix must be alphanumeric, got: {}",
                prefix
            )));
        }

        Ok(())
    }
}

impl std::fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.company_prefix, self.document_type)
    }
}

/// An issued document number, `"{prefix}-{n}"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentNumber {
    pub value: String,
    pub sequence: u64,
    /// False when issued from the local fallback while the counter store was unreachable
    pub confirmed: bool,
}

impl DocumentNumber {
    pub fn confirmed(key: &SequenceKey, sequence: u64) -> Self {
        Self {
            value: Self::format(&key.company_prefix, sequence),
            sequence,
            confirmed: true,
        }
    }

    pub fn unconfirmed(key: &SequenceKey, sequence: u64) -> Self {
        Self {
            confirmed: false,
            ..Self::confirmed(key, sequence)
        }
    }

    pub fn format(prefix: &str, sequence: u64) -> String {
        format!("{}-{}", prefix, sequence)
    }

    /// Split `"WNF-41"` into `("WNF", 41)`
    ///
    /// The numeric suffix is taken after the last `-` so prefixes that
    /// themselves contain dashes still parse.
    pub fn parse(value: &str) -> Result<(String, u64)> {
        let value = value.trim();
        let (prefix, suffix) = value.rsplit_once('-').ok_or_else(|| {
            AppError::validation(format!("Document number '{}' has no '-' separator", value))
        })?;

        if prefix.is_empty() {
            return Err(AppError::validation(format!(
                "Document number '{}' has an empty prefix",
                value
            )));
        }

        let sequence = suffix.parse::<u64>().map_err(|_| {
            AppError::validation(format!(
                "Document number '{}' has a non-numeric suffix",
                value
            ))
        })?;

        Ok((prefix.to_string(), sequence))
    }
}

/// A fallback number swapped for a confirmed one on a stored document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfirmedNumber {
    pub document_type: DocumentType,
    pub record_id: String,
    pub previous_number: String,
    pub document_number: String,
}

impl std::fmt::Display for DocumentNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}
