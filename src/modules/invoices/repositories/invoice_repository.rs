// InvoiceRepository persists bills and their line items.
//
// Only line item inputs are authoritative on disk; the tax split is
// re-derived with the TaxSplitter when an invoice is loaded, so stored and
// computed fields cannot drift apart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySql, MySqlPool, Transaction};
use tokio::sync::RwLock;

use crate::core::{AppError, Result};
use crate::modules::invoices::models::{Company, Customer, Invoice, InvoiceTotals, LineItem};
use crate::modules::sequences::models::DocumentType;
use crate::modules::taxes::{TaxRegime, TaxSplitter};

/// Storage for invoices
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Insert a new invoice; document numbers are unique per (company, type)
    async fn create(&self, invoice: &Invoice) -> Result<Invoice>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>>;

    /// Overwrite items, totals, cancellation and numbering of an existing invoice
    async fn update(&self, invoice: &Invoice) -> Result<()>;

    /// Invoices whose numbers were issued while the counter store was down
    async fn find_unconfirmed(&self) -> Result<Vec<Invoice>>;

    /// Newest first
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Invoice>>;
}

/// In-process invoice store
#[derive(Default)]
pub struct InMemoryInvoiceRepository {
    invoices: RwLock<HashMap<String, Invoice>>,
}

impl InMemoryInvoiceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn same_number(a: &Invoice, b: &Invoice) -> bool {
        a.id != b.id
            && a.company.prefix == b.company.prefix
            && a.document_type == b.document_type
            && a.document_number == b.document_number
    }
}

#[async_trait]
impl InvoiceRepository for InMemoryInvoiceRepository {
    async fn create(&self, invoice: &Invoice) -> Result<Invoice> {
        let mut invoices = self.invoices.write().await;

        if invoices.values().any(|existing| Self::same_number(existing, invoice)) {
            return Err(AppError::conflict(format!(
                "Document number '{}' already exists for {} {}",
                invoice.document_number, invoice.company.prefix, invoice.document_type
            )));
        }

        invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(invoice.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>> {
        Ok(self.invoices.read().await.get(id).cloned())
    }

    async fn update(&self, invoice: &Invoice) -> Result<()> {
        let mut invoices = self.invoices.write().await;

        if !invoices.contains_key(&invoice.id) {
            return Err(AppError::not_found(format!("Invoice '{}' not found", invoice.id)));
        }

        if invoices.values().any(|existing| Self::same_number(existing, invoice)) {
            return Err(AppError::conflict(format!(
                "Document number '{}' already exists",
                invoice.document_number
            )));
        }

        invoices.insert(invoice.id.clone(), invoice.clone());
        Ok(())
    }

    async fn find_unconfirmed(&self) -> Result<Vec<Invoice>> {
        let mut unconfirmed: Vec<Invoice> = self
            .invoices
            .read()
            .await
            .values()
            .filter(|inv| inv.number_unconfirmed)
            .cloned()
            .collect();
        unconfirmed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(unconfirmed)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Invoice>> {
        let skip = usize::try_from(offset.max(0))
            .map_err(|_| AppError::validation(format!("Offset {} is out of range", offset)))?;
        let take = usize::try_from(limit.clamp(1, 100))
            .map_err(|_| AppError::validation(format!("Limit {} is out of range", limit)))?;

        let mut all: Vec<Invoice> = self.invoices.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(all.into_iter().skip(skip).take(take).collect())
    }
}

/// MySQL invoice store
pub struct MySqlInvoiceRepository {
    pool: MySqlPool,
}

impl MySqlInvoiceRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn insert_items(
        tx: &mut Transaction<'_, MySql>,
        invoice: &Invoice,
    ) -> Result<()> {
        sqlx::query("DELETE FROM invoice_line_items WHERE invoice_id = ?")
            .bind(&invoice.id)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to clear line items: {}", e)))?;

        for (position, item) in invoice.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO invoice_line_items (
                    invoice_id, position, description, hsn_code, quantity, rate, gst_rate,
                    taxable_value, cgst_rate, cgst_amount, sgst_rate, sgst_amount,
                    igst_rate, igst_amount, total, amount_to_pay, balance_amount
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&invoice.id)
            .bind(position as i32)
            .bind(&item.description)
            .bind(&item.hsn_code)
            .bind(item.quantity)
            .bind(item.rate)
            .bind(item.gst_rate)
            .bind(item.taxable_value)
            .bind(item.cgst_rate)
            .bind(item.cgst_amount)
            .bind(item.sgst_rate)
            .bind(item.sgst_amount)
            .bind(item.igst_rate)
            .bind(item.igst_amount)
            .bind(item.total)
            .bind(item.amount_to_pay)
            .bind(item.balance_amount)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to insert line item: {}", e)))?;
        }

        Ok(())
    }

    async fn load_items(&self, row: InvoiceRow) -> Result<Invoice> {
        let item_rows = sqlx::query_as::<_, LineItemRow>(
            r#"
            SELECT description, hsn_code, quantity, rate, gst_rate, amount_to_pay
            FROM invoice_line_items
            WHERE invoice_id = ?
            ORDER BY position ASC
            "#,
        )
        .bind(&row.id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch line items: {}", e)))?;

        row.into_invoice(item_rows)
    }

    fn map_unique_violation(e: sqlx::Error, invoice: &Invoice) -> AppError {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::conflict(format!(
                    "Document number '{}' already exists for {} {}",
                    invoice.document_number, invoice.company.prefix, invoice.document_type
                ));
            }
        }
        AppError::Internal(format!("Failed to save invoice: {}", e))
    }
}

const INVOICE_COLUMNS: &str = r#"
    id, document_type, document_number, number_unconfirmed,
    company_name, company_prefix, company_state_code,
    customer_id, customer_name, customer_contact, customer_email, customer_state_code,
    is_other_state, apply_round_off, invoice_date,
    taxable_value, cgst, sgst, igst, unrounded_grand_total, round_off, grand_total,
    cancelled, created_at, updated_at
"#;

#[async_trait]
impl InvoiceRepository for MySqlInvoiceRepository {
    async fn create(&self, invoice: &Invoice) -> Result<Invoice> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

        sqlx::query(&format!(
            "INSERT INTO invoices ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            INVOICE_COLUMNS
        ))
        .bind(&invoice.id)
        .bind(invoice.document_type.as_str())
        .bind(&invoice.document_number)
        .bind(invoice.number_unconfirmed)
        .bind(&invoice.company.name)
        .bind(&invoice.company.prefix)
        .bind(&invoice.company.state_code)
        .bind(&invoice.customer.id)
        .bind(&invoice.customer.name)
        .bind(&invoice.customer.contact)
        .bind(&invoice.customer.email)
        .bind(&invoice.customer.state_code)
        .bind(invoice.is_other_state)
        .bind(invoice.apply_round_off)
        .bind(invoice.invoice_date)
        .bind(invoice.totals.taxable_value)
        .bind(invoice.totals.cgst)
        .bind(invoice.totals.sgst)
        .bind(invoice.totals.igst)
        .bind(invoice.totals.unrounded_grand_total)
        .bind(invoice.totals.round_off)
        .bind(invoice.totals.grand_total)
        .bind(invoice.cancelled)
        .bind(invoice.created_at)
        .bind(invoice.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::map_unique_violation(e, invoice))?;

        Self::insert_items(&mut tx, invoice).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(invoice.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Invoice>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE id = ?",
            INVOICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch invoice: {}", e)))?;

        match row {
            Some(row) => Ok(Some(self.load_items(row).await?)),
            None => Ok(None),
        }
    }

    async fn update(&self, invoice: &Invoice) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

        let result = sqlx::query(
            r#"
            UPDATE invoices
            SET document_number = ?, number_unconfirmed = ?, apply_round_off = ?,
                taxable_value = ?, cgst = ?, sgst = ?, igst = ?,
                unrounded_grand_total = ?, round_off = ?, grand_total = ?,
                cancelled = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&invoice.document_number)
        .bind(invoice.number_unconfirmed)
        .bind(invoice.apply_round_off)
        .bind(invoice.totals.taxable_value)
        .bind(invoice.totals.cgst)
        .bind(invoice.totals.sgst)
        .bind(invoice.totals.igst)
        .bind(invoice.totals.unrounded_grand_total)
        .bind(invoice.totals.round_off)
        .bind(invoice.totals.grand_total)
        .bind(invoice.cancelled)
        .bind(invoice.updated_at)
        .bind(&invoice.id)
        .execute(&mut *tx)
        .await
        .map_err(|e| Self::map_unique_violation(e, invoice))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Invoice '{}' not found", invoice.id)));
        }

        Self::insert_items(&mut tx, invoice).await?;

        tx.commit()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(())
    }

    async fn find_unconfirmed(&self) -> Result<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices WHERE number_unconfirmed = TRUE ORDER BY created_at ASC",
            INVOICE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch invoices: {}", e)))?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            invoices.push(self.load_items(row).await?);
        }
        Ok(invoices)
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Invoice>> {
        let rows = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {} FROM invoices ORDER BY created_at DESC LIMIT ? OFFSET ?",
            INVOICE_COLUMNS
        ))
        .bind(limit.clamp(1, 100))
        .bind(offset.max(0))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to list invoices: {}", e)))?;

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            invoices.push(self.load_items(row).await?);
        }
        Ok(invoices)
    }
}

// Helper structs for database mapping

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    #[sqlx(try_from = "String")]
    document_type: DocumentType,
    document_number: String,
    number_unconfirmed: bool,
    company_name: String,
    company_prefix: String,
    company_state_code: Option<String>,
    customer_id: String,
    customer_name: Option<String>,
    customer_contact: Option<String>,
    customer_email: Option<String>,
    customer_state_code: Option<String>,
    is_other_state: bool,
    apply_round_off: bool,
    invoice_date: NaiveDate,
    taxable_value: Decimal,
    cgst: Decimal,
    sgst: Decimal,
    igst: Decimal,
    unrounded_grand_total: Decimal,
    round_off: Decimal,
    grand_total: Decimal,
    cancelled: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self, item_rows: Vec<LineItemRow>) -> Result<Invoice> {
        let regime = TaxRegime::from_other_state(self.is_other_state);
        let inputs: Vec<LineItem> = item_rows.into_iter().map(LineItemRow::into_line_item).collect();
        let items = TaxSplitter::new().compute_all(&inputs, regime).map_err(|e| {
            AppError::Internal(format!("Stored line items for invoice '{}' are invalid: {}", self.id, e))
        })?;

        Ok(Invoice {
            id: self.id,
            document_type: self.document_type,
            document_number: self.document_number,
            number_unconfirmed: self.number_unconfirmed,
            company: Company {
                name: self.company_name,
                prefix: self.company_prefix,
                state_code: self.company_state_code,
            },
            customer: Customer {
                id: self.customer_id,
                name: self.customer_name,
                contact: self.customer_contact,
                email: self.customer_email,
                state_code: self.customer_state_code,
            },
            is_other_state: self.is_other_state,
            apply_round_off: self.apply_round_off,
            invoice_date: self.invoice_date,
            items,
            totals: InvoiceTotals {
                taxable_value: self.taxable_value,
                cgst: self.cgst,
                sgst: self.sgst,
                igst: self.igst,
                unrounded_grand_total: self.unrounded_grand_total,
                round_off: self.round_off,
                grand_total: self.grand_total,
            },
            cancelled: self.cancelled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LineItemRow {
    description: String,
    hsn_code: Option<String>,
    quantity: Decimal,
    rate: Decimal,
    gst_rate: Decimal,
    amount_to_pay: Decimal,
}

impl LineItemRow {
    fn into_line_item(self) -> LineItem {
        LineItem {
            description: self.description,
            hsn_code: self.hsn_code,
            quantity: self.quantity,
            rate: self.rate,
            gst_rate: self.gst_rate,
            amount_to_pay: Some(self.amount_to_pay),
        }
    }
}
