// Receipts are stored as issued, including their history snapshot, and are
// never rewritten afterwards. Note references are kept in their own table so
// "is this note referenced" is one indexed lookup.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlPool};
use tokio::sync::RwLock;

use crate::core::{AppError, Result};
use crate::modules::ledger::models::{LedgerEntry, PaymentStatus};
use crate::modules::receipts::models::{DeliveryInfo, PaymentReceipt};

#[async_trait]
pub trait ReceiptRepository: Send + Sync {
    async fn create(&self, receipt: &PaymentReceipt) -> Result<PaymentReceipt>;

    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentReceipt>>;

    /// Oldest first
    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<PaymentReceipt>>;

    async fn exists_for_invoice(&self, invoice_id: &str) -> Result<bool>;

    /// Whether any receipt snapshot includes the payment note
    async fn references_note(&self, note_id: &str) -> Result<bool>;

    /// Receipts still carrying a fallback number, oldest first
    async fn find_unconfirmed(&self) -> Result<Vec<PaymentReceipt>>;

    /// Swap a fallback receipt number for a confirmed one; the snapshot is untouched
    async fn confirm_number(&self, id: &str, receipt_number: &str) -> Result<()>;
}

/// In-process receipt store
#[derive(Default)]
pub struct InMemoryReceiptRepository {
    receipts: RwLock<Vec<PaymentReceipt>>,
}

impl InMemoryReceiptRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReceiptRepository for InMemoryReceiptRepository {
    async fn create(&self, receipt: &PaymentReceipt) -> Result<PaymentReceipt> {
        let mut receipts = self.receipts.write().await;

        if receipts
            .iter()
            .any(|r| r.id == receipt.id || r.receipt_number == receipt.receipt_number)
        {
            return Err(AppError::conflict(format!(
                "Receipt '{}' already exists",
                receipt.receipt_number
            )));
        }

        receipts.push(receipt.clone());
        Ok(receipt.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentReceipt>> {
        Ok(self.receipts.read().await.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<PaymentReceipt>> {
        Ok(self
            .receipts
            .read()
            .await
            .iter()
            .filter(|r| r.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn exists_for_invoice(&self, invoice_id: &str) -> Result<bool> {
        Ok(self.receipts.read().await.iter().any(|r| r.invoice_id == invoice_id))
    }

    async fn references_note(&self, note_id: &str) -> Result<bool> {
        Ok(self
            .receipts
            .read()
            .await
            .iter()
            .any(|r| r.referenced_note_ids.iter().any(|id| id == note_id)))
    }

    async fn find_unconfirmed(&self) -> Result<Vec<PaymentReceipt>> {
        let mut unconfirmed: Vec<PaymentReceipt> = self
            .receipts
            .read()
            .await
            .iter()
            .filter(|r| r.receipt_number_unconfirmed)
            .cloned()
            .collect();
        unconfirmed.sort_by(|a, b| a.issued_at.cmp(&b.issued_at));
        Ok(unconfirmed)
    }

    async fn confirm_number(&self, id: &str, receipt_number: &str) -> Result<()> {
        let mut receipts = self.receipts.write().await;

        if receipts
            .iter()
            .any(|r| r.id != id && r.receipt_number == receipt_number)
        {
            return Err(AppError::conflict(format!(
                "Receipt '{}' already exists",
                receipt_number
            )));
        }

        let receipt = receipts
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::not_found(format!("Receipt '{}' not found", id)))?;
        receipt.receipt_number = receipt_number.to_string();
        receipt.receipt_number_unconfirmed = false;

        Ok(())
    }
}

/// MySQL receipt store
pub struct MySqlReceiptRepository {
    pool: MySqlPool,
}

impl MySqlReceiptRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const RECEIPT_COLUMNS: &str = r#"
    id, receipt_number, receipt_number_unconfirmed, invoice_id, invoice_number, payment_note_id,
    total_product_amount, total_paid_amount, remaining_balance, fully_paid,
    history, referenced_note_ids, cancelled,
    delivery_name, delivery_contact, delivery_email, issued_at
"#;

#[async_trait]
impl ReceiptRepository for MySqlReceiptRepository {
    async fn create(&self, receipt: &PaymentReceipt) -> Result<PaymentReceipt> {
        let history = serde_json::to_string(&receipt.history)?;
        let note_ids = serde_json::to_string(&receipt.referenced_note_ids)?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to start transaction: {}", e)))?;

        sqlx::query(&format!(
            "INSERT INTO payment_receipts ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            RECEIPT_COLUMNS
        ))
        .bind(&receipt.id)
        .bind(&receipt.receipt_number)
        .bind(receipt.receipt_number_unconfirmed)
        .bind(&receipt.invoice_id)
        .bind(&receipt.invoice_number)
        .bind(&receipt.payment_note_id)
        .bind(receipt.total_product_amount)
        .bind(receipt.total_paid_amount)
        .bind(receipt.remaining_balance)
        .bind(receipt.payment_status == PaymentStatus::FullyPaid)
        .bind(history)
        .bind(note_ids)
        .bind(receipt.cancelled)
        .bind(&receipt.delivery.name)
        .bind(&receipt.delivery.contact)
        .bind(&receipt.delivery.email)
        .bind(receipt.issued_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create receipt: {}", e)))?;

        for note_id in &receipt.referenced_note_ids {
            sqlx::query("INSERT INTO receipt_note_refs (receipt_id, payment_note_id) VALUES (?, ?)")
                .bind(&receipt.id)
                .bind(note_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to record note reference: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to commit transaction: {}", e)))?;

        Ok(receipt.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentReceipt>> {
        let row = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {} FROM payment_receipts WHERE id = ?",
            RECEIPT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch receipt: {}", e)))?;

        row.map(ReceiptRow::into_receipt).transpose()
    }

    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<PaymentReceipt>> {
        let rows = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {} FROM payment_receipts WHERE invoice_id = ? ORDER BY issued_at ASC",
            RECEIPT_COLUMNS
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch receipts: {}", e)))?;

        rows.into_iter().map(ReceiptRow::into_receipt).collect()
    }

    async fn exists_for_invoice(&self, invoice_id: &str) -> Result<bool> {
        let found: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM payment_receipts WHERE invoice_id = ? LIMIT 1")
                .bind(invoice_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to query receipts: {}", e)))?;

        Ok(found.is_some())
    }

    async fn references_note(&self, note_id: &str) -> Result<bool> {
        let found: Option<(i64,)> =
            sqlx::query_as("SELECT 1 FROM receipt_note_refs WHERE payment_note_id = ? LIMIT 1")
                .bind(note_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to query note references: {}", e)))?;

        Ok(found.is_some())
    }

    async fn find_unconfirmed(&self) -> Result<Vec<PaymentReceipt>> {
        let rows = sqlx::query_as::<_, ReceiptRow>(&format!(
            "SELECT {} FROM payment_receipts WHERE receipt_number_unconfirmed = TRUE ORDER BY issued_at ASC",
            RECEIPT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch receipts: {}", e)))?;

        rows.into_iter().map(ReceiptRow::into_receipt).collect()
    }

    async fn confirm_number(&self, id: &str, receipt_number: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE payment_receipts
            SET receipt_number = ?, receipt_number_unconfirmed = FALSE
            WHERE id = ?
            "#,
        )
        .bind(receipt_number)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::conflict(format!("Receipt '{}' already exists", receipt_number))
            }
            other => AppError::Internal(format!("Failed to confirm receipt number: {}", other)),
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Receipt '{}' not found", id)));
        }

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct ReceiptRow {
    id: String,
    receipt_number: String,
    receipt_number_unconfirmed: bool,
    invoice_id: String,
    invoice_number: String,
    payment_note_id: Option<String>,
    total_product_amount: Decimal,
    total_paid_amount: Decimal,
    remaining_balance: Decimal,
    fully_paid: bool,
    history: String,
    referenced_note_ids: String,
    cancelled: bool,
    delivery_name: Option<String>,
    delivery_contact: Option<String>,
    delivery_email: Option<String>,
    issued_at: DateTime<Utc>,
}

impl ReceiptRow {
    fn into_receipt(self) -> Result<PaymentReceipt> {
        let history: Vec<LedgerEntry> = serde_json::from_str(&self.history)?;
        let referenced_note_ids: Vec<String> = serde_json::from_str(&self.referenced_note_ids)?;

        Ok(PaymentReceipt {
            id: self.id,
            receipt_number: self.receipt_number,
            receipt_number_unconfirmed: self.receipt_number_unconfirmed,
            invoice_id: self.invoice_id,
            invoice_number: self.invoice_number,
            payment_note_id: self.payment_note_id,
            total_product_amount: self.total_product_amount,
            total_paid_amount: self.total_paid_amount,
            remaining_balance: self.remaining_balance,
            payment_status: if self.fully_paid {
                PaymentStatus::FullyPaid
            } else {
                PaymentStatus::PartiallyPaid
            },
            history,
            referenced_note_ids,
            cancelled: self.cancelled,
            delivery: DeliveryInfo {
                name: self.delivery_name,
                contact: self.delivery_contact,
                email: self.delivery_email,
            },
            issued_at: self.issued_at,
        })
    }
}
