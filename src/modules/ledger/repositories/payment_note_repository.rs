use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlPool};
use tokio::sync::RwLock;

use crate::core::{AppError, Result};
use crate::modules::ledger::models::PaymentNote;

/// Storage for payment notes. Notes are the only persisted payment facts;
/// balances are always derived.
#[async_trait]
pub trait PaymentNoteRepository: Send + Sync {
    /// Insert a note, assigning its insertion sequence
    async fn create(&self, note: &PaymentNote) -> Result<PaymentNote>;

    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentNote>>;

    /// Every note for an invoice, read as one snapshot, in insertion order
    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<PaymentNote>>;

    async fn update(&self, note: &PaymentNote) -> Result<()>;

    /// Notes whose debit note number came from the fallback, oldest first
    async fn find_unconfirmed_numbers(&self) -> Result<Vec<PaymentNote>>;

    async fn confirm_number(&self, id: &str, note_number: &str) -> Result<()>;
}

#[derive(Default)]
struct NoteTable {
    rows: Vec<PaymentNote>,
    next_seq: i64,
}

/// In-process payment note store
#[derive(Default)]
pub struct InMemoryPaymentNoteRepository {
    table: RwLock<NoteTable>,
}

impl InMemoryPaymentNoteRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentNoteRepository for InMemoryPaymentNoteRepository {
    async fn create(&self, note: &PaymentNote) -> Result<PaymentNote> {
        let mut table = self.table.write().await;

        if table.rows.iter().any(|existing| existing.id == note.id) {
            return Err(AppError::conflict(format!("Payment note '{}' already exists", note.id)));
        }

        table.next_seq += 1;
        let mut stored = note.clone();
        stored.seq = table.next_seq;
        table.rows.push(stored.clone());

        Ok(stored)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentNote>> {
        let table = self.table.read().await;
        Ok(table.rows.iter().find(|note| note.id == id).cloned())
    }

    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<PaymentNote>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .iter()
            .filter(|note| note.invoice_id == invoice_id)
            .cloned()
            .collect())
    }

    async fn update(&self, note: &PaymentNote) -> Result<()> {
        let mut table = self.table.write().await;
        let existing = table
            .rows
            .iter_mut()
            .find(|existing| existing.id == note.id)
            .ok_or_else(|| AppError::not_found(format!("Payment note '{}' not found", note.id)))?;

        // Insertion order is fixed at creation
        let seq = existing.seq;
        *existing = note.clone();
        existing.seq = seq;

        Ok(())
    }

    async fn find_unconfirmed_numbers(&self) -> Result<Vec<PaymentNote>> {
        let table = self.table.read().await;
        Ok(table
            .rows
            .iter()
            .filter(|note| note.note_number_unconfirmed)
            .cloned()
            .collect())
    }

    async fn confirm_number(&self, id: &str, note_number: &str) -> Result<()> {
        let mut table = self.table.write().await;
        let note = table
            .rows
            .iter_mut()
            .find(|note| note.id == id)
            .ok_or_else(|| AppError::not_found(format!("Payment note '{}' not found", id)))?;

        note.note_number = Some(note_number.to_string());
        note.note_number_unconfirmed = false;

        Ok(())
    }
}

/// MySQL payment note store
pub struct MySqlPaymentNoteRepository {
    pool: MySqlPool,
}

impl MySqlPaymentNoteRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

const NOTE_COLUMNS: &str = "id, invoice_id, note_number, note_number_unconfirmed, note_date, \
                            amount_paid, seq, created_at, updated_at";

#[async_trait]
impl PaymentNoteRepository for MySqlPaymentNoteRepository {
    async fn create(&self, note: &PaymentNote) -> Result<PaymentNote> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_notes (
                id, invoice_id, note_number, note_number_unconfirmed, note_date,
                amount_paid, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&note.id)
        .bind(&note.invoice_id)
        .bind(&note.note_number)
        .bind(note.note_number_unconfirmed)
        .bind(note.date)
        .bind(note.amount_paid)
        .bind(note.created_at)
        .bind(note.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to create payment note: {}", e)))?;

        let mut stored = note.clone();
        stored.seq = result.last_insert_id() as i64;
        Ok(stored)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentNote>> {
        let row = sqlx::query_as::<_, PaymentNoteRow>(&format!(
            "SELECT {} FROM payment_notes WHERE id = ?",
            NOTE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch payment note: {}", e)))?;

        Ok(row.map(PaymentNote::from))
    }

    async fn find_by_invoice(&self, invoice_id: &str) -> Result<Vec<PaymentNote>> {
        let rows = sqlx::query_as::<_, PaymentNoteRow>(&format!(
            "SELECT {} FROM payment_notes WHERE invoice_id = ? ORDER BY seq ASC",
            NOTE_COLUMNS
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch payment notes: {}", e)))?;

        Ok(rows.into_iter().map(PaymentNote::from).collect())
    }

    async fn update(&self, note: &PaymentNote) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE payment_notes
            SET note_date = ?, amount_paid = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(note.date)
        .bind(note.amount_paid)
        .bind(note.updated_at)
        .bind(&note.id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to update payment note: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Payment note '{}' not found", note.id)));
        }

        Ok(())
    }

    async fn find_unconfirmed_numbers(&self) -> Result<Vec<PaymentNote>> {
        let rows = sqlx::query_as::<_, PaymentNoteRow>(&format!(
            "SELECT {} FROM payment_notes WHERE note_number_unconfirmed = TRUE ORDER BY seq ASC",
            NOTE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to fetch payment notes: {}", e)))?;

        Ok(rows.into_iter().map(PaymentNote::from).collect())
    }

    async fn confirm_number(&self, id: &str, note_number: &str) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE payment_notes
            SET note_number = ?, note_number_unconfirmed = FALSE
            WHERE id = ?
            "#,
        )
        .bind(note_number)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to confirm note number: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Payment note '{}' not found", id)));
        }

        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct PaymentNoteRow {
    id: String,
    invoice_id: String,
    note_number: Option<String>,
    note_number_unconfirmed: bool,
    note_date: NaiveDate,
    amount_paid: Decimal,
    seq: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<PaymentNoteRow> for PaymentNote {
    fn from(row: PaymentNoteRow) -> Self {
        PaymentNote {
            id: row.id,
            invoice_id: row.invoice_id,
            note_number: row.note_number,
            note_number_unconfirmed: row.note_number_unconfirmed,
            date: row.note_date,
            amount_paid: row.amount_paid,
            seq: row.seq,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
