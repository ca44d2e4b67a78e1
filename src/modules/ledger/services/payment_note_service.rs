use std::sync::Arc;

use tracing::{info, warn};

use crate::config::BillingConfig;
use crate::core::{AppError, KeyedLocks, Result};
use crate::modules::invoices::models::Invoice;
use crate::modules::invoices::repositories::InvoiceRepository;
use crate::modules::ledger::models::{
    EditPaymentNoteRequest, InvoiceLedger, LedgerResult, PaymentNote, RecordPaymentNoteRequest,
};
use crate::modules::ledger::repositories::PaymentNoteRepository;
use crate::modules::ledger::services::LedgerReconciler;
use crate::modules::receipts::repositories::ReceiptRepository;
use crate::modules::sequences::models::{ConfirmedNumber, DocumentNumber, DocumentType};
use crate::modules::sequences::services::SequenceAllocator;

/// Service for payment notes and on-demand ledgers
pub struct PaymentNoteService {
    note_repo: Arc<dyn PaymentNoteRepository>,
    invoice_repo: Arc<dyn InvoiceRepository>,
    receipt_repo: Arc<dyn ReceiptRepository>,
    allocator: Arc<SequenceAllocator>,
    locks: Arc<KeyedLocks>,
    billing: BillingConfig,
}

impl PaymentNoteService {
    pub fn new(
        note_repo: Arc<dyn PaymentNoteRepository>,
        invoice_repo: Arc<dyn InvoiceRepository>,
        receipt_repo: Arc<dyn ReceiptRepository>,
        allocator: Arc<SequenceAllocator>,
        locks: Arc<KeyedLocks>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            note_repo,
            invoice_repo,
            receipt_repo,
            allocator,
            locks,
            billing,
        }
    }

    /// Record an installment against a cash or credit bill
    pub async fn record_payment_note(
        &self,
        invoice_id: &str,
        request: RecordPaymentNoteRequest,
    ) -> Result<PaymentNote> {
        let _guard = self.locks.lock(invoice_id).await;
        let invoice = self.load_invoice(invoice_id).await?;

        if !invoice.document_type.accepts_payments() {
            return Err(AppError::validation(format!(
                "Payments cannot be recorded against a {}",
                invoice.document_type
            )));
        }

        if invoice.cancelled {
            return Err(AppError::conflict(format!(
                "Invoice {} is cancelled; no further payments can be recorded",
                invoice.document_number
            )));
        }

        let mut note = PaymentNote::new(&invoice.id, request.date, request.amount_paid)?;

        if request.issue_note_number {
            let number = self
                .allocator
                .allocate(
                    &invoice.company.prefix,
                    DocumentType::DebitNote,
                    self.billing.allow_unconfirmed_numbers,
                )
                .await?;
            note.note_number_unconfirmed = !number.confirmed;
            note.note_number = Some(number.value);
        }

        let note = self.note_repo.create(&note).await?;

        info!(
            invoice_id = %invoice.id,
            note_id = %note.id,
            amount_paid = %note.amount_paid,
            "Payment note recorded"
        );

        Ok(note)
    }

    /// Correct a note in place; refused once any receipt references it
    pub async fn edit_payment_note(
        &self,
        note_id: &str,
        request: EditPaymentNoteRequest,
    ) -> Result<PaymentNote> {
        let invoice_id = self.load_note(note_id).await?.invoice_id;
        let _guard = self.locks.lock(&invoice_id).await;

        // re-read under the invoice guard
        let mut note = self.load_note(note_id).await?;

        if self.receipt_repo.references_note(note_id).await? {
            warn!(note_id = %note_id, "Edit refused for receipted payment note");
            return Err(AppError::conflict(format!(
                "Payment note '{}' is referenced by an issued receipt; record a compensating note instead",
                note_id
            )));
        }

        note.apply_edit(&request)?;
        self.note_repo.update(&note).await?;

        info!(note_id = %note.id, amount_paid = %note.amount_paid, "Payment note edited");

        Ok(note)
    }

    /// Re-number every debit note issued with a fallback number
    pub async fn confirm_note_numbers(&self) -> Result<Vec<ConfirmedNumber>> {
        let mut confirmed = Vec::new();

        for note in self.note_repo.find_unconfirmed_numbers().await? {
            let Some(previous_number) = note.note_number.clone() else {
                continue;
            };
            let (prefix, _) = DocumentNumber::parse(&previous_number)?;

            let number = self
                .allocator
                .allocate_next_number(&prefix, DocumentType::DebitNote)
                .await?;
            self.note_repo.confirm_number(&note.id, &number.value).await?;
            self.allocator
                .mark_reconciled(DocumentType::DebitNote, &previous_number);

            info!(
                note_id = %note.id,
                previous_number = %previous_number,
                document_number = %number,
                "Document number confirmed"
            );

            confirmed.push(ConfirmedNumber {
                document_type: DocumentType::DebitNote,
                record_id: note.id,
                previous_number,
                document_number: number.value,
            });
        }

        Ok(confirmed)
    }

    pub async fn list_payment_notes(&self, invoice_id: &str) -> Result<Vec<PaymentNote>> {
        let invoice = self.load_invoice(invoice_id).await?;
        self.note_repo.find_by_invoice(&invoice.id).await
    }

    /// Fold the invoice's current notes into a ledger
    pub async fn ledger_for(&self, invoice: &Invoice) -> Result<LedgerResult> {
        let notes = self.note_repo.find_by_invoice(&invoice.id).await?;
        Ok(LedgerReconciler::reconcile_ledger(invoice.grand_total(), &notes))
    }

    pub async fn invoice_ledger(&self, invoice_id: &str) -> Result<InvoiceLedger> {
        let invoice = self.load_invoice(invoice_id).await?;
        let ledger = self.ledger_for(&invoice).await?;

        Ok(InvoiceLedger {
            invoice_id: invoice.id,
            document_number: invoice.document_number,
            invoice_total: invoice.totals.grand_total,
            cancelled: invoice.cancelled,
            ledger,
        })
    }

    async fn load_note(&self, note_id: &str) -> Result<PaymentNote> {
        self.note_repo
            .find_by_id(note_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Payment note '{}' not found", note_id)))
    }

    async fn load_invoice(&self, invoice_id: &str) -> Result<Invoice> {
        self.invoice_repo
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice '{}' not found", invoice_id)))
    }
}
