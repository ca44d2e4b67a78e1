use std::sync::Arc;

use tracing::{info, warn};

use crate::config::BillingConfig;
use crate::core::{AppError, KeyedLocks, Result};
use crate::modules::invoices::repositories::InvoiceRepository;
use crate::modules::ledger::services::PaymentNoteService;
use crate::modules::receipts::models::{CreateReceiptRequest, DeliveryInfo, PaymentReceipt};
use crate::modules::receipts::repositories::ReceiptRepository;
use crate::modules::receipts::services::ReceiptGate;
use crate::modules::sequences::models::{ConfirmedNumber, DocumentNumber, DocumentType};
use crate::modules::sequences::services::SequenceAllocator;

/// Issues point-in-time payment receipts
pub struct ReceiptService {
    invoice_repo: Arc<dyn InvoiceRepository>,
    receipt_repo: Arc<dyn ReceiptRepository>,
    payment_notes: Arc<PaymentNoteService>,
    allocator: Arc<SequenceAllocator>,
    locks: Arc<KeyedLocks>,
    billing: BillingConfig,
}

impl ReceiptService {
    pub fn new(
        invoice_repo: Arc<dyn InvoiceRepository>,
        receipt_repo: Arc<dyn ReceiptRepository>,
        payment_notes: Arc<PaymentNoteService>,
        allocator: Arc<SequenceAllocator>,
        locks: Arc<KeyedLocks>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            invoice_repo,
            receipt_repo,
            payment_notes,
            allocator,
            locks,
            billing,
        }
    }

    /// Reconcile the invoice, run the gate and persist the snapshot
    ///
    /// Holds the invoice guard from the ledger read to the insert, so no note
    /// changes between the gate and the stored snapshot.
    pub async fn issue_receipt(
        &self,
        invoice_id: &str,
        request: CreateReceiptRequest,
    ) -> Result<PaymentReceipt> {
        let _guard = self.locks.lock(invoice_id).await;
        let invoice = self
            .invoice_repo
            .find_by_id(invoice_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice '{}' not found", invoice_id)))?;

        if !invoice.document_type.accepts_payments() {
            return Err(AppError::validation(format!(
                "Receipts cannot be issued for a {}",
                invoice.document_type
            )));
        }

        let ledger = self.payment_notes.ledger_for(&invoice).await?;
        let delivery = request
            .delivery
            .unwrap_or_else(|| DeliveryInfo::from(&invoice.customer));

        let snapshot = ReceiptGate::evaluate_receipt_request(
            invoice.grand_total(),
            &ledger,
            request.requested_amount,
            request.payment_note_id.as_deref(),
            &delivery,
        )
        .map_err(|e| {
            warn!(
                invoice_id = %invoice.id,
                requested_amount = %request.requested_amount,
                kind = e.kind(),
                "Receipt request rejected"
            );
            e
        })?;

        let number = self
            .allocator
            .allocate(
                &invoice.company.prefix,
                DocumentType::PaymentReceipt,
                self.billing.allow_unconfirmed_numbers,
            )
            .await?;

        let receipt = PaymentReceipt::issue(number, &invoice, snapshot, delivery);
        let receipt = self.receipt_repo.create(&receipt).await?;

        info!(
            invoice_id = %invoice.id,
            receipt_number = %receipt.receipt_number,
            total_paid_amount = %receipt.total_paid_amount,
            cancelled = receipt.cancelled,
            "Payment receipt issued"
        );

        Ok(receipt)
    }

    /// Re-number every receipt issued with a fallback number
    pub async fn confirm_receipt_numbers(&self) -> Result<Vec<ConfirmedNumber>> {
        let mut confirmed = Vec::new();

        for receipt in self.receipt_repo.find_unconfirmed().await? {
            let (prefix, _) = DocumentNumber::parse(&receipt.receipt_number)?;

            let number = self
                .allocator
                .allocate_next_number(&prefix, DocumentType::PaymentReceipt)
                .await?;
            self.receipt_repo
                .confirm_number(&receipt.id, &number.value)
                .await?;
            self.allocator
                .mark_reconciled(DocumentType::PaymentReceipt, &receipt.receipt_number);

            info!(
                receipt_id = %receipt.id,
                previous_number = %receipt.receipt_number,
                document_number = %number,
                "Document number confirmed"
            );

            confirmed.push(ConfirmedNumber {
                document_type: DocumentType::PaymentReceipt,
                record_id: receipt.id,
                previous_number: receipt.receipt_number,
                document_number: number.value,
            });
        }

        Ok(confirmed)
    }

    pub async fn get_receipt(&self, id: &str) -> Result<PaymentReceipt> {
        self.receipt_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Receipt '{}' not found", id)))
    }

    pub async fn list_receipts(&self, invoice_id: &str) -> Result<Vec<PaymentReceipt>> {
        self.receipt_repo.find_by_invoice(invoice_id).await
    }
}
