use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::config::BillingConfig;
use crate::core::{AppError, KeyedLocks, Result};
use crate::modules::invoices::models::{
    Company, CreateInvoiceRequest, Invoice, ReplaceItemsRequest,
};
use crate::modules::invoices::repositories::InvoiceRepository;
use crate::modules::invoices::services::InvoiceAggregator;
use crate::modules::receipts::repositories::ReceiptRepository;
use crate::modules::sequences::models::ConfirmedNumber;
use crate::modules::sequences::services::SequenceAllocator;
use crate::modules::taxes::TaxSplitter;

/// Service for invoice business logic
pub struct InvoiceService {
    invoice_repo: Arc<dyn InvoiceRepository>,
    receipt_repo: Arc<dyn ReceiptRepository>,
    allocator: Arc<SequenceAllocator>,
    locks: Arc<KeyedLocks>,
    splitter: TaxSplitter,
    billing: BillingConfig,
}

impl InvoiceService {
    pub fn new(
        invoice_repo: Arc<dyn InvoiceRepository>,
        receipt_repo: Arc<dyn ReceiptRepository>,
        allocator: Arc<SequenceAllocator>,
        locks: Arc<KeyedLocks>,
        billing: BillingConfig,
    ) -> Self {
        Self {
            invoice_repo,
            receipt_repo,
            allocator,
            locks,
            splitter: TaxSplitter::new(),
            billing,
        }
    }

    /// Split, aggregate, number and persist a new bill
    pub async fn create_invoice(&self, request: CreateInvoiceRequest) -> Result<Invoice> {
        request.validate_schema()?;

        let company = self.resolve_company(&request)?;
        let regime = request.regime();
        let apply_round_off = request
            .apply_round_off
            .unwrap_or(self.billing.default_apply_round_off);

        let items = self.splitter.compute_all(&request.items, regime)?;
        let totals = InvoiceAggregator::aggregate(&items, apply_round_off)?;

        if !request.document_type.is_billable() {
            return Err(AppError::validation(format!(
                "Document type '{}' cannot be billed",
                request.document_type
            )));
        }

        let number = self
            .allocator
            .allocate(
                &company.prefix,
                request.document_type,
                self.billing.allow_unconfirmed_numbers,
            )
            .await?;

        let invoice = Invoice::new(
            request.document_type,
            number,
            company,
            request.customer,
            regime,
            apply_round_off,
            request.invoice_date.unwrap_or_else(|| Utc::now().date_naive()),
            items,
            totals,
        )?;

        let invoice = self.invoice_repo.create(&invoice).await?;

        if invoice.number_unconfirmed {
            warn!(
                invoice_id = %invoice.id,
                document_number = %invoice.document_number,
                "Invoice created with unconfirmed document number"
            );
        }

        info!(
            invoice_id = %invoice.id,
            document_number = %invoice.document_number,
            document_type = %invoice.document_type,
            grand_total = %invoice.totals.grand_total,
            items = invoice.items.len(),
            "Invoice created"
        );

        Ok(invoice)
    }

    pub async fn get_invoice(&self, id: &str) -> Result<Invoice> {
        self.invoice_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Invoice '{}' not found", id)))
    }

    pub async fn list_invoices(&self, limit: i64, offset: i64) -> Result<Vec<Invoice>> {
        self.invoice_repo.list(limit, offset).await
    }

    /// Replace line items and recompute totals
    pub async fn replace_items(&self, id: &str, request: ReplaceItemsRequest) -> Result<Invoice> {
        let _guard = self.locks.lock(id).await;
        let mut invoice = self.get_invoice(id).await?;

        if self.receipt_repo.exists_for_invoice(&invoice.id).await? {
            return Err(AppError::conflict(format!(
                "Invoice {} already has a receipt and cannot be edited",
                invoice.document_number
            )));
        }

        if let Some(apply_round_off) = request.apply_round_off {
            invoice.apply_round_off = apply_round_off;
        }

        let items = self.splitter.compute_all(&request.items, invoice.regime())?;
        let totals = InvoiceAggregator::aggregate(&items, invoice.apply_round_off)?;
        invoice.replace_items(items, totals)?;

        self.invoice_repo.update(&invoice).await?;

        info!(
            invoice_id = %invoice.id,
            grand_total = %invoice.totals.grand_total,
            "Invoice items replaced"
        );

        Ok(invoice)
    }

    /// Flag an invoice cancelled; it stays readable and reconcilable
    pub async fn cancel_invoice(&self, id: &str) -> Result<Invoice> {
        let mut invoice = self.get_invoice(id).await?;
        invoice.cancel()?;

        self.invoice_repo.update(&invoice).await?;

        info!(invoice_id = %invoice.id, document_number = %invoice.document_number, "Invoice cancelled");

        Ok(invoice)
    }

    /// Re-number every invoice issued with a fallback number
    pub async fn confirm_document_numbers(&self) -> Result<Vec<ConfirmedNumber>> {
        let mut confirmed = Vec::new();

        for mut invoice in self.invoice_repo.find_unconfirmed().await? {
            let number = self
                .allocator
                .allocate_next_number(&invoice.company.prefix, invoice.document_type)
                .await?;

            let previous_number = invoice.document_number.clone();
            invoice.confirm_number(number)?;
            self.invoice_repo.update(&invoice).await?;
            self.allocator
                .mark_reconciled(invoice.document_type, &previous_number);

            info!(
                invoice_id = %invoice.id,
                previous_number = %previous_number,
                document_number = %invoice.document_number,
                "Document number confirmed"
            );

            confirmed.push(ConfirmedNumber {
                document_type: invoice.document_type,
                record_id: invoice.id,
                previous_number,
                document_number: invoice.document_number,
            });
        }

        Ok(confirmed)
    }

    fn resolve_company(&self, request: &CreateInvoiceRequest) -> Result<Company> {
        let name = request.company.name.trim().to_string();

        let prefix = match &request.company.prefix {
            Some(prefix) if !prefix.trim().is_empty() => prefix.trim().to_uppercase(),
            _ => self
                .billing
                .prefix_for(&name)
                .map(str::to_string)
                .ok_or_else(|| {
                    AppError::validation(format!("No document prefix configured for company '{}'", name))
                })?,
        };

        Ok(Company {
            name,
            prefix,
            state_code: request.company.state_code.clone(),
        })
    }
}
