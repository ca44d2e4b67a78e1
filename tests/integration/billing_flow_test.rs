use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use billcore::config::BillingConfig;
use billcore::core::{AppError, Result};
use billcore::invoices::models::{CompanyInput, CreateInvoiceRequest, Customer, ReplaceItemsRequest};
use billcore::invoices::LineItem;
use billcore::ledger::models::{EditPaymentNoteRequest, RecordPaymentNoteRequest};
use billcore::ledger::PaymentStatus;
use billcore::receipts::models::CreateReceiptRequest;
use billcore::sequences::{CounterStore, DocumentType, InMemoryCounterStore, SequenceKey};
use billcore::startup::Stores;
use billcore::AppState;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Invoice and payment note lifecycle on in-memory stores

#[cfg(test)]
mod billing_flow_tests {
    use super::*;

    fn customer() -> Customer {
        Customer {
            id: "cust-1".to_string(),
            name: Some("Anu Traders".to_string()),
            contact: Some("9847000000".to_string()),
            email: None,
            state_code: Some("32".to_string()),
        }
    }

    fn request(items: Vec<LineItem>) -> CreateInvoiceRequest {
        CreateInvoiceRequest {
            schema_version: 1,
            document_type: DocumentType::CreditBill,
            company: CompanyInput {
                name: "WYENFOS".to_string(),
                prefix: None,
                state_code: Some("32".to_string()),
            },
            customer: customer(),
            is_other_state: None,
            apply_round_off: Some(false),
            invoice_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            items,
        }
    }

    /// Counter store that can be taken offline mid-test
    #[derive(Default)]
    struct SwitchableStore {
        inner: InMemoryCounterStore,
        offline: AtomicBool,
    }

    impl SwitchableStore {
        fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        fn check(&self) -> Result<()> {
            if self.offline.load(Ordering::SeqCst) {
                Err(AppError::allocation_failure("connection refused"))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CounterStore for SwitchableStore {
        async fn increment(&self, key: &SequenceKey) -> Result<u64> {
            self.check()?;
            self.inner.increment(key).await
        }

        async fn seed(&self, key: &SequenceKey, last_issued: u64) -> Result<u64> {
            self.check()?;
            self.inner.seed(key, last_issued).await
        }

        async fn current(&self, key: &SequenceKey) -> Result<Option<u64>> {
            self.check()?;
            self.inner.current(key).await
        }
    }

    fn payment(day: u32, amount: Decimal) -> RecordPaymentNoteRequest {
        RecordPaymentNoteRequest {
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            amount_paid: amount,
            issue_note_number: false,
        }
    }

    #[tokio::test]
    async fn test_create_invoice_resolves_prefix_and_totals() {
        let state = AppState::in_memory(BillingConfig::default());

        let invoice = state
            .invoices
            .create_invoice(request(vec![LineItem::new("Tiles", dec!(2), dec!(100), dec!(18))]))
            .await
            .unwrap();

        assert_eq!(invoice.document_number, "WNF-1");
        assert!(!invoice.number_unconfirmed);
        assert_eq!(invoice.totals.cgst, dec!(18.00));
        assert_eq!(invoice.totals.sgst, dec!(18.00));
        assert_eq!(invoice.totals.igst, dec!(0.00));
        assert_eq!(invoice.totals.grand_total, dec!(236.00));

        let fetched = state.invoices.get_invoice(&invoice.id).await.unwrap();
        assert_eq!(fetched.document_number, invoice.document_number);
    }

    #[tokio::test]
    async fn test_state_codes_pick_inter_state_regime() {
        let state = AppState::in_memory(BillingConfig::default());
        let mut req = request(vec![LineItem::new("Tiles", dec!(2), dec!(100), dec!(18))]);
        req.customer.state_code = Some("29".to_string());

        let invoice = state.invoices.create_invoice(req).await.unwrap();

        assert!(invoice.is_other_state);
        assert_eq!(invoice.totals.igst, dec!(36.00));
        assert_eq!(invoice.totals.cgst + invoice.totals.sgst, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_numbers_advance_per_document_type() {
        let state = AppState::in_memory(BillingConfig::default());
        let items = vec![LineItem::new("Tiles", dec!(1), dec!(10), dec!(5))];

        let first = state.invoices.create_invoice(request(items.clone())).await.unwrap();
        let second = state.invoices.create_invoice(request(items.clone())).await.unwrap();

        let mut cash = request(items);
        cash.document_type = DocumentType::CashBill;
        let cash = state.invoices.create_invoice(cash).await.unwrap();

        assert_eq!(first.document_number, "WNF-1");
        assert_eq!(second.document_number, "WNF-2");
        assert_eq!(cash.document_number, "WNF-1");
    }

    #[tokio::test]
    async fn test_unknown_company_without_prefix_rejected() {
        let state = AppState::in_memory(BillingConfig::default());
        let mut req = request(vec![]);
        req.company.name = "Unknown Co".to_string();

        let err = state.invoices.create_invoice(req).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_invalid_line_item_rejected_before_numbering() {
        let state = AppState::in_memory(BillingConfig::default());

        let err = state
            .invoices
            .create_invoice(request(vec![LineItem::new("Bad", dec!(-1), dec!(10), dec!(5))]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidLineItem(_)));

        // no number was consumed
        let ok = state
            .invoices
            .create_invoice(request(vec![LineItem::new("Good", dec!(1), dec!(10), dec!(5))]))
            .await
            .unwrap();
        assert_eq!(ok.document_number, "WNF-1");
    }

    #[tokio::test]
    async fn test_replace_items_recomputes_totals() {
        let state = AppState::in_memory(BillingConfig::default());
        let invoice = state
            .invoices
            .create_invoice(request(vec![LineItem::new("Tiles", dec!(2), dec!(100), dec!(18))]))
            .await
            .unwrap();

        let updated = state
            .invoices
            .replace_items(
                &invoice.id,
                ReplaceItemsRequest {
                    items: vec![LineItem::new("Paint", dec!(1), dec!(200.34), dec!(18))],
                    apply_round_off: Some(true),
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.totals.unrounded_grand_total, dec!(236.40));
        assert_eq!(updated.totals.grand_total, dec!(236.00));
        assert_eq!(updated.totals.round_off, dec!(-0.40));
        assert_eq!(updated.document_number, invoice.document_number);
    }

    #[tokio::test]
    async fn test_ledger_follows_payment_notes() {
        let state = AppState::in_memory(BillingConfig::default());
        let invoice = state
            .invoices
            .create_invoice(request(vec![LineItem::new("Service", dec!(1), dec!(1000), dec!(0))]))
            .await
            .unwrap();

        state
            .payment_notes
            .record_payment_note(&invoice.id, payment(5, dec!(600)))
            .await
            .unwrap();
        state
            .payment_notes
            .record_payment_note(&invoice.id, payment(2, dec!(400)))
            .await
            .unwrap();

        let ledger = state.payment_notes.invoice_ledger(&invoice.id).await.unwrap();
        let balances: Vec<Decimal> = ledger.ledger.history.iter().map(|e| e.balance).collect();

        assert_eq!(balances, vec![dec!(1000), dec!(600), dec!(0)]);
        assert_eq!(ledger.ledger.payment_status, PaymentStatus::FullyPaid);
        assert_eq!(ledger.invoice_total, dec!(1000.00));
    }

    #[tokio::test]
    async fn test_edited_note_changes_ledger() {
        let state = AppState::in_memory(BillingConfig::default());
        let invoice = state
            .invoices
            .create_invoice(request(vec![LineItem::new("Service", dec!(1), dec!(1000), dec!(0))]))
            .await
            .unwrap();
        let note = state
            .payment_notes
            .record_payment_note(&invoice.id, payment(1, dec!(400)))
            .await
            .unwrap();

        let edited = state
            .payment_notes
            .edit_payment_note(
                &note.id,
                EditPaymentNoteRequest {
                    amount_paid: Some(dec!(450)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(edited.amount_paid, dec!(450.00));
        assert_eq!(edited.seq, note.seq);

        let ledger = state.payment_notes.invoice_ledger(&invoice.id).await.unwrap();
        assert_eq!(ledger.ledger.current_balance, dec!(550.00));
    }

    #[tokio::test]
    async fn test_debit_note_number_issued_on_request() {
        let state = AppState::in_memory(BillingConfig::default());
        let invoice = state
            .invoices
            .create_invoice(request(vec![LineItem::new("Service", dec!(1), dec!(1000), dec!(0))]))
            .await
            .unwrap();

        let mut req = payment(1, dec!(100));
        req.issue_note_number = true;
        let note = state.payment_notes.record_payment_note(&invoice.id, req).await.unwrap();

        assert_eq!(note.note_number.as_deref(), Some("WNF-1"));
        assert!(!note.note_number_unconfirmed);
    }

    #[tokio::test]
    async fn test_quotation_rejects_payments() {
        let state = AppState::in_memory(BillingConfig::default());
        let mut req = request(vec![LineItem::new("Service", dec!(1), dec!(1000), dec!(0))]);
        req.document_type = DocumentType::Quotation;
        let quotation = state.invoices.create_invoice(req).await.unwrap();

        let err = state
            .payment_notes
            .record_payment_note(&quotation.id, payment(1, dec!(100)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_cancelled_invoice_stays_readable() {
        let state = AppState::in_memory(BillingConfig::default());
        let invoice = state
            .invoices
            .create_invoice(request(vec![LineItem::new("Service", dec!(1), dec!(1000), dec!(0))]))
            .await
            .unwrap();
        state
            .payment_notes
            .record_payment_note(&invoice.id, payment(1, dec!(250)))
            .await
            .unwrap();

        let cancelled = state.invoices.cancel_invoice(&invoice.id).await.unwrap();
        assert!(cancelled.cancelled);

        let again = state.invoices.cancel_invoice(&invoice.id).await.unwrap_err();
        assert!(matches!(again, AppError::Conflict(_)));

        let late = state
            .payment_notes
            .record_payment_note(&invoice.id, payment(2, dec!(100)))
            .await
            .unwrap_err();
        assert!(matches!(late, AppError::Conflict(_)));

        let ledger = state.payment_notes.invoice_ledger(&invoice.id).await.unwrap();
        assert!(ledger.cancelled);
        assert_eq!(ledger.ledger.current_balance, dec!(750.00));
    }

    #[tokio::test]
    async fn test_missing_invoice_is_not_found() {
        let state = AppState::in_memory(BillingConfig::default());

        let err = state.invoices.get_invoice("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = state.payment_notes.invoice_ledger("missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_outage_numbers_are_confirmed_after_recovery() {
        let store = Arc::new(SwitchableStore::default());
        let state = AppState::from_stores(
            Stores {
                counters: store.clone(),
                ..Stores::in_memory()
            },
            BillingConfig::default(),
            None,
        );
        let bill = || request(vec![LineItem::new("Service", dec!(1), dec!(1000), dec!(0))]);

        let first = state.invoices.create_invoice(bill()).await.unwrap();
        assert_eq!(first.document_number, "WNF-1");

        store.set_offline(true);
        let degraded = state.invoices.create_invoice(bill()).await.unwrap();
        assert_eq!(degraded.document_number, "WNF-2");
        assert!(degraded.number_unconfirmed);

        let mut req = payment(2, dec!(1000));
        req.issue_note_number = true;
        let note = state.payment_notes.record_payment_note(&first.id, req).await.unwrap();
        assert_eq!(note.note_number.as_deref(), Some("WNF-1"));
        assert!(note.note_number_unconfirmed);

        let receipt = state
            .receipts
            .issue_receipt(
                &first.id,
                CreateReceiptRequest {
                    payment_note_id: None,
                    requested_amount: dec!(1000),
                    delivery: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(receipt.receipt_number, "WNF-1");
        assert!(receipt.receipt_number_unconfirmed);
        assert_eq!(state.allocator.unconfirmed_numbers().len(), 3);

        // the recovered store continues past the fallback number
        store.set_offline(false);
        let recovered = state.invoices.create_invoice(bill()).await.unwrap();
        assert_eq!(recovered.document_number, "WNF-3");
        assert!(!recovered.number_unconfirmed);

        let invoices = state.invoices.confirm_document_numbers().await.unwrap();
        let notes = state.payment_notes.confirm_note_numbers().await.unwrap();
        let receipts = state.receipts.confirm_receipt_numbers().await.unwrap();

        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].record_id, degraded.id);
        assert_eq!(invoices[0].previous_number, "WNF-2");
        assert_eq!(invoices[0].document_number, "WNF-4");

        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].document_type, DocumentType::DebitNote);
        assert_eq!(notes[0].document_number, "WNF-2");

        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].document_type, DocumentType::PaymentReceipt);
        assert_eq!(receipts[0].document_number, "WNF-2");

        assert!(state.allocator.unconfirmed_numbers().is_empty());

        let renumbered = state.invoices.get_invoice(&degraded.id).await.unwrap();
        assert_eq!(renumbered.document_number, "WNF-4");
        assert!(!renumbered.number_unconfirmed);

        let stored_note = &state.payment_notes.list_payment_notes(&first.id).await.unwrap()[0];
        assert_eq!(stored_note.note_number.as_deref(), Some("WNF-2"));
        assert!(!stored_note.note_number_unconfirmed);

        let stored_receipt = state.receipts.get_receipt(&receipt.id).await.unwrap();
        assert_eq!(stored_receipt.receipt_number, "WNF-2");
        assert!(!stored_receipt.receipt_number_unconfirmed);
        assert_eq!(stored_receipt.history, receipt.history);

        assert!(state.invoices.confirm_document_numbers().await.unwrap().is_empty());
        assert!(state.receipts.confirm_receipt_numbers().await.unwrap().is_empty());
    }
}
