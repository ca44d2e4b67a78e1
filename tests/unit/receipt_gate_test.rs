use billcore::core::AppError;
use billcore::ledger::{LedgerReconciler, PaymentNote};
use billcore::receipts::{DeliveryInfo, ReceiptGate};
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[cfg(test)]
mod receipt_gate_tests {
    use super::*;

    fn delivery() -> DeliveryInfo {
        DeliveryInfo {
            name: Some("Anu Traders".to_string()),
            contact: Some("9847000000".to_string()),
            email: None,
        }
    }

    fn note(id: &str, day: u32, amount: Decimal) -> PaymentNote {
        let mut note = PaymentNote::new("inv-1", NaiveDate::from_ymd_opt(2025, 6, day).unwrap(), amount).unwrap();
        note.id = id.to_string();
        note
    }

    proptest! {
        #[test]
        fn test_never_accepts_outside_tolerance(
            total_cents in 100i64..1_000_000i64,
            offset_cents in prop_oneof![-100_000i64..-1i64, 2i64..100_000i64],
        ) {
            let total = Decimal::new(total_cents, 2);
            let requested = total + Decimal::new(offset_cents, 2);
            // fully paid ledger, so only the amount rule can reject
            let ledger = LedgerReconciler::reconcile_ledger(total, &[note("a", 1, total)]);

            let result = ReceiptGate::evaluate_receipt_request(total, &ledger, requested, None, &delivery());

            if offset_cents.abs() > 1 {
                let is_mismatch = matches!(result, Err(AppError::AmountMismatch { .. }));
                prop_assert!(is_mismatch);
            }
        }

        #[test]
        fn test_accepts_within_one_paisa(
            total_cents in 100i64..1_000_000i64,
            offset_cents in -1i64..=1i64,
        ) {
            let total = Decimal::new(total_cents, 2);
            let ledger = LedgerReconciler::reconcile_ledger(total, &[note("a", 1, total)]);

            let requested = total + Decimal::new(offset_cents, 2);
            let result = ReceiptGate::evaluate_receipt_request(total, &ledger, requested, None, &delivery());
            prop_assert!(result.is_ok());
        }
    }

    #[test]
    fn test_accepts_full_settlement() {
        let notes = vec![note("a", 1, dec!(400.00)), note("b", 2, dec!(600.00))];
        let ledger = LedgerReconciler::reconcile_ledger(dec!(1000.00), &notes);

        let snapshot =
            ReceiptGate::evaluate_receipt_request(dec!(1000.00), &ledger, dec!(1000.00), None, &delivery())
                .unwrap();

        assert_eq!(snapshot.total_product_amount, dec!(1000.00));
        assert_eq!(snapshot.total_paid_amount, dec!(1000.00));
        assert_eq!(snapshot.remaining_balance, dec!(0.00));
        assert_eq!(snapshot.history.len(), 3);
        assert_eq!(snapshot.referenced_note_ids, vec!["a", "b"]);
    }

    #[test]
    fn test_rejects_partial_amount() {
        let ledger = LedgerReconciler::reconcile_ledger(dec!(1000.00), &[note("a", 1, dec!(400.00))]);
        assert_eq!(ledger.current_balance, dec!(600.00));

        let err =
            ReceiptGate::evaluate_receipt_request(dec!(1000.00), &ledger, dec!(400.00), None, &delivery())
                .unwrap_err();

        match err {
            AppError::AmountMismatch { expected, actual } => {
                assert_eq!(expected, dec!(1000.00));
                assert_eq!(actual, dec!(400.00));
            }
            other => panic!("expected AmountMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_missing_contact() {
        let ledger = LedgerReconciler::reconcile_ledger(dec!(100), &[note("a", 1, dec!(100))]);
        let delivery = DeliveryInfo {
            name: Some("Anu Traders".to_string()),
            contact: Some(String::new()),
            email: Some("anu@example.com".to_string()),
        };

        let err = ReceiptGate::evaluate_receipt_request(dec!(100), &ledger, dec!(100), None, &delivery)
            .unwrap_err();

        match err {
            AppError::MissingDeliveryInfo(fields) => assert_eq!(fields, vec!["contact"]),
            other => panic!("expected MissingDeliveryInfo, got {other:?}"),
        }
    }

    #[test]
    fn test_overpaid_ledger_backs_invoice_total() {
        let notes = vec![note("a", 1, dec!(800)), note("b", 2, dec!(300))];
        let ledger = LedgerReconciler::reconcile_ledger(dec!(1000), &notes);

        let snapshot =
            ReceiptGate::evaluate_receipt_request(dec!(1000), &ledger, dec!(1000), None, &delivery()).unwrap();
        assert_eq!(snapshot.total_paid_amount, dec!(1000.00));
    }

    #[test]
    fn test_scoped_partial_note_rejected() {
        let notes = vec![note("a", 1, dec!(400)), note("b", 2, dec!(600))];
        let ledger = LedgerReconciler::reconcile_ledger(dec!(1000), &notes);

        let err =
            ReceiptGate::evaluate_receipt_request(dec!(1000), &ledger, dec!(1000), Some("b"), &delivery())
                .unwrap_err();

        assert!(matches!(
            err,
            AppError::AmountMismatch { expected, .. } if expected == dec!(600)
        ));
    }
}
