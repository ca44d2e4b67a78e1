use billcore::ledger::{LedgerReconciler, LedgerWarning, PaymentNote, PaymentStatus};
use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Ledger reconciliation properties
///
/// - recomputation is idempotent
/// - reordering notes never changes the final balance
/// - Σ paid − overpaid + balance = invoice total, clamped case included

#[cfg(test)]
mod ledger_reconciler_tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + chrono::Days::new(d as u64)
    }

    fn note(id: &str, d: u32, amount: Decimal, seq: i64) -> PaymentNote {
        let mut note = PaymentNote::new("inv-1", day(d), amount).unwrap();
        note.id = id.to_string();
        note.seq = seq;
        note
    }

    fn notes_strategy() -> impl Strategy<Value = Vec<PaymentNote>> {
        prop::collection::vec((0u32..10u32, 1i64..500_000i64), 0..12).prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (d, cents))| note(&format!("n{:02}", i), d, Decimal::new(cents, 2), i as i64 + 1))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn test_idempotent(total_cents in 0i64..1_000_000i64, notes in notes_strategy()) {
            let total = Decimal::new(total_cents, 2);
            let first = LedgerReconciler::reconcile_ledger(total, &notes);
            let second = LedgerReconciler::reconcile_ledger(total, &notes);
            prop_assert_eq!(first, second);
        }

        #[test]
        fn test_final_balance_order_independent(
            total_cents in 0i64..1_000_000i64,
            notes in notes_strategy(),
        ) {
            let total = Decimal::new(total_cents, 2);
            let mut shuffled = notes.clone();
            shuffled.reverse();
            for (i, n) in shuffled.iter_mut().enumerate() {
                n.seq = i as i64 + 1;
            }

            let a = LedgerReconciler::reconcile_ledger(total, &notes);
            let b = LedgerReconciler::reconcile_ledger(total, &shuffled);

            prop_assert_eq!(a.current_balance, b.current_balance);
            prop_assert_eq!(a.total_paid, b.total_paid);
            prop_assert_eq!(a.is_fully_paid, b.is_fully_paid);
        }

        #[test]
        fn test_conservation(total_cents in 0i64..1_000_000i64, notes in notes_strategy()) {
            let total = Decimal::new(total_cents, 2);
            let result = LedgerReconciler::reconcile_ledger(total, &notes);

            let paid: Decimal = notes.iter().map(|n| n.amount_paid).sum();
            prop_assert_eq!(result.total_paid, paid);
            prop_assert_eq!(paid - result.total_overpaid + result.current_balance, total);
            prop_assert!(result.current_balance >= Decimal::ZERO);
            prop_assert!(result.history.iter().all(|e| e.balance >= Decimal::ZERO));
            prop_assert_eq!(result.history.len(), notes.len() + 1);
        }
    }

    #[test]
    fn test_two_installments_settle() {
        let notes = vec![note("a", 1, dec!(400.00), 1), note("b", 2, dec!(600.00), 2)];
        let result = LedgerReconciler::reconcile_ledger(dec!(1000.00), &notes);

        let balances: Vec<Decimal> = result.history.iter().map(|e| e.balance).collect();
        assert_eq!(balances, vec![dec!(1000), dec!(600), dec!(0)]);
        assert!(result.is_fully_paid);
        assert_eq!(result.payment_status, PaymentStatus::FullyPaid);
        assert_eq!(result.total_paid, dec!(1000.00));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_partial_payment() {
        let result = LedgerReconciler::reconcile_ledger(dec!(1000.00), &[note("a", 1, dec!(400.00), 1)]);

        assert_eq!(result.current_balance, dec!(600.00));
        assert!(!result.is_fully_paid);
        assert_eq!(result.payment_status.to_string(), "Partially Paid");
    }

    #[test]
    fn test_notes_sorted_by_date_not_arrival() {
        let notes = vec![note("late", 5, dec!(100), 1), note("early", 1, dec!(300), 2)];
        let result = LedgerReconciler::reconcile_ledger(dec!(1000), &notes);

        assert_eq!(result.history[1].reference.as_deref(), Some("early"));
        assert_eq!(result.history[1].balance, dec!(700));
        assert_eq!(result.history[2].balance, dec!(600));
    }

    #[test]
    fn test_same_day_ties_follow_insertion() {
        let notes = vec![note("z", 1, dec!(100), 1), note("a", 1, dec!(200), 2)];
        let result = LedgerReconciler::reconcile_ledger(dec!(1000), &notes);

        assert_eq!(result.note_ids(), vec!["z", "a"]);
    }

    #[test]
    fn test_overpayment_flagged_not_lost() {
        let notes = vec![note("a", 1, dec!(900), 1), note("b", 2, dec!(250), 2)];
        let result = LedgerReconciler::reconcile_ledger(dec!(1000), &notes);

        assert_eq!(result.current_balance, Decimal::ZERO);
        assert_eq!(result.total_paid, dec!(1150));
        assert_eq!(result.total_overpaid, dec!(150));
        assert_eq!(result.total_applied(), dec!(1000));
        assert_eq!(
            result.warnings,
            vec![LedgerWarning::Overpayment {
                note_id: "b".to_string(),
                excess: dec!(150),
            }]
        );
    }

    #[test]
    fn test_serialized_status_label() {
        let result = LedgerReconciler::reconcile_ledger(dec!(0), &[]);
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["payment_status"], "Fully Paid");
        assert_eq!(json["history"][0]["description"], "Initial");
        assert_eq!(json["history"][0]["entry_type"], "CreditBill");
    }
}
