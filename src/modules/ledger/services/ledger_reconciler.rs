// LedgerReconciler rebuilds an invoice's payment history from its notes.
//
// The fold is pure: the same (total, notes) always yields the same result,
// and no balance is ever persisted. Callers re-run it on every read.

use rust_decimal::Decimal;
use tracing::warn;

use crate::modules::ledger::models::{
    LedgerEntry, LedgerEntryType, LedgerResult, LedgerWarning, PaymentNote, PaymentStatus,
};

pub struct LedgerReconciler;

impl LedgerReconciler {
    /// Fold payment notes against an invoice total
    ///
    /// Notes are ordered by date, then by insertion sequence, then by id.
    /// A note that pays more than the remaining balance clamps the balance at
    /// zero and is reported as an overpayment warning.
    pub fn reconcile_ledger(invoice_total: Decimal, notes: &[PaymentNote]) -> LedgerResult {
        let mut ordered: Vec<&PaymentNote> = notes.iter().collect();
        ordered.sort_by(|a, b| {
            a.date
                .cmp(&b.date)
                .then(a.seq.cmp(&b.seq))
                .then_with(|| a.id.cmp(&b.id))
        });

        let mut running_balance = invoice_total.max(Decimal::ZERO);
        let mut history = Vec::with_capacity(ordered.len() + 1);
        history.push(LedgerEntry {
            entry_type: LedgerEntryType::CreditBill,
            paid: Decimal::ZERO,
            balance: running_balance,
            date: None,
            reference: None,
            note_number: None,
            description: "Initial".to_string(),
            overpayment: None,
        });

        let mut total_paid = Decimal::ZERO;
        let mut total_overpaid = Decimal::ZERO;
        let mut warnings = Vec::new();

        for note in ordered {
            total_paid += note.amount_paid;

            let overpayment = if note.amount_paid > running_balance {
                let excess = note.amount_paid - running_balance;
                running_balance = Decimal::ZERO;
                Some(excess)
            } else {
                running_balance -= note.amount_paid;
                None
            };

            if let Some(excess) = overpayment {
                total_overpaid += excess;
                warn!(
                    note_id = %note.id,
                    invoice_id = %note.invoice_id,
                    excess = %excess,
                    "Payment note exceeds remaining balance"
                );
                warnings.push(LedgerWarning::Overpayment {
                    note_id: note.id.clone(),
                    excess,
                });
            }

            history.push(LedgerEntry {
                entry_type: LedgerEntryType::DebitNote,
                paid: note.amount_paid,
                balance: running_balance,
                date: Some(note.date),
                reference: Some(note.id.clone()),
                note_number: note.note_number.clone(),
                description: match &note.note_number {
                    Some(number) => format!("Payment {}", number),
                    None => "Payment".to_string(),
                },
                overpayment,
            });
        }

        let is_fully_paid = running_balance <= Decimal::ZERO;

        LedgerResult {
            history,
            current_balance: running_balance,
            is_fully_paid,
            payment_status: if is_fully_paid {
                PaymentStatus::FullyPaid
            } else {
                PaymentStatus::PartiallyPaid
            },
            total_paid,
            total_overpaid,
            warnings,
        }
    }
}
