use rust_decimal::Decimal;

use crate::core::{round_money, within_tolerance, AppError, Result};
use crate::modules::ledger::models::LedgerResult;
use crate::modules::receipts::models::{DeliveryInfo, ReceiptSnapshot};

/// Decides whether a receipt may be issued
///
/// A receipt is only ever issued for a full settlement: the requested amount
/// must match the invoice total within 0.01 and must be backed by recorded
/// payments. Delivery fields are checked before any amount.
pub struct ReceiptGate;

impl ReceiptGate {
    pub fn evaluate_receipt_request(
        invoice_total: Decimal,
        ledger: &LedgerResult,
        requested_amount: Decimal,
        payment_note_id: Option<&str>,
        delivery: &DeliveryInfo,
    ) -> Result<ReceiptSnapshot> {
        let missing = delivery.missing_fields();
        if !missing.is_empty() {
            return Err(AppError::MissingDeliveryInfo(missing));
        }

        if !within_tolerance(requested_amount, invoice_total) {
            return Err(AppError::AmountMismatch {
                expected: round_money(invoice_total),
                actual: requested_amount,
            });
        }

        let (backed, referenced_note_ids) = match payment_note_id {
            Some(note_id) => {
                let entry = ledger.entry_for_note(note_id).ok_or_else(|| {
                    AppError::not_found(format!("Payment note '{}' not found on this invoice", note_id))
                })?;
                let applied = entry.paid - entry.overpayment.unwrap_or(Decimal::ZERO);
                (applied, vec![note_id.to_string()])
            }
            None => (ledger.total_applied(), ledger.note_ids()),
        };

        if !within_tolerance(requested_amount, backed) {
            return Err(AppError::AmountMismatch {
                expected: round_money(backed),
                actual: requested_amount,
            });
        }

        Ok(ReceiptSnapshot {
            payment_note_id: payment_note_id.map(str::to_string),
            total_product_amount: round_money(invoice_total),
            total_paid_amount: round_money(backed),
            remaining_balance: round_money(ledger.current_balance),
            payment_status: ledger.payment_status,
            history: ledger.history.clone(),
            referenced_note_ids,
        })
    }
}
