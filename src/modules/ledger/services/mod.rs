pub mod ledger_reconciler;
pub mod payment_note_service;

pub use ledger_reconciler::LedgerReconciler;
pub use payment_note_service::PaymentNoteService;
