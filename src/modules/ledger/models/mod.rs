mod ledger;
mod payment_note;

pub use ledger::{
    InvoiceLedger, LedgerEntry, LedgerEntryType, LedgerResult, LedgerWarning, PaymentStatus,
};
pub use payment_note::{EditPaymentNoteRequest, PaymentNote, RecordPaymentNoteRequest};
