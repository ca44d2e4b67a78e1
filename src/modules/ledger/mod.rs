// Ledger module: payment notes and the reconciled payment history

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{LedgerEntry, LedgerResult, LedgerWarning, PaymentNote, PaymentStatus};
pub use repositories::{
    InMemoryPaymentNoteRepository, MySqlPaymentNoteRepository, PaymentNoteRepository,
};
pub use services::{LedgerReconciler, PaymentNoteService};
