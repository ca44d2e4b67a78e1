//! Billing computation and payment reconciliation service
//!
//! GST line item splitting, invoice aggregation with round-off, per-company
//! document numbering, payment note ledgers and receipt issuance.

pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;
pub mod startup;

// Re-export commonly used types
pub use modules::invoices;
pub use modules::ledger;
pub use modules::receipts;
pub use modules::sequences;
pub use modules::taxes;
pub use startup::AppState;
