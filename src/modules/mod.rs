pub mod health;
pub mod invoices;
pub mod ledger;
pub mod receipts;
pub mod sequences;
pub mod taxes;
