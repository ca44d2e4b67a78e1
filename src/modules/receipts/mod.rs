// Receipts module: gate and point-in-time receipt snapshots

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{DeliveryInfo, PaymentReceipt};
pub use repositories::{InMemoryReceiptRepository, MySqlReceiptRepository, ReceiptRepository};
pub use services::{ReceiptGate, ReceiptService};
