// Invoices module

pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{ComputedLineItem, Invoice, InvoiceTotals, LineItem};
pub use repositories::{InMemoryInvoiceRepository, InvoiceRepository, MySqlInvoiceRepository};
pub use services::{InvoiceAggregator, InvoiceService};
