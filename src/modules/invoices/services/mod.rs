pub mod invoice_aggregator;
pub mod invoice_service;

pub use invoice_aggregator::InvoiceAggregator;
pub use invoice_service::InvoiceService;
