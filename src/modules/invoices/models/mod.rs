mod invoice;
mod line_item;

pub use invoice::{
    Company, CompanyInput, CreateInvoiceRequest, Customer, Invoice, InvoiceTotals,
    ReplaceItemsRequest, INVOICE_SCHEMA_VERSION,
};
pub use line_item::{ComputedLineItem, LineItem};
