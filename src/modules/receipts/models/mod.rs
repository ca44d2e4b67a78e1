mod receipt;

pub use receipt::{CreateReceiptRequest, DeliveryInfo, PaymentReceipt, ReceiptSnapshot};
