pub mod receipt_gate;
pub mod receipt_service;

pub use receipt_gate::ReceiptGate;
pub use receipt_service::ReceiptService;
