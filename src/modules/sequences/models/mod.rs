mod document_number;

pub use document_number::{ConfirmedNumber, DocumentNumber, DocumentType, SequenceKey};
