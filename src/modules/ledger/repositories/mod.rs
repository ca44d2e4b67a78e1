pub mod payment_note_repository;

pub use payment_note_repository::{
    InMemoryPaymentNoteRepository, MySqlPaymentNoteRepository, PaymentNoteRepository,
};
