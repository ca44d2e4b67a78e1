pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{ConfirmedNumber, DocumentNumber, DocumentType, SequenceKey};
pub use repositories::{CounterStore, InMemoryCounterStore, MySqlCounterStore};
pub use services::SequenceAllocator;
