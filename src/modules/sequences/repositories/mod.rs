pub mod counter_store;

pub use counter_store::{CounterStore, InMemoryCounterStore, MySqlCounterStore};
