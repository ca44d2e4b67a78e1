pub mod controllers;
pub mod models;
pub mod services;

pub use models::{TaxRegime, TaxSplit};
pub use services::TaxSplitter;
