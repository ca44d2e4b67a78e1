mod tax;

pub use tax::{TaxRegime, TaxSplit};
