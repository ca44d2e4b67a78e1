mod tax_splitter;

pub use tax_splitter::TaxSplitter;
