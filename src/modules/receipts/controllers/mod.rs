pub mod receipt_controller;

pub use receipt_controller::configure_receipt_routes;
