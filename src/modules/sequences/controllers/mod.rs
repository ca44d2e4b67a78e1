pub mod sequence_controller;

pub use sequence_controller::configure_sequence_routes;
