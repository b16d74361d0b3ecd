// Presentation layer - HTTP surface for one plot
pub mod app_state;
pub mod handlers;
pub mod snapshot_stream;
