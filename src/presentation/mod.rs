// Presentation layer - HTTP surface for panels and the push channel
pub mod app_state;
pub mod handlers;
pub mod stream;
