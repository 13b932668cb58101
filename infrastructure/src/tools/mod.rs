//! Tool adapters implementing the application layer's tool port

#[cfg(feature = "web-tools")]
pub mod web;
