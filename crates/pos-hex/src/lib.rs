//! pos-hex: order lifecycle services plus the inbound HTTP adapter.

pub mod config;
pub mod errors;

pub mod application;

pub use pos_types::{domain, ports};

pub mod inbound; // HTTP adapter (server + handlers)
