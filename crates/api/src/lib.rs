//! HTTP API crate: router, handlers, wiring.

pub mod app;
pub mod config;
