//! ConectIA delay estimation service
//!
//! Serves the estimation engine over HTTP and adapts third-party weather and
//! flight-status APIs to the engine's lookup traits.

pub mod api;
pub mod clients;
pub mod config;
