//! # Middleware Modules
//!
//! Tower middleware layers for the validator service.

pub mod metrics;
