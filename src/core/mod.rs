//! Core module - Shared types and configuration
//!
//! Provides:
//! - model: invocations, keys, records and stores
//! - config: cache directory and key scheme
//! - error: error taxonomy
//! - logging: stderr diagnostics

pub mod config;
pub mod error;
pub mod logging;
pub mod model;
