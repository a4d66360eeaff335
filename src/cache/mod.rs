//! Cache module - Manages the per-command cache files
//!
//! Provides:
//! - codec: on-disk JSON encoding of a command store
//! - store: load / persist of one command's store
//! - lock: session lock shared by all cclo processes
//! - list: read-only listing of cached commands and runs

pub mod codec;
pub mod list;
pub mod lock;
pub mod store;
