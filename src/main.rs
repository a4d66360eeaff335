//! cclo - cache the output of command lines
//!
//! cclo provides:
//! - Per-command JSON caches keyed by the full command line
//! - Live output while a command runs, captured for the next invocation
//! - A session lock so concurrent runs never corrupt a cache file

use anyhow::Result;
use clap::Parser;

mod cache;
mod cli;
mod controller;
mod core;
mod exec;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::run(cli)
}
