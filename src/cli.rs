//! CLI module - Command-line interface definitions and handlers

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::cache::list::{list_command_names, list_entries};
use crate::controller::Controller;
use crate::core::config::CacheConfig;
use crate::core::logging::{init_logging, LogLevel};
use crate::core::model::{EntrySummary, KeyScheme};
use crate::exec::Streams;

/// cclo - cache the output of a command line.
#[derive(Parser, Debug)]
#[command(name = "cclo")]
#[command(
    author,
    version,
    about,
    long_about = r#"cclo runs COMMAND once, stores its standard output, and replays the stored
output on every later invocation with exactly the same arguments.

Only stdout is cached. Stderr is passed through and a failing command is never
cached. Caches live under the user cache directory (e.g. ~/.cache/cclo), one
JSON file per command name.

Examples:
    cclo date; sleep 1; cclo date    # prints the same time twice
    cclo -f date                     # ignore the cache and run again
    cclo --list                      # list cached command names
    cclo --list date                 # list cached runs of date
"#
)]
pub struct Cli {
    /// Ignore the cache and run the command again.
    #[arg(
        short,
        long,
        long_help = "Always run COMMAND, even when a cached output exists.\n\n\
The new output replaces the cached one when the command succeeds."
    )]
    pub force: bool,

    /// List cached command names, or the cached runs of COMMAND.
    #[arg(
        short,
        long,
        long_help = "Without COMMAND, print every command name that has a cache.\n\
With COMMAND, print one line per cached run: creation time and arguments."
    )]
    pub list: bool,

    /// Listing format (text/json).
    #[arg(
        long,
        default_value = "text",
        value_name = "FORMAT",
        value_parser = ["text", "json"]
    )]
    pub format: String,

    /// Cache directory.
    #[arg(
        long,
        env = "CCLO_CACHE_DIR",
        value_name = "DIR",
        long_help = "Directory holding cache files and the session lock.\n\n\
Defaults to the platform user cache directory joined with \"cclo\"\n\
(for example $XDG_CACHE_HOME/cclo or ~/.cache/cclo)."
    )]
    pub cache_dir: Option<PathBuf>,

    /// Key entries by the exact argument list instead of the space-joined line.
    #[arg(
        long,
        env = "CCLO_STRUCTURED_KEYS",
        long_help = "By default the cache key is the command line joined with single spaces,\n\
so `echo \"a b\"` and `echo a b` share one entry. With this flag the key keeps\n\
argument boundaries. Entries stored under one scheme are not found by the other."
    )]
    pub structured_keys: bool,

    /// Diagnostic log level (overrides CCLO_LOG).
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Command to run (or command name to list) and its arguments.
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub command: Vec<String>,
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    init_logging(cli.log_level)?;

    if !cli.list && cli.command.is_empty() {
        bail!("command not specified (see --help)");
    }

    let key_scheme = if cli.structured_keys {
        KeyScheme::Structured
    } else {
        KeyScheme::Joined
    };
    let config = CacheConfig::resolve(cli.cache_dir.as_deref())
        .context("Failed to prepare cache directory")?
        .with_key_scheme(key_scheme);

    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.list {
        return match cli.command.as_slice() {
            [] => run_list_names(&config, &mut out),
            [name] => run_list_entries(&config, name, &cli.format, &mut out),
            _ => bail!("too many arguments for --list"),
        };
    }

    let controller = Controller::system(config);
    let mut streams = Streams::inherit(&mut out);
    controller.run_cached(&cli.command, cli.force, &mut streams)?;
    Ok(())
}

fn run_list_names(config: &CacheConfig, out: &mut impl Write) -> Result<()> {
    for name in list_command_names(config)? {
        writeln!(out, "{}", name)?;
    }
    Ok(())
}

fn run_list_entries(
    config: &CacheConfig,
    name: &str,
    format: &str,
    out: &mut impl Write,
) -> Result<()> {
    let entries = list_entries(config, name)?;
    match format {
        "json" => {
            serde_json::to_writer_pretty(&mut *out, &entries)?;
            writeln!(out)?;
        }
        _ => {
            for entry in &entries {
                writeln!(out, "{}", render_entry(entry))?;
            }
        }
    }
    Ok(())
}

/// `2024-03-09T12:30:00Z: ["echo", "hi"]`
fn render_entry(entry: &EntrySummary) -> String {
    format!("{}: {:?}", entry.date.to_rfc3339(), entry.args)
}
