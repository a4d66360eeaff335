//! Execution tee - run a command while capturing its standard output
//!
//! Provides:
//! - tee: a writer duplicating output into two sinks
//! - process: the `std::process` backed executor

pub mod process;
pub mod tee;

use std::io::Write;

use crate::core::error::CacheResult;
use crate::core::model::Invocation;

pub use process::ProcessTee;

/// Where the child's standard error goes. It is never captured for caching.
pub enum StderrSink<'a> {
    /// Share the parent's stderr
    Inherit,
    Null,
    /// Pump into a caller-provided writer
    #[allow(dead_code)]
    Writer(&'a mut (dyn Write + Send)),
}

/// What the child reads on standard input
#[derive(Debug, Clone, Copy)]
pub enum StdinSource<'a> {
    /// Share the parent's stdin
    Inherit,
    Null,
    #[allow(dead_code)]
    Bytes(&'a [u8]),
}

/// The three standard streams wired into one run
pub struct Streams<'a> {
    /// Receives stdout live, and cached payloads on a hit
    pub stdout: &'a mut dyn Write,
    pub stderr: StderrSink<'a>,
    pub stdin: StdinSource<'a>,
}

impl<'a> Streams<'a> {
    /// Live stdout into `stdout`, stderr and stdin shared with the parent
    pub fn inherit(stdout: &'a mut dyn Write) -> Self {
        Self {
            stdout,
            stderr: StderrSink::Inherit,
            stdin: StdinSource::Inherit,
        }
    }

    /// Stdout into `stdout`, nothing on stdin, stderr discarded
    #[allow(dead_code)]
    pub fn detached(stdout: &'a mut dyn Write) -> Self {
        Self {
            stdout,
            stderr: StderrSink::Null,
            stdin: StdinSource::Null,
        }
    }

    #[allow(dead_code)]
    pub fn with_stderr(mut self, stderr: StderrSink<'a>) -> Self {
        self.stderr = stderr;
        self
    }

    #[allow(dead_code)]
    pub fn with_stdin(mut self, stdin: StdinSource<'a>) -> Self {
        self.stdin = stdin;
        self
    }
}

/// Runs an invocation, streaming stdout to `streams.stdout` and returning a
/// copy of everything written there.
///
/// Failure to start, a non-zero or abnormal exit, or a broken relay is an
/// `Execution` error; the captured bytes are discarded in that case.
pub trait Executor {
    fn run(&self, invocation: &Invocation, streams: &mut Streams<'_>) -> CacheResult<Vec<u8>>;
}
