//! Child process executor backed by `std::process`

use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread;

use tracing::{debug, warn};

use crate::core::error::{CacheError, CacheResult, ExecutionFailure};
use crate::core::model::Invocation;
use crate::exec::tee::TeeWriter;
use crate::exec::{Executor, StderrSink, StdinSource, Streams};

const RELAY_BUF_SIZE: usize = 8 * 1024;

/// Spawns the invocation directly (no shell) and tees its stdout
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessTee;

impl ProcessTee {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for ProcessTee {
    fn run(&self, invocation: &Invocation, streams: &mut Streams<'_>) -> CacheResult<Vec<u8>> {
        let program = invocation.program();
        let fail = |cause| CacheError::execution(program, cause);

        let mut command = Command::new(program);
        command
            .args(invocation.args())
            .stdout(Stdio::piped())
            .stdin(match streams.stdin {
                StdinSource::Inherit => Stdio::inherit(),
                StdinSource::Null => Stdio::null(),
                StdinSource::Bytes(_) => Stdio::piped(),
            })
            .stderr(match streams.stderr {
                StderrSink::Inherit => Stdio::inherit(),
                StderrSink::Null => Stdio::null(),
                StderrSink::Writer(_) => Stdio::piped(),
            });

        debug!(program, args = ?invocation.args(), "spawning command");
        let mut child = command
            .spawn()
            .map_err(|e| fail(ExecutionFailure::Spawn(e)))?;

        let mut captured = Vec::new();
        let relayed = relay_streams(&mut child, streams, &mut captured);

        let status = child
            .wait()
            .map_err(|e| fail(ExecutionFailure::Stream(e)))?;
        debug!(program, status = %status, bytes = captured.len(), "command finished");

        relayed.map_err(|e| fail(ExecutionFailure::Stream(e)))?;
        if !status.success() {
            return Err(fail(ExecutionFailure::Exit {
                code: status.code(),
            }));
        }

        Ok(captured)
    }
}

/// Pump stdin and stderr on scoped threads while stdout is teed on this one
fn relay_streams(
    child: &mut Child,
    streams: &mut Streams<'_>,
    captured: &mut Vec<u8>,
) -> io::Result<()> {
    let child_stdin = child.stdin.take();
    let child_stdout = child.stdout.take();
    let child_stderr = child.stderr.take();
    let stdin = streams.stdin;

    thread::scope(|scope| {
        if let (Some(mut pipe), StdinSource::Bytes(bytes)) = (child_stdin, stdin) {
            scope.spawn(move || {
                // The child may exit without reading everything
                if let Err(e) = pipe.write_all(bytes) {
                    if e.kind() != io::ErrorKind::BrokenPipe {
                        warn!(error = %e, "failed to feed stdin");
                    }
                }
            });
        }

        let stderr_pump = match (child_stderr, &mut streams.stderr) {
            (Some(mut pipe), StderrSink::Writer(sink)) => {
                let sink: &mut (dyn Write + Send) = &mut **sink;
                Some(scope.spawn(move || {
                    io::copy(&mut pipe, sink)?;
                    sink.flush()
                }))
            }
            _ => None,
        };

        let stdout_result = match child_stdout {
            Some(mut pipe) => {
                let mut tee = TeeWriter::new(&mut *streams.stdout, &mut *captured);
                relay(&mut pipe, &mut tee)
            }
            None => Ok(()),
        };
        if stdout_result.is_err() {
            // Nobody drains stdout anymore; stop the child before joining
            let _ = child.kill();
        }

        let stderr_result = match stderr_pump {
            Some(handle) => handle
                .join()
                .unwrap_or_else(|_| Err(io::Error::other("stderr relay panicked"))),
            None => Ok(()),
        };

        stdout_result.and(stderr_result)
    })
}

/// Copy chunk by chunk, flushing each one so output shows up live
fn relay(source: &mut impl Read, sink: &mut impl Write) -> io::Result<()> {
    let mut buf = [0u8; RELAY_BUF_SIZE];
    loop {
        let n = match source.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        sink.write_all(&buf[..n])?;
        sink.flush()?;
    }
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn inv(elements: &[&str]) -> Invocation {
        Invocation::new(elements.iter().copied()).unwrap()
    }

    #[test]
    fn test_stdout_is_teed() {
        let mut live = Vec::new();
        let mut streams = Streams::detached(&mut live);

        let captured = ProcessTee::new()
            .run(&inv(&["echo", "hi"]), &mut streams)
            .unwrap();
        assert_eq!(captured, b"hi\n");
        assert_eq!(live, b"hi\n");
    }

    #[test]
    fn test_stderr_forwarded_not_captured() {
        let mut live = Vec::new();
        let mut errors = Vec::new();
        let mut streams =
            Streams::detached(&mut live).with_stderr(StderrSink::Writer(&mut errors));

        let captured = ProcessTee::new()
            .run(
                &inv(&["sh", "-c", "printf out; printf err >&2"]),
                &mut streams,
            )
            .unwrap();
        assert_eq!(captured, b"out");
        assert_eq!(live, b"out");
        assert_eq!(errors, b"err");
    }

    #[test]
    fn test_stdin_forwarded() {
        let mut live = Vec::new();
        let input = b"line one\nline two\n";
        let mut streams = Streams::detached(&mut live).with_stdin(StdinSource::Bytes(input));

        let captured = ProcessTee::new()
            .run(&inv(&["cat"]), &mut streams)
            .unwrap();
        assert_eq!(captured, input);
    }

    #[test]
    fn test_unread_stdin_does_not_fail() {
        let mut live = Vec::new();
        let input = vec![b'x'; 1 << 20];
        let mut streams = Streams::detached(&mut live).with_stdin(StdinSource::Bytes(&input));

        let captured = ProcessTee::new()
            .run(&inv(&["true"]), &mut streams)
            .unwrap();
        assert!(captured.is_empty());
    }

    #[test]
    fn test_binary_output_captured_verbatim() {
        let mut live = Vec::new();
        let mut streams = Streams::detached(&mut live);

        let captured = ProcessTee::new()
            .run(&inv(&["printf", "\\000\\377\\033"]), &mut streams)
            .unwrap();
        assert_eq!(captured, vec![0x00, 0xff, 0x1b]);
    }

    #[test]
    fn test_missing_executable_is_spawn_error() {
        let mut live = Vec::new();
        let mut streams = Streams::detached(&mut live);

        let err = ProcessTee::new()
            .run(&inv(&["/nonexistent/cclo-test-binary"]), &mut streams)
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::Execution {
                cause: ExecutionFailure::Spawn(_),
                ..
            }
        ));
    }

    #[test]
    fn test_nonzero_exit_is_exit_error() {
        let mut live = Vec::new();
        let mut streams = Streams::detached(&mut live);

        let err = ProcessTee::new()
            .run(&inv(&["sh", "-c", "printf partial; exit 3"]), &mut streams)
            .unwrap_err();
        match err {
            CacheError::Execution {
                program,
                cause: ExecutionFailure::Exit { code },
            } => {
                assert_eq!(program, "sh");
                assert_eq!(code, Some(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // Live output still reached the caller
        assert_eq!(live, b"partial");
    }

    #[test]
    fn test_signal_exit_has_no_code() {
        let mut live = Vec::new();
        let mut streams = Streams::detached(&mut live);

        let err = ProcessTee::new()
            .run(&inv(&["sh", "-c", "kill -9 $$"]), &mut streams)
            .unwrap_err();
        assert!(matches!(
            err,
            CacheError::Execution {
                cause: ExecutionFailure::Exit { code: None },
                ..
            }
        ));
    }
}
