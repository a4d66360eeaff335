//! Duplicating writer

use std::io::{self, Write};

/// Forwards every write to two sinks.
///
/// The primary sink decides how many bytes are accepted; exactly that prefix is
/// then written in full to the secondary sink, so both see the same stream.
pub struct TeeWriter<A, B> {
    primary: A,
    secondary: B,
}

impl<A: Write, B: Write> TeeWriter<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }

    #[allow(dead_code)]
    pub fn into_inner(self) -> (A, B) {
        (self.primary, self.secondary)
    }
}

impl<A: Write, B: Write> Write for TeeWriter<A, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.primary.write(buf)?;
        self.secondary.write_all(&buf[..n])?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.primary.flush()?;
        self.secondary.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Accepts at most `limit` bytes per call
    struct Trickle {
        data: Vec<u8>,
        limit: usize,
    }

    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = buf.len().min(self.limit);
            self.data.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_both_sinks_receive_output() {
        let mut live = Vec::new();
        let mut captured = Vec::new();
        {
            let mut tee = TeeWriter::new(&mut live, &mut captured);
            tee.write_all(b"hello ").unwrap();
            tee.write_all(b"world\n").unwrap();
            tee.flush().unwrap();
        }
        assert_eq!(live, b"hello world\n");
        assert_eq!(captured, b"hello world\n");
    }

    #[test]
    fn test_partial_primary_writes_stay_in_step() {
        let primary = Trickle {
            data: Vec::new(),
            limit: 3,
        };
        let mut tee = TeeWriter::new(primary, Vec::new());
        tee.write_all(b"abcdefgh").unwrap();

        let (primary, captured) = tee.into_inner();
        assert_eq!(primary.data, b"abcdefgh");
        assert_eq!(captured, b"abcdefgh");
    }

    #[test]
    fn test_primary_error_is_propagated() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut captured = Vec::new();
        let mut tee = TeeWriter::new(Broken, &mut captured);
        assert!(tee.write_all(b"x").is_err());
        assert!(captured.is_empty());
    }
}
