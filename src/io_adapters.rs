//! Writers the sandbox streams child output into.

use std::io::{self, Result as IoResult, Write};
use std::sync::{Arc, Mutex};

/// Destination for one of the child's output streams.
pub type Sink = Box<dyn Write + Send>;

/// Where streamed child output ends up.
pub struct OutputStreams {
    pub stdout: Sink,
    pub stderr: Sink,
}

impl OutputStreams {
    /// Forward to this process's own stdout and stderr.
    pub fn inherit() -> Self {
        Self {
            stdout: Box::new(io::stdout()),
            stderr: Box::new(io::stderr()),
        }
    }

    /// Capture both streams in memory.
    ///
    /// Returns the streams together with handles to read back what was written.
    pub fn captured() -> (Self, SharedBuffer, SharedBuffer) {
        let out = SharedBuffer::new();
        let err = SharedBuffer::new();
        let streams = Self {
            stdout: Box::new(out.clone()),
            stderr: Box::new(err.clone()),
        };
        (streams, out, err)
    }
}

impl Default for OutputStreams {
    fn default() -> Self {
        Self::inherit()
    }
}

/// Memory-backed writer that can be shared with reader threads.
///
/// Clones write into the same buffer.
#[derive(Clone, Default)]
pub struct SharedBuffer {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, decoded lossily.
    pub fn contents(&self) -> String {
        match self.buf.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf
            .lock()
            .map_err(|_| io::Error::other("output buffer lock poisoned"))?
            .extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_one_buffer() {
        let buffer = SharedBuffer::new();
        let mut writer = buffer.clone();
        write!(writer, "hello ").unwrap();
        writeln!(writer, "world").unwrap();
        assert_eq!(buffer.contents(), "hello world\n");
    }

    #[test]
    fn test_captured_streams_are_separate() {
        let (mut streams, out, err) = OutputStreams::captured();
        streams.stdout.write_all(b"to stdout").unwrap();
        streams.stderr.write_all(b"to stderr").unwrap();
        assert_eq!(out.contents(), "to stdout");
        assert_eq!(err.contents(), "to stderr");
    }

    #[test]
    fn test_writes_from_threads() {
        let buffer = SharedBuffer::new();
        std::thread::scope(|scope| {
            for _ in 0..4 {
                let mut writer = buffer.clone();
                scope.spawn(move || writer.write_all(b"x").unwrap());
            }
        });
        assert_eq!(buffer.contents(), "xxxx");
    }
}
