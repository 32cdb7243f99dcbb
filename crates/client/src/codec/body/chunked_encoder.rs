use crate::codec::ContentEncoder;
use bytes::{BufMut, BytesMut};
use std::io;
use std::io::{ErrorKind, Write};

/// Encoder for request bodies using chunked transfer encoding.
///
/// Every non-empty write becomes one chunk, [`complete`](ContentEncoder::complete)
/// writes the terminating zero-sized chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedEncoder {
    eof: bool,
    buffer: BytesMut,
}

impl ChunkedEncoder {
    pub fn new() -> Self {
        Self { eof: false, buffer: BytesMut::new() }
    }

    /// Takes the framed bytes written so far, ready to be sent to the socket
    pub fn take_output(&mut self) -> BytesMut {
        self.buffer.split()
    }
}

impl Default for ChunkedEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentEncoder for ChunkedEncoder {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        if self.eof {
            return Err(io::Error::new(ErrorKind::InvalidInput, "content already completed"));
        }

        // a zero-sized chunk would terminate the body
        if src.is_empty() {
            return Ok(0);
        }

        write!(helper::Writer(&mut self.buffer), "{:X}\r\n", src.len())?;
        self.buffer.reserve(src.len() + 2);
        self.buffer.put_slice(src);
        self.buffer.put_slice(b"\r\n");
        Ok(src.len())
    }

    fn complete(&mut self) -> io::Result<()> {
        if !self.eof {
            self.eof = true;
            self.buffer.put_slice(b"0\r\n\r\n");
        }
        Ok(())
    }

    fn is_completed(&self) -> bool {
        self.eof
    }
}

mod helper {
    use bytes::{BufMut, BytesMut};
    use std::io;

    pub struct Writer<'a>(pub &'a mut BytesMut);

    impl io::Write for Writer<'_> {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.put_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
