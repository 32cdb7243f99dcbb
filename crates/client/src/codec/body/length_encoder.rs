use crate::codec::ContentEncoder;
use bytes::BytesMut;
use std::cmp;
use std::io;
use std::io::ErrorKind;
use tracing::warn;

/// Encoder for request bodies delimited by a `Content-Length` header.
///
/// Bytes beyond the declared length are refused, and completing before the
/// declared length was written is an error since the peer would wait forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    remaining: u64,
    buffer: BytesMut,
    completed: bool,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length, buffer: BytesMut::new(), completed: false }
    }

    /// Number of body bytes still expected
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Takes the framed bytes written so far, ready to be sent to the socket
    pub fn take_output(&mut self) -> BytesMut {
        self.buffer.split()
    }
}

impl ContentEncoder for LengthEncoder {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        if self.completed {
            return Err(io::Error::new(ErrorKind::InvalidInput, "content already completed"));
        }

        if self.remaining == 0 {
            warn!("encode payload but no need to encode anymore");
            return Ok(0);
        }

        let len = cmp::min(self.remaining, src.len() as u64) as usize;
        self.buffer.extend_from_slice(&src[..len]);
        self.remaining -= len as u64;
        Ok(len)
    }

    fn complete(&mut self) -> io::Result<()> {
        if self.remaining > 0 {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!("content-length mismatch, {} bytes not written", self.remaining),
            ));
        }
        self.completed = true;
        Ok(())
    }

    fn is_completed(&self) -> bool {
        self.completed
    }
}
