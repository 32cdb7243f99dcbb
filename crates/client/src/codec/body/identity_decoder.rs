use std::io;

use crate::codec::ContentDecoder;
use bytes::BytesMut;

/// A decoder for response bodies delimited by the peer closing the connection.
///
/// The body is complete once the reactor reported end of input with
/// [`mark_eof`](IdentityDecoder::mark_eof) and every buffered byte was read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityDecoder {
    buffer: BytesMut,
    eof: bool,
}

impl IdentityDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer: BytesMut) -> Self {
        Self { buffer, eof: false }
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn mark_eof(&mut self) {
        self.eof = true;
    }
}

impl ContentDecoder for IdentityDecoder {
    fn read(&mut self, dst: &mut BytesMut) -> io::Result<usize> {
        let len = self.buffer.len();
        dst.extend_from_slice(&self.buffer.split());
        Ok(len)
    }

    fn is_completed(&self) -> bool {
        self.eof && self.buffer.is_empty()
    }
}
