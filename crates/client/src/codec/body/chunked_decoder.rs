//! Decoder for bodies using chunked transfer encoding.
//!
//! Each chunk is a hexadecimal size line followed by that many bytes and a CRLF.
//! A zero sized chunk ends the body, optionally followed by trailer fields and a
//! final empty line. See [RFC 9112 section 7.1](https://www.rfc-editor.org/rfc/rfc9112.html#name-chunked-transfer-coding).

use std::cmp;
use std::io;
use std::io::ErrorKind;

use bytes::{Buf, BytesMut};
use httparse::Status;
use tracing::trace;

use crate::codec::ContentDecoder;

const CRLF: &[u8] = b"\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    Size,
    Data(u64),
    DataEnd,
    Trailer,
    Done,
}

/// A decoder for chunked response bodies.
///
/// Chunk framing is stripped, only the chunk data is handed out. Input past the
/// end of the body stays buffered and can be recovered with
/// [`into_remainder`](ChunkedDecoder::into_remainder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    buffer: BytesMut,
    state: ChunkedState,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self::with_buffer(BytesMut::new())
    }

    pub fn with_buffer(buffer: BytesMut) -> Self {
        Self { buffer, state: ChunkedState::Size }
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    pub fn into_remainder(self) -> BytesMut {
        self.buffer
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentDecoder for ChunkedDecoder {
    fn read(&mut self, dst: &mut BytesMut) -> io::Result<usize> {
        let mut read = 0;
        loop {
            match self.state {
                ChunkedState::Size => match httparse::parse_chunk_size(&self.buffer) {
                    Ok(Status::Complete((consumed, size))) => {
                        trace!(size, "parsed chunk size");
                        self.buffer.advance(consumed);
                        self.state = if size == 0 { ChunkedState::Trailer } else { ChunkedState::Data(size) };
                    }
                    Ok(Status::Partial) => return Ok(read),
                    Err(_) => return Err(io::Error::new(ErrorKind::InvalidData, "invalid chunk size line")),
                },

                ChunkedState::Data(remaining) => {
                    if self.buffer.is_empty() {
                        return Ok(read);
                    }
                    let len = cmp::min(remaining, self.buffer.len() as u64) as usize;
                    dst.extend_from_slice(&self.buffer.split_to(len));
                    read += len;

                    let remaining = remaining - len as u64;
                    self.state = if remaining == 0 { ChunkedState::DataEnd } else { ChunkedState::Data(remaining) };
                }

                ChunkedState::DataEnd => {
                    if self.buffer.len() < CRLF.len() {
                        return Ok(read);
                    }
                    if !self.buffer.starts_with(CRLF) {
                        return Err(io::Error::new(ErrorKind::InvalidData, "chunk data not followed by CRLF"));
                    }
                    self.buffer.advance(CRLF.len());
                    self.state = ChunkedState::Size;
                }

                ChunkedState::Trailer => {
                    let Some(position) = self.buffer.windows(CRLF.len()).position(|window| window == CRLF) else {
                        return Ok(read);
                    };
                    // an empty line terminates the trailer section
                    if position == 0 {
                        self.state = ChunkedState::Done;
                    }
                    self.buffer.advance(position + CRLF.len());
                }

                ChunkedState::Done => return Ok(read),
            }
        }
    }

    fn is_completed(&self) -> bool {
        self.state == ChunkedState::Done
    }
}
