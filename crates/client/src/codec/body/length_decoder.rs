//! Decoder implementation for HTTP messages with Content-Length header.
//!
//! This module provides functionality to decode HTTP messages where the payload size
//! is specified by the Content-Length header, as defined in
//! [RFC 7230 Section 3.3.2](https://tools.ietf.org/html/rfc7230#section-3.3.2).

use std::cmp;
use std::io;

use crate::codec::ContentDecoder;
use bytes::BytesMut;

/// A decoder for handling HTTP messages with a known content length.
///
/// The reactor feeds raw input with [`feed`](LengthDecoder::feed). Bytes past the
/// declared length are never handed out as body, they stay buffered for the next
/// message and can be recovered with [`into_remainder`](LengthDecoder::into_remainder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    /// The number of bytes remaining to be read from the payload
    length: u64,
    buffer: BytesMut,
}

impl LengthDecoder {
    /// Creates a new LengthDecoder instance.
    ///
    /// # Arguments
    /// * `length` - The total content length to decode, specified by Content-Length header
    pub fn new(length: u64) -> Self {
        Self { length, buffer: BytesMut::new() }
    }

    /// Creates a decoder with input that was already read past the response head
    pub fn with_buffer(length: u64, buffer: BytesMut) -> Self {
        Self { length, buffer }
    }

    pub fn feed(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Number of body bytes still expected
    pub fn remaining(&self) -> u64 {
        self.length
    }

    /// Returns the buffered input that does not belong to this body
    pub fn into_remainder(self) -> BytesMut {
        self.buffer
    }
}

impl ContentDecoder for LengthDecoder {
    fn read(&mut self, dst: &mut BytesMut) -> io::Result<usize> {
        if self.length == 0 || self.buffer.is_empty() {
            return Ok(0);
        }

        // Read the minimum of remaining length and available bytes
        let len = cmp::min(self.length, self.buffer.len() as u64) as usize;
        let bytes = self.buffer.split_to(len);
        dst.extend_from_slice(&bytes);

        self.length -= len as u64;
        Ok(len)
    }

    fn is_completed(&self) -> bool {
        self.length == 0
    }
}
