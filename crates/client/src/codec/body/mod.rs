//! Body framing codecs
//!
//! Encoders buffer framed output which the reactor drains with `take_output` and
//! writes to the socket. Decoders are fed raw input bytes by the reactor and hand
//! out body bytes through [`ContentDecoder::read`](super::ContentDecoder::read).

mod chunked_decoder;
mod chunked_encoder;
mod identity_decoder;
mod length_decoder;
mod length_encoder;

pub use chunked_decoder::ChunkedDecoder;
pub use chunked_encoder::ChunkedEncoder;
pub use identity_decoder::IdentityDecoder;
pub use length_decoder::LengthDecoder;
pub use length_encoder::LengthEncoder;
