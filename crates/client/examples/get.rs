//! Sends one GET request and prints the response.
//!
//! ```shell
//! cargo run --example get -- 127.0.0.1:8080 /
//! ```
//!
//! The tokio stream plays the part of the I/O reactor: it drives the exchange
//! handler callbacks as the request is written and the response is read.

use std::env;
use std::error::Error;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::{Bytes, BytesMut};
use http::{Method, Request, Response, header};
use micro_client::codec::{
    ChunkedDecoder, ContentDecoder, ContentEncoder, IdentityDecoder, LengthDecoder, LengthEncoder, RequestHeadEncoder,
    ResponseHeadDecoder,
};
use micro_client::connection::ClientConnection;
use micro_client::context::HttpContext;
use micro_client::exchange::{BasicRequestProducer, BasicResponseConsumer, ExchangeHandler};
use micro_client::processor::ProcessorChain;
use micro_client::protocol::{ExchangeError, PayloadSize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{Level, error, info, trace};
use tracing_subscriber::FmtSubscriber;

const READ_BUFFER_SIZE: usize = 8 * 1024;

#[derive(Debug)]
struct TcpConnection {
    open: AtomicBool,
}

impl TcpConnection {
    fn new() -> Self {
        Self { open: AtomicBool::new(true) }
    }
}

impl ClientConnection for TcpConnection {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn request_input(&self) {
        trace!("input requested");
    }

    fn suspend_input(&self) {
        trace!("input suspended");
    }

    fn request_output(&self) {
        trace!("output requested");
    }

    fn suspend_output(&self) {
        trace!("output suspended");
    }

    fn close(&self) -> io::Result<()> {
        self.open.store(false, Ordering::Release);
        Ok(())
    }

    fn shutdown(&self) -> io::Result<()> {
        self.close()
    }
}

enum BodyDecoder {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    Identity(IdentityDecoder),
}

impl BodyDecoder {
    fn new(payload_size: PayloadSize, input: BytesMut) -> Option<Self> {
        match payload_size {
            PayloadSize::Length(length) => Some(BodyDecoder::Length(LengthDecoder::with_buffer(length, input))),
            PayloadSize::Chunked => Some(BodyDecoder::Chunked(ChunkedDecoder::with_buffer(input))),
            PayloadSize::Unbounded => Some(BodyDecoder::Identity(IdentityDecoder::with_buffer(input))),
            PayloadSize::Empty => None,
        }
    }

    fn feed(&mut self, data: &[u8]) {
        match self {
            BodyDecoder::Length(decoder) => decoder.feed(data),
            BodyDecoder::Chunked(decoder) => decoder.feed(data),
            BodyDecoder::Identity(decoder) => decoder.feed(data),
        }
    }

    /// Returns false if the body can't end with the input
    fn mark_eof(&mut self) -> bool {
        match self {
            BodyDecoder::Identity(decoder) => {
                decoder.mark_eof();
                true
            }
            _ => false,
        }
    }

    fn as_content_decoder(&mut self) -> &mut dyn ContentDecoder {
        match self {
            BodyDecoder::Length(decoder) => decoder,
            BodyDecoder::Chunked(decoder) => decoder,
            BodyDecoder::Identity(decoder) => decoder,
        }
    }
}

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::DEBUG).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let address = env::args().nth(1).unwrap_or_else(|| "127.0.0.1:8080".to_string());
    let path = env::args().nth(2).unwrap_or_else(|| "/".to_string());

    match get(&address, &path).await {
        Ok(response) => {
            info!(status = %response.status(), headers = ?response.headers(), "exchange completed");
            info!(body = %String::from_utf8_lossy(response.body()), "response body");
        }
        Err(e) => error!(cause = %e, "exchange failed"),
    }
}

async fn get(address: &str, path: &str) -> Result<Response<Bytes>, Box<dyn Error + Send + Sync>> {
    let mut stream = TcpStream::connect(address).await?;
    info!(address, "connected");

    let connection = Arc::new(TcpConnection::new());
    let request = Request::get(format!("http://{address}{path}")).header(header::ACCEPT, "*/*").body(())?;

    let mut handler = ExchangeHandler::builder()
        .producer(BasicRequestProducer::from_head(request))
        .consumer(BasicResponseConsumer::new().with_max_body_size(16 * 1024 * 1024))
        .context(HttpContext::new())
        .connection(Arc::clone(&connection) as Arc<dyn ClientConnection>)
        .processor(Arc::new(ProcessorChain::standard()))
        .build()?;
    let future = handler.future();

    if let Err(e) = drive(&mut handler, &mut stream, connection.as_ref()).await {
        handler.failed(e)?;
    }

    if !handler.keep_alive() {
        connection.close()?;
        stream.shutdown().await?;
    }
    Ok(future.await?)
}

async fn drive(
    handler: &mut ExchangeHandler<Response<Bytes>>,
    stream: &mut TcpStream,
    connection: &dyn ClientConnection,
) -> Result<(), ExchangeError> {
    let request = handler.generate_request()?;
    let method: Method = request.method().clone();
    let payload_size = PayloadSize::from_headers(request.headers())?;

    let mut output = BytesMut::new();
    RequestHeadEncoder.encode((request, payload_size), &mut output)?;
    if let PayloadSize::Length(length) = payload_size {
        let mut encoder = LengthEncoder::new(length);
        while !encoder.is_completed() {
            handler.produce_content(&mut encoder, connection)?;
            output.extend_from_slice(&encoder.take_output());
        }
    }
    stream.write_all(&output).await?;
    handler.request_completed()?;

    let mut input = BytesMut::with_capacity(READ_BUFFER_SIZE);
    let mut head_decoder = ResponseHeadDecoder::new(method);
    let (head, payload_size) = loop {
        if let Some(decoded) = head_decoder.decode(&mut input)? {
            break decoded;
        }
        if stream.read_buf(&mut input).await? == 0 {
            return handler.input_terminated();
        }
    };
    handler.response_received(head)?;

    if let Some(mut decoder) = BodyDecoder::new(payload_size, input) {
        let mut chunk = BytesMut::with_capacity(READ_BUFFER_SIZE);
        loop {
            handler.consume_content(decoder.as_content_decoder(), connection)?;
            if decoder.as_content_decoder().is_completed() {
                break;
            }

            chunk.clear();
            if stream.read_buf(&mut chunk).await? == 0 {
                if !decoder.mark_eof() {
                    return handler.input_terminated();
                }
            } else {
                decoder.feed(&chunk);
            }
        }
    }

    handler.response_completed()
}
