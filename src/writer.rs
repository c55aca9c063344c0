//! Response state tracking.
//!
//! [`ResponseWriter`] sits between a handler's [`Response`] and the wire:
//!
//! - the first [`write_header`](ResponseWriter::write_header) commits status
//!   and headers; later calls are ignored
//! - body bytes are counted for the access log
//! - when the committed response is compressible and the client accepts it,
//!   the body sink is swapped for a gzip or deflate encoder, once, before the
//!   first body byte

use std::io::{self, Write};
use std::mem;

use bytes::buf::Writer;
use bytes::{BufMut, Bytes, BytesMut};
use flate2::Compression;
use flate2::write::{GzEncoder, ZlibEncoder};
use http::header::{self, HeaderMap, HeaderValue};
use http::{Method, StatusCode};
use http_body_util::Full;
use mime::Mime;
use tracing::debug;

use crate::response::Response;

/// A content coding the writer can produce.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Encoding {
    Gzip,
    Deflate,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gzip => "gzip",
            Self::Deflate => "deflate",
        }
    }

    /// Picks the preferred coding from an `Accept-Encoding` value: `gzip`
    /// first, then `deflate`. Codings listed with `q=0` are refused.
    pub fn negotiate(accept_encoding: &str) -> Option<Self> {
        let mut gzip = false;
        let mut deflate = false;

        for item in accept_encoding.split(',') {
            let mut parts = item.split(';');
            let coding = parts.next().unwrap_or_default().trim();
            let refused = parts.any(|p| {
                p.trim()
                    .strip_prefix("q=")
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .is_some_and(|q| q <= 0.0)
            });
            if refused {
                continue;
            }
            if coding.eq_ignore_ascii_case("gzip") || coding == "*" {
                gzip = true;
            } else if coding.eq_ignore_ascii_case("deflate") {
                deflate = true;
            }
        }

        if gzip {
            Some(Self::Gzip)
        } else if deflate {
            Some(Self::Deflate)
        } else {
            None
        }
    }
}

/// Returns `true` for the text-like families worth compressing: html, css,
/// javascript, json, xml, svg and the rest of `text/*`.
pub fn is_compressible(content_type: &Mime) -> bool {
    if content_type.type_() == mime::TEXT {
        return true;
    }
    if content_type.suffix().is_some_and(|s| s == mime::JSON || s == mime::XML) {
        return true;
    }
    match (content_type.type_(), content_type.subtype().as_str()) {
        (mime::APPLICATION, "json" | "javascript" | "xml" | "xhtml") => true,
        (mime::IMAGE, "svg") => true,
        _ => false,
    }
}

enum Sink {
    Plain(BytesMut),
    Gzip(GzEncoder<Writer<BytesMut>>),
    Deflate(ZlibEncoder<Writer<BytesMut>>),
}

impl Sink {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match self {
            Self::Plain(buf) => {
                buf.extend_from_slice(data);
                Ok(())
            }
            Self::Gzip(encoder) => encoder.write_all(data),
            Self::Deflate(encoder) => encoder.write_all(data),
        }
    }

    fn finish(self) -> io::Result<Bytes> {
        match self {
            Self::Plain(buf) => Ok(buf.freeze()),
            Self::Gzip(encoder) => Ok(encoder.finish()?.into_inner().freeze()),
            Self::Deflate(encoder) => Ok(encoder.finish()?.into_inner().freeze()),
        }
    }
}

/// Committed status line and headers.
struct Head {
    status: StatusCode,
    headers: HeaderMap,
}

/// Tracks the state of one outgoing response.
pub struct ResponseWriter {
    headers: HeaderMap,
    head: Option<Head>,
    sink: Sink,
    written: u64,
    accepted: Option<Encoding>,
    encoding: Option<Encoding>,
    discard: bool,
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl ResponseWriter {
    /// A writer that may compress with `accepted` when the response turns
    /// out to be compressible.
    pub fn new(accepted: Option<Encoding>) -> Self {
        Self {
            headers: HeaderMap::new(),
            head: None,
            sink: Sink::Plain(BytesMut::new()),
            written: 0,
            accepted,
            encoding: None,
            discard: false,
        }
    }

    /// A writer for a request with these `method` and `headers`.
    ///
    /// `HEAD` responses are counted but their body is dropped.
    pub fn for_request(method: &Method, headers: &HeaderMap, compression: bool) -> Self {
        let head_only = *method == Method::HEAD;
        let accepted = if compression && !head_only {
            headers
                .get(header::ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok())
                .and_then(Encoding::negotiate)
        } else {
            None
        };
        Self { discard: head_only, ..Self::new(accepted) }
    }

    /// Headers to send with [`write_header`](Self::write_header). Edits made
    /// after the header is committed are discarded.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Commits `status` and the current headers. Only the first call counts.
    pub fn write_header(&mut self, status: StatusCode) {
        if let Some(head) = &self.head {
            debug!(sent = %head.status, ignored = %status, "superfluous write_header");
            return;
        }

        let head = self.commit(status);
        self.head = Some(head);
    }

    /// Appends body bytes, committing `200 OK` first if nothing was committed.
    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        if self.head.is_none() {
            self.write_header(StatusCode::OK);
        }
        self.written += data.len() as u64;
        if self.discard {
            return Ok(());
        }
        self.sink.write(data)
    }

    /// Writes a whole [`Response`]: its headers, status and body.
    pub fn render(&mut self, response: Response) -> io::Result<()> {
        let Response { status, headers, body } = response;
        let mut last = None;
        for (name, value) in headers {
            // `None` means another value for the previous name.
            let name = match name {
                Some(name) => {
                    self.headers.remove(&name);
                    last = Some(name.clone());
                    name
                }
                None => match &last {
                    Some(name) => name.clone(),
                    None => continue,
                },
            };
            self.headers.append(name, value);
        }
        self.write_header(status);
        if body.is_empty() { Ok(()) } else { self.write(&body) }
    }

    pub fn is_committed(&self) -> bool {
        self.head.is_some()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.head.as_ref().map(|head| head.status)
    }

    /// Uncompressed body bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// The coding the body is being compressed with, if any.
    pub fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    /// Flushes the encoder and produces the final response.
    pub fn close(mut self) -> io::Result<http::Response<Full<Bytes>>> {
        let Head { status, mut headers } = match self.head.take() {
            Some(head) => head,
            None => self.commit(StatusCode::OK),
        };
        if self.discard && self.written > 0 && !headers.contains_key(header::CONTENT_LENGTH) {
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(self.written));
        }
        let body = self.sink.finish()?;

        let mut response = http::Response::new(Full::new(body));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }

    fn commit(&mut self, status: StatusCode) -> Head {
        let mut headers = mem::take(&mut self.headers);
        if let Some(encoding) = self.accepted.filter(|_| wants_compression(status, &headers)) {
            self.upgrade(encoding, &mut headers);
        }
        Head { status, headers }
    }

    fn upgrade(&mut self, encoding: Encoding, headers: &mut HeaderMap) {
        debug_assert_eq!(self.written, 0, "compression must start before the first byte");
        self.sink = match encoding {
            Encoding::Gzip => Sink::Gzip(GzEncoder::new(BytesMut::new().writer(), Compression::default())),
            Encoding::Deflate => Sink::Deflate(ZlibEncoder::new(BytesMut::new().writer(), Compression::default())),
        };
        self.encoding = Some(encoding);
        headers.remove(header::CONTENT_LENGTH);
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static(encoding.as_str()));
        headers.append(header::VARY, HeaderValue::from_static("accept-encoding"));
    }
}

fn wants_compression(status: StatusCode, headers: &HeaderMap) -> bool {
    if status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED {
        return false;
    }
    if headers.contains_key(header::CONTENT_ENCODING) {
        return false;
    }
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<Mime>().ok())
        .is_some_and(|mime| is_compressible(&mime))
}
