use std::io::{self, BufRead};

use headers::HeaderMapExt;
use http::{Method, Request, Version};
use thiserror::Error;

use crate::body::Body;

const MAX_HEADERS: usize = 64;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("connection closed")]
    ConnectionClosed,
    #[error("io error")]
    Io(#[from] io::Error),
    #[error("invalid request")]
    Invalid(#[from] httparse::Error),
    #[error("incomplete request")]
    IncompleteRequest,
    #[error("unsupported http version: {0}")]
    UnsupportedHttpVersion(u8),
    #[error("invalid header")]
    InvalidHeader(#[from] headers::Error),
    #[error("missing Content-Length header")]
    MissingContentLength,
    #[error("failed to parse http request")]
    Unknown,
}

/// Header names and values in the order and case they arrived on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct RawHeaders(pub(crate) Vec<(String, Vec<u8>)>);

/// Reads one request head plus its `Content-Length` body off `stream`.
pub(crate) fn parse_request(stream: &mut impl BufRead) -> Result<Request<Body>, ParseError> {
    let mut buf = Vec::with_capacity(800);

    loop {
        if stream.read_until(b'\n', &mut buf)? == 0 {
            break;
        }

        match buf.as_slice() {
            [.., b'\r', b'\n', b'\r', b'\n'] => break,
            [.., b'\n', b'\n'] => break,
            // Tolerate stray empty lines before the request line
            [b'\r', b'\n'] | [b'\n'] => buf.clear(),
            _ => continue,
        }
    }

    if buf.is_empty() {
        return Err(ParseError::ConnectionClosed);
    }

    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut req = httparse::Request::new(&mut headers);
    if req.parse(&buf)?.is_partial() {
        return Err(ParseError::IncompleteRequest);
    }

    let method = req
        .method
        .map(|method| method.as_bytes())
        .ok_or(ParseError::IncompleteRequest)?;

    let path = req.path.ok_or(ParseError::IncompleteRequest)?;

    let version = match req.version.ok_or(ParseError::IncompleteRequest)? {
        0 => Version::HTTP_10,
        1 => Version::HTTP_11,
        version => return Err(ParseError::UnsupportedHttpVersion(version)),
    };

    let method = Method::from_bytes(method).map_err(|_| ParseError::IncompleteRequest)?;

    let request = Request::builder()
        .method(method.clone())
        .uri(path)
        .version(version);

    let raw: Vec<_> = headers
        .into_iter()
        .take_while(|header| *header != httparse::EMPTY_HEADER)
        .map(|header| (header.name.to_string(), header.value.to_vec()))
        .collect();

    let request = raw
        .iter()
        .fold(request, |req, (name, value)| req.header(name.as_str(), value.as_slice()));
    let request = request.extension(RawHeaders(raw));

    let headers = request.headers_ref().ok_or(ParseError::Unknown)?;

    let body = match headers.typed_try_get::<headers::ContentLength>()? {
        Some(len) => Body::read_exact(stream, len.0)?,
        None if method == Method::POST => return Err(ParseError::MissingContentLength),
        None => Body::empty(),
    };

    request.body(body).map_err(|_| ParseError::Unknown)
}

/// Renders the request line the way it appeared on the wire.
pub(crate) fn request_line<B>(req: &Request<B>) -> String {
    format!("{} {} {:?}", req.method(), req.uri(), req.version())
}
