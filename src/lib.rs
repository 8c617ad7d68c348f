//! A single-threaded HTTP fixture that dumps every POST it receives and
//! acknowledges it with a fixed JSON payload.
//!
//! ```no_run
//! use tilt_testserver::{RequestLogger, Server, DEFAULT_ADDR};
//!
//! fn main() -> std::io::Result<()> {
//!     Server::bind(DEFAULT_ADDR)?.serve(RequestLogger::stdout())
//! }
//! ```

mod body;
mod handler;
pub mod logging;
pub mod payload;
mod request;
mod response;
pub mod server;

use std::{
    error::Error,
    io::{self, BufRead, Write},
};

pub use body::Body;
pub use handler::{HandlerError, RequestLogger, SUCCESS_BODY};
use headers::HeaderValue;
pub use http::{header, Method, Request, Response, StatusCode, Uri, Version};
pub use request::ParseError;
pub use server::{Server, ServerBuilder, DEFAULT_ADDR};
use tracing::debug;

/// Maps [`Request`]s to [`Response`]s.
///
/// Requests are handled one at a time, so handlers get exclusive access to
/// their own state. Closures work out of the box:
///
/// ```no_run
/// # use std::convert::Infallible;
/// # use tilt_testserver::{Body, Request, Response, Server, StatusCode};
/// fn main() -> std::io::Result<()> {
///     let mut counter = 0;
///     Server::bind("0.0.0.0:8000")?.serve(|_req: Request<Body>| {
///         counter += 1;
///         Response::builder()
///             .status(StatusCode::OK)
///             .body(Body::from(format!("Request count: {counter}")))
///     })
/// }
/// ```
pub trait App {
    type Error: Into<Box<dyn Error + Send + Sync>>;

    fn handle(&mut self, request: Request<Body>) -> Result<Response<Body>, Self::Error>;
}

impl<F, Err> App for F
where
    F: FnMut(Request<Body>) -> Result<Response<Body>, Err>,
    Err: Into<Box<dyn Error + Send + Sync>>,
{
    type Error = Err;

    fn handle(&mut self, request: Request<Body>) -> Result<Response<Body>, Self::Error> {
        self(request)
    }
}

/// Serves a single request off a connection, then lets it close.
///
/// Every response is `HTTP/1.1` with `connection: close`, whatever the
/// request asked for, so one idle client can't hold the accept loop.
pub(crate) fn serve<R, W, A>(reader: &mut R, writer: &mut W, app: &mut A) -> io::Result<()>
where
    R: BufRead,
    W: Write,
    A: App,
{
    let req = match request::parse_request(reader) {
        Ok(req) => req,
        Err(ParseError::ConnectionClosed) => {
            debug!("peer closed the connection");
            return Ok(());
        }
        Err(err) => return Err(io::Error::new(io::ErrorKind::InvalidData, err)),
    };

    let mut res = app
        .handle(req)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

    *res.version_mut() = Version::HTTP_11;
    res.headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));

    response::write_response(res, writer)?;
    writer.flush()
}
