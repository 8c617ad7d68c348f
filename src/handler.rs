use std::{
    io::{self, Stdout, Write},
    str::Utf8Error,
    time::SystemTime,
};

use headers::{HeaderMapExt, HeaderValue};
use http::{header, Method, Request, Response, StatusCode};
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    body::Body,
    payload::{self, StreamReading},
    request::{request_line, RawHeaders},
    App,
};

/// The fixed acknowledgement sent for every POST.
pub const SUCCESS_BODY: &str = r#"{ "result": "success" }"#;

const SERVER_NAME: &str = concat!("tilt-testserver/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("failed to write request dump")]
    Io(#[from] io::Error),
    #[error("request body is not valid utf-8")]
    InvalidUtf8(#[from] Utf8Error),
    #[error("failed to build response")]
    Http(#[from] http::Error),
}

/// Dumps every POST it receives to `out` and acknowledges it with
/// [`SUCCESS_BODY`], whatever the path, headers or body.
pub struct RequestLogger<W> {
    out: W,
}

impl RequestLogger<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> RequestLogger<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    /// Prints the request line and headers, then a blank line.
    fn dump_head(&mut self, req: &Request<Body>) -> io::Result<()> {
        let mut dump = request_line(req);
        dump.push('\n');

        let mut push_header = |name: &str, val: &[u8]| {
            dump.push_str(name);
            dump.push_str(": ");
            dump.push_str(&String::from_utf8_lossy(val));
            dump.push('\n');
        };

        match req.extensions().get::<RawHeaders>() {
            Some(RawHeaders(raw)) => raw
                .iter()
                .for_each(|(name, val)| push_header(name.as_str(), val.as_slice())),
            None => req
                .headers()
                .iter()
                .for_each(|(name, val)| push_header(name.as_str(), val.as_bytes())),
        }

        dump.push('\n');

        self.out.write_all(dump.as_bytes())?;
        self.out.flush()
    }

    fn dump_body(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    fn acknowledge(&mut self, req: Request<Body>) -> Result<Response<Body>, HandlerError> {
        // The head goes out first so a body that fails to decode still leaves
        // a trace of who sent it.
        self.dump_head(&req)?;
        let text = req.body().to_text()?;
        self.dump_body(text)?;

        match StreamReading::from_slice(req.body().as_bytes()) {
            Ok(reading) => info!(
                stream = payload::stream_id(req.uri().query()),
                name = %reading.name,
                temp = reading.temp,
                temp_unit = reading.temp_unit.as_deref(),
                gravity = reading.gravity,
                gravity_unit = reading.gravity_unit.as_deref(),
                battery = reading.battery,
                "received stream reading"
            ),
            Err(err) => debug!(error = %err, "body is not a stream reading"),
        }

        let res = base_response(StatusCode::OK)
            .header(header::CONTENT_TYPE, "text/html")
            .body(SUCCESS_BODY.into())?;

        Ok(res)
    }
}

impl<W: Write> App for RequestLogger<W> {
    type Error = HandlerError;

    fn handle(&mut self, req: Request<Body>) -> Result<Response<Body>, Self::Error> {
        if req.method() != Method::POST {
            debug!(method = %req.method(), "rejecting unsupported method");
            let message = format!("Unsupported method ('{}')", req.method());
            let res = base_response(StatusCode::NOT_IMPLEMENTED)
                .header(header::CONTENT_TYPE, "text/html;charset=utf-8")
                .body(error_page(StatusCode::NOT_IMPLEMENTED, &message).into())?;
            return Ok(res);
        }

        self.acknowledge(req)
    }
}

fn error_page(status: StatusCode, message: &str) -> String {
    let code = status.as_u16();
    let message = escape_html(message);
    let explain = match status {
        StatusCode::NOT_IMPLEMENTED => "Server does not support this operation",
        _ => status.canonical_reason().unwrap_or("Unknown"),
    };

    format!(
        "<!DOCTYPE HTML>\n\
         <html lang=\"en\">\n\
         \x20   <head>\n\
         \x20       <meta charset=\"utf-8\">\n\
         \x20       <title>Error response</title>\n\
         \x20   </head>\n\
         \x20   <body>\n\
         \x20       <h1>Error response</h1>\n\
         \x20       <p>Error code: {code}</p>\n\
         \x20       <p>Message: {message}.</p>\n\
         \x20       <p>Error code explanation: {code} - {explain}.</p>\n\
         \x20   </body>\n\
         </html>\n"
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn base_response(status: StatusCode) -> http::response::Builder {
    let mut builder = Response::builder()
        .status(status)
        .header(header::SERVER, HeaderValue::from_static(SERVER_NAME));

    if let Some(headers) = builder.headers_mut() {
        headers.typed_insert(headers::Date::from(SystemTime::now()));
    }

    builder
}

#[cfg(test)]
mod test {
    use indoc::indoc;

    use super::*;

    fn post(path: &str, body: impl Into<Body>) -> Request<Body> {
        let body = body.into();
        Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("host", "localhost:8000")
            .header("content-length", body.len())
            .body(body)
            .unwrap()
    }

    #[test]
    fn acknowledges_posts() {
        let mut app = RequestLogger::new(Vec::new());

        let res = app.handle(post("/anything", "hello")).unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CONTENT_TYPE], "text/html");
        assert!(res.headers().contains_key(header::DATE));
        assert_eq!(res.body().as_bytes(), SUCCESS_BODY.as_bytes());
    }

    #[test]
    fn dumps_request_line_headers_and_body() {
        let mut app = RequestLogger::new(Vec::new());

        app.handle(post("/anything", "hello")).unwrap();

        assert_eq!(
            String::from_utf8(app.into_inner()).unwrap(),
            indoc! {"
                POST /anything HTTP/1.1
                host: localhost:8000
                content-length: 5

                hello
            "}
        );
    }

    #[test]
    fn response_does_not_depend_on_the_request() {
        let mut app = RequestLogger::new(io::sink());

        let a = app.handle(post("/anything", "hello")).unwrap();
        let b = app
            .handle(post(
                "/stream?id=abc",
                r#"{ "name": "Tilt", "temp": 68.5, "gravity": 1.05 }"#,
            ))
            .unwrap();

        assert_eq!(a.status(), b.status());
        assert_eq!(
            a.headers()[header::CONTENT_TYPE],
            b.headers()[header::CONTENT_TYPE]
        );
        assert_eq!(a.into_body(), b.into_body());
    }

    #[test]
    fn rejects_other_methods_without_dumping() {
        let mut app = RequestLogger::new(Vec::new());
        let req = Request::builder()
            .method(Method::GET)
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let res = app.handle(req).unwrap();

        assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(
            res.headers()[header::CONTENT_TYPE],
            "text/html;charset=utf-8"
        );
        let page = res.body().to_text().unwrap();
        assert!(page.contains("<p>Error code: 501</p>"));
        assert!(page.contains("<p>Message: Unsupported method ('GET').</p>"));
        assert!(app.into_inner().is_empty());
    }

    #[test]
    fn dumps_header_names_as_they_arrived() {
        let mut app = RequestLogger::new(Vec::new());
        let mut wire = std::io::Cursor::new(
            "POST /stream?id=abc HTTP/1.1\r\nHost: log.brewfather.net\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}",
        );
        let req = crate::request::parse_request(&mut wire).unwrap();

        app.handle(req).unwrap();

        assert_eq!(
            String::from_utf8(app.into_inner()).unwrap(),
            indoc! {"
                POST /stream?id=abc HTTP/1.1
                Host: log.brewfather.net
                Content-Type: application/json
                Content-Length: 2

                {}
            "}
        );
    }

    #[test]
    fn dumps_the_head_before_failing_on_invalid_utf8_body() {
        let mut app = RequestLogger::new(Vec::new());

        let res = app.handle(post("/anything", vec![0xc3, 0x28]));

        assert!(matches!(res, Err(HandlerError::InvalidUtf8(_))));
        assert_eq!(
            String::from_utf8(app.into_inner()).unwrap(),
            indoc! {"
                POST /anything HTTP/1.1
                host: localhost:8000
                content-length: 2

            "}
        );
    }

    #[test]
    fn escapes_markup_in_error_pages() {
        let page = error_page(StatusCode::NOT_IMPLEMENTED, "<b>&</b>");

        assert!(page.contains("Message: &lt;b&gt;&amp;&lt;/b&gt;."));
        assert!(page.contains("501 - Server does not support this operation."));
    }
}
