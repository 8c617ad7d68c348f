use std::io::{self, Write};

use headers::HeaderMapExt;
use http::Version;

use crate::body::Body;

pub(crate) fn write_response(res: http::Response<Body>, stream: &mut impl Write) -> io::Result<()> {
    let (mut parts, body) = res.into_parts();

    let version = match parts.version {
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_11 => "HTTP/1.1",
        _ => {
            return Err(io::Error::new(
                io::ErrorKind::Other,
                "unsupported http version",
            ))
        }
    };

    // Always frame the body, even though the connection closes right after
    parts
        .headers
        .typed_insert(headers::ContentLength(body.len() as u64));

    stream.write_all(format!("{version} {}\r\n", parts.status).as_bytes())?;

    for (name, val) in parts.headers.iter() {
        stream.write_all(format!("{name}: ").as_bytes())?;
        stream.write_all(val.as_bytes())?;
        stream.write_all(b"\r\n")?;
    }

    stream.write_all(b"\r\n")?;
    stream.write_all(body.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use http::{Response, StatusCode};

    #[test]
    fn writes_responses_without_bodies() {
        let res = Response::builder()
            .status(StatusCode::OK)
            .header("some", "header")
            .body(Body::empty())
            .unwrap();

        let mut output: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        write_response(res, &mut output).unwrap();

        assert_eq!(
            output.get_ref(),
            b"HTTP/1.1 200 OK\r\nsome: header\r\ncontent-length: 0\r\n\r\n"
        );
    }

    #[test]
    fn writes_responses_with_bodies() {
        let res = Response::builder()
            .status(StatusCode::OK)
            .body("lol".into())
            .unwrap();

        let mut output: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        write_response(res, &mut output).unwrap();

        assert_eq!(
            output.get_ref(),
            b"HTTP/1.1 200 OK\r\ncontent-length: 3\r\n\r\nlol"
        );
    }

    #[test]
    fn keeps_the_request_version() {
        let res = Response::builder()
            .status(StatusCode::NOT_IMPLEMENTED)
            .version(Version::HTTP_10)
            .body(Body::empty())
            .unwrap();

        let mut output: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        write_response(res, &mut output).unwrap();

        assert!(output
            .get_ref()
            .starts_with(b"HTTP/1.0 501 Not Implemented\r\n"));
    }

    #[test]
    fn refuses_http2_responses() {
        let res = Response::builder()
            .version(Version::HTTP_2)
            .body(Body::empty())
            .unwrap();

        let mut output: Cursor<Vec<u8>> = Cursor::new(Vec::new());

        assert!(write_response(res, &mut output).is_err());
        assert!(output.get_ref().is_empty());
    }
}
