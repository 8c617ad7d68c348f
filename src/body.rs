use std::{
    io::{self, Read},
    str::{self, Utf8Error},
};

/// A fully buffered HTTP message body.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Body(Vec<u8>);

impl Body {
    pub fn empty() -> Self {
        Body(Vec::new())
    }

    /// Reads exactly `length` bytes off `reader`.
    ///
    /// The buffer only grows as bytes arrive, so a bogus length from the peer
    /// ends in `UnexpectedEof` rather than a huge allocation.
    pub fn read_exact(reader: &mut impl Read, length: u64) -> io::Result<Self> {
        let mut buf = Vec::new();
        reader.take(length).read_to_end(&mut buf)?;

        if (buf.len() as u64) < length {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "body shorter than content-length",
            ));
        }

        Ok(Body(buf))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// Decodes the body as UTF-8, failing on any invalid sequence.
    pub fn to_text(&self) -> Result<&str, Utf8Error> {
        str::from_utf8(&self.0)
    }
}

impl From<Vec<u8>> for Body {
    fn from(body: Vec<u8>) -> Self {
        Self(body)
    }
}

impl From<&[u8]> for Body {
    fn from(body: &[u8]) -> Self {
        body.to_vec().into()
    }
}

impl From<&str> for Body {
    fn from(body: &str) -> Self {
        body.as_bytes().to_vec().into()
    }
}

impl From<String> for Body {
    fn from(body: String) -> Self {
        body.into_bytes().into()
    }
}
