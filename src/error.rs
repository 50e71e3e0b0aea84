use std::{error::Error as StdError, fmt, io};

#[derive(Debug)]
pub enum Error {
    /// A caller supplied boundary is empty, too long or contains characters
    /// that would need quoting in the Content-Type header.
    InvalidBoundary(String),
    InvalidMimeType(mime::FromStrError),
    InvalidHeader(http::header::InvalidHeaderValue),
    InvalidHeaderName(http::header::InvalidHeaderName),
    /// Reading a nested source failed. The source has been released.
    Source(io::Error),
    /// The destination of a pipe refused a chunk.
    Sink(String),
    Closed,
    /// A runtime for reading sources could not be started.
    Runtime(io::Error),
}

impl Error {
    pub(crate) fn boundary<S: Into<String>>(msg: S) -> Self {
        Error::InvalidBoundary(msg.into())
    }

    pub(crate) fn sink<E: fmt::Display>(e: E) -> Self {
        Error::Sink(format!("{}", e))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidBoundary(ref msg) => write!(f, "Invalid boundary: {}", msg),
            Error::InvalidMimeType(ref e) => write!(f, "Content-Type value invalid: {}", e),
            Error::InvalidHeader(ref e) => write!(f, "Header value invalid: {}", e),
            Error::InvalidHeaderName(ref e) => write!(f, "Header name invalid: {}", e),
            Error::Source(ref e) => write!(f, "Source: {}", e),
            Error::Sink(ref e) => write!(f, "Sink: {}", e),
            Error::Closed => write!(f, "Cannot write into a closed sink"),
            Error::Runtime(ref e) => write!(f, "Runtime: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match *self {
            Error::InvalidMimeType(ref e) => Some(e),
            Error::InvalidHeader(ref e) => Some(e),
            Error::InvalidHeaderName(ref e) => Some(e),
            Error::Source(ref e) => Some(e),
            Error::Runtime(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(inner: io::Error) -> Self {
        Error::Source(inner)
    }
}

impl From<mime::FromStrError> for Error {
    fn from(inner: mime::FromStrError) -> Self {
        Error::InvalidMimeType(inner)
    }
}
