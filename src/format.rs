//! Wire framing of a form.
//!
//! Every part is written as
//!
//! ```text
//! --{boundary}\r\n
//! Content-Disposition: form-data; name="{name}"; filename="{filename}"\r\n
//! Content-Type: {content type}\r\n
//! \r\n
//! {body}\r\n
//! ```
//!
//! where the name, filename and Content-Type line are left out when the part
//! has none. After the last part comes `--{boundary}--\r\n`.
//!
//! Quotes inside names and filenames are written verbatim; callers must not
//! pass them.
use bytes::{BufMut, Bytes, BytesMut};

use crate::{Boundary, Part};

const CRLF: &[u8] = b"\r\n";
const DASHES: &[u8] = b"--";

pub(crate) fn header(boundary: &Boundary, part: &Part) -> Bytes {
    let mut buf = BytesMut::with_capacity(128);

    buf.put_slice(DASHES);
    buf.put_slice(boundary.as_str().as_bytes());
    buf.put_slice(CRLF);
    buf.put_slice(b"Content-Disposition: form-data");

    if let Some(name) = part.get_name() {
        buf.put_slice(b"; name=\"");
        buf.put_slice(name.as_bytes());
        buf.put_slice(b"\"");
    }

    if let Some(filename) = part.get_filename() {
        buf.put_slice(b"; filename=\"");
        buf.put_slice(filename.as_bytes());
        buf.put_slice(b"\"");
    }

    buf.put_slice(CRLF);

    if let Some(content_type) = part.get_content_type() {
        buf.put_slice(b"Content-Type: ");
        buf.put_slice(content_type.as_ref().as_bytes());
        buf.put_slice(CRLF);
    }

    buf.put_slice(CRLF);
    buf.freeze()
}

pub(crate) fn footer() -> Bytes {
    Bytes::from_static(CRLF)
}

pub(crate) fn closing(boundary: &Boundary) -> Bytes {
    let token = boundary.as_str().as_bytes();
    let mut buf = BytesMut::with_capacity(token.len() + 6);

    buf.put_slice(DASHES);
    buf.put_slice(token);
    buf.put_slice(DASHES);
    buf.put_slice(CRLF);
    buf.freeze()
}
