use bytes::Bytes;
use mime::Mime;

use crate::Source;

/// The content of a part, either owned bytes or a handle to a [`Source`]
/// that is read when the form is serialized.
#[derive(Clone, Debug)]
pub enum Value {
    Bytes(Bytes),
    Source(Source),
}

impl Value {
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            Value::Source(_) => None,
        }
    }

    pub fn as_source(&self) -> Option<&Source> {
        match self {
            Value::Source(source) => Some(source),
            Value::Bytes(_) => None,
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Value::Source(_))
    }
}

/// Byte values compare by content, sources by identity.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Source(a), Value::Source(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl From<Bytes> for Value {
    fn from(bs: Bytes) -> Self {
        Value::Bytes(bs)
    }
}

impl From<&[u8]> for Value {
    fn from(bs: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(bs))
    }
}

impl From<Vec<u8>> for Value {
    fn from(bs: Vec<u8>) -> Self {
        Value::Bytes(bs.into())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Bytes(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Bytes(s.into())
    }
}

impl From<Source> for Value {
    fn from(source: Source) -> Self {
        Value::Source(source)
    }
}

/// One section of a form.
///
/// Most callers never build a `Part` themselves; [`Multipart::append`] does it
/// for them. Building one by hand allows unnamed parts and explicit content
/// types.
///
/// [`Multipart::append`]: crate::Multipart::append
#[derive(Clone, Debug, PartialEq)]
pub struct Part {
    name: Option<String>,
    value: Value,
    filename: Option<String>,
    content_type: Option<Mime>,
}

impl Part {
    pub fn new<V: Into<Value>>(value: V) -> Self {
        Part {
            name: None,
            value: value.into(),
            filename: None,
            content_type: None,
        }
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn filename<S: Into<String>>(mut self, filename: S) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Overrides the content type that would otherwise be derived from the
    /// filename. Also emits a Content-Type line for parts without a filename.
    pub fn content_type(mut self, content_type: Mime) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn get_filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn get_content_type(&self) -> Option<&Mime> {
        self.content_type.as_ref()
    }

    pub(crate) fn is_named(&self, name: &str) -> bool {
        self.name.as_deref() == Some(name)
    }

    pub(crate) fn needs_content_type(&self) -> bool {
        self.filename.is_some() && self.content_type.is_none()
    }

    pub(crate) fn set_content_type(&mut self, content_type: Mime) {
        self.content_type = Some(content_type);
    }
}
