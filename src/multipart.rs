use bytes::{Bytes, BytesMut};
use futures::{executor, Sink};
use std::{fmt, io, slice};
use tokio::runtime::{self, Handle, Runtime};

use crate::{
    format, BufferSink, Boundary, Error, FormData, HeaderMap, MimeTable, MultipartStream, Part,
    PipeOptions, Source, Value,
};

const CONTENT_TYPE: &str = "Content-Type";

/// An ordered collection of form fields and the boundary that separates them
/// on the wire.
///
/// Fields keep the order they were added in and a name may occur any number of
/// times. The form can be turned into bytes all at once with
/// [`get_buffer`](Multipart::get_buffer) or incrementally with
/// [`stream`](Multipart::stream).
#[derive(Clone, Debug, Default)]
pub struct Multipart {
    boundary: Boundary,
    mime_types: MimeTable,
    parts: Vec<Part>,
}

impl Multipart {
    pub fn new() -> Self {
        Self::default()
    }

    /// A form using `boundary` instead of a random one.
    pub fn with_boundary<S: Into<String>>(boundary: S) -> Result<Self, Error> {
        Ok(Multipart {
            boundary: Boundary::new(boundary)?,
            mime_types: MimeTable::default(),
            parts: Vec::new(),
        })
    }

    pub fn boundary(&self) -> &Boundary {
        &self.boundary
    }

    pub fn mime_types(&self) -> &MimeTable {
        &self.mime_types
    }

    /// Register extra `(extension, content type)` pairs, e.g.
    /// `("p12", "application/x-pkcs12")`. Only parts added afterwards see them.
    pub fn append_mime_types<I, K, V>(&mut self, entries: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.mime_types.merge(entries)?;
        Ok(self)
    }

    /// Add a field at the end of the form.
    ///
    /// With a filename, the part also gets a Content-Type looked up from the
    /// filename's extension. Names and filenames are written as given, so they
    /// must not contain `"`.
    pub fn append<N, V>(&mut self, name: N, value: V, filename: Option<&str>) -> &mut Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        self.push(formed(name.into(), value.into(), filename))
    }

    /// Add a prepared part at the end of the form.
    pub fn push(&mut self, part: Part) -> &mut Self {
        let part = self.resolve(part);
        self.parts.push(part);
        self
    }

    /// Replace every field called `name` with a single new one, which takes
    /// the place of the first field removed. Appends if there was none.
    pub fn set<N, V>(&mut self, name: N, value: V, filename: Option<&str>) -> &mut Self
    where
        N: Into<String>,
        V: Into<Value>,
    {
        let name = name.into();
        let position = self.parts.iter().position(|p| p.is_named(&name));
        let part = self.resolve(formed(name.clone(), value.into(), filename));

        match position {
            Some(i) => {
                self.parts.retain(|p| !p.is_named(&name));
                self.parts.insert(i, part);
            }
            None => self.parts.push(part),
        }

        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.parts
            .iter()
            .find(|p| p.is_named(name))
            .map(Part::value)
    }

    pub fn get_all(&self, name: &str) -> Vec<&Value> {
        self.parts
            .iter()
            .filter(|p| p.is_named(name))
            .map(Part::value)
            .collect()
    }

    pub fn has(&self, name: &str) -> bool {
        self.parts.iter().any(|p| p.is_named(name))
    }

    pub fn delete(&mut self, name: &str) -> &mut Self {
        self.parts.retain(|p| !p.is_named(name));
        self
    }

    pub fn entries(&self) -> Entries<'_> {
        Entries {
            parts: self.parts.iter(),
        }
    }

    pub fn keys(&self) -> Keys<'_> {
        Keys {
            parts: self.parts.iter(),
        }
    }

    pub fn values(&self) -> Values<'_> {
        Values {
            parts: self.parts.iter(),
        }
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn write_headers<H: HeaderMap>(&self, headers: &mut H) -> Result<(), Error> {
        headers.set_value(CONTENT_TYPE, &self.content_type())
    }

    /// The Content-Type header to send along with the body.
    pub fn get_headers(&self) -> Result<http::HeaderMap, Error> {
        let mut headers = http::HeaderMap::new();
        self.write_headers(&mut headers)?;
        Ok(headers)
    }

    /// The complete body in one buffer.
    ///
    /// Source values are read to the end on the current thread, which uses
    /// them up: afterwards they contribute no bytes to any stream or buffer.
    ///
    /// Readers such as `tokio::fs::File` only work inside a tokio runtime.
    /// When called outside of one, a current thread runtime is started for
    /// the duration of the call. Inside a runtime the call blocks the worker
    /// thread, so prefer [`flowing`](Multipart::flowing) in async code.
    pub fn get_buffer(&self) -> Result<Bytes, Error> {
        let mut buffer = BytesMut::new();
        let runtime = self.drain_runtime()?;

        for part in &self.parts {
            buffer.extend_from_slice(&format::header(&self.boundary, part));

            match (part.value(), &runtime) {
                (Value::Bytes(body), _) => buffer.extend_from_slice(body),
                (Value::Source(source), Some(rt)) => rt.block_on(drain(source, &mut buffer))?,
                (Value::Source(source), None) => {
                    executor::block_on(drain(source, &mut buffer))?
                }
            }

            buffer.extend_from_slice(&format::footer());
        }

        buffer.extend_from_slice(&format::closing(&self.boundary));
        Ok(buffer.freeze())
    }

    /// Stream the form as it is now. Later changes to the form do not affect
    /// the returned stream, but sources are shared with it.
    pub fn stream(&self) -> MultipartStream {
        MultipartStream::new(self.boundary.clone(), self.parts.clone())
    }

    pub fn into_stream(self) -> MultipartStream {
        MultipartStream::new(self.boundary, self.parts)
    }

    /// See [`MultipartStream::pipe`].
    pub async fn pipe<S>(&self, destination: S, options: PipeOptions) -> Result<S, Error>
    where
        S: Sink<Bytes> + Unpin,
        S::Error: fmt::Display,
    {
        self.stream().pipe(destination, options).await
    }

    /// See [`MultipartStream::flowing`].
    pub async fn flowing(&self, end: bool) -> Result<BufferSink, Error> {
        self.stream().flowing(end).await
    }

    /// A runtime to read sources on, needed only when there are sources and
    /// the caller is not already inside a runtime.
    fn drain_runtime(&self) -> Result<Option<Runtime>, Error> {
        if Handle::try_current().is_ok() || !self.values().any(Value::is_source) {
            return Ok(None);
        }

        log::debug!("Starting a runtime to read sources");
        runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map(Some)
            .map_err(Error::Runtime)
    }

    fn resolve(&self, mut part: Part) -> Part {
        if part.needs_content_type() {
            let content_type = part
                .get_filename()
                .map(|filename| self.mime_types.lookup_filename(filename).clone());

            if let Some(content_type) = content_type {
                part.set_content_type(content_type);
            }
        }

        part
    }
}

fn formed(name: String, value: Value, filename: Option<&str>) -> Part {
    let part = Part::new(value).name(name);

    match filename {
        Some(filename) => part.filename(filename),
        None => part,
    }
}

async fn drain(source: &Source, buffer: &mut BytesMut) -> io::Result<()> {
    while let Some(chunk) = source.next_chunk().await {
        buffer.extend_from_slice(&chunk?);
    }

    Ok(())
}

impl FormData for Multipart {
    fn append(&mut self, name: &str, value: Value, filename: Option<&str>) -> &mut Self {
        Multipart::append(self, name, value, filename)
    }

    fn set(&mut self, name: &str, value: Value, filename: Option<&str>) -> &mut Self {
        Multipart::set(self, name, value, filename)
    }

    fn delete(&mut self, name: &str) -> &mut Self {
        Multipart::delete(self, name)
    }

    fn get(&self, name: &str) -> Option<&Value> {
        Multipart::get(self, name)
    }

    fn get_all(&self, name: &str) -> Vec<&Value> {
        Multipart::get_all(self, name)
    }

    fn has(&self, name: &str) -> bool {
        Multipart::has(self, name)
    }

    fn entries(&self) -> Entries<'_> {
        Multipart::entries(self)
    }

    fn keys(&self) -> Keys<'_> {
        Multipart::keys(self)
    }

    fn values(&self) -> Values<'_> {
        Multipart::values(self)
    }
}

impl fmt::Display for Multipart {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[object {}]", <Self as FormData>::TAG)
    }
}

impl<'a> IntoIterator for &'a Multipart {
    type Item = (Option<&'a str>, &'a Value);
    type IntoIter = Entries<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries()
    }
}

/// Name and value of every part, in form order.
#[derive(Clone, Debug)]
pub struct Entries<'a> {
    parts: slice::Iter<'a, Part>,
}

impl<'a> Iterator for Entries<'a> {
    type Item = (Option<&'a str>, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        self.parts.next().map(|p| (p.get_name(), p.value()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.parts.size_hint()
    }
}

impl ExactSizeIterator for Entries<'_> {}

#[derive(Clone, Debug)]
pub struct Keys<'a> {
    parts: slice::Iter<'a, Part>,
}

impl<'a> Iterator for Keys<'a> {
    type Item = Option<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        self.parts.next().map(Part::get_name)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.parts.size_hint()
    }
}

impl ExactSizeIterator for Keys<'_> {}

#[derive(Clone, Debug)]
pub struct Values<'a> {
    parts: slice::Iter<'a, Part>,
}

impl<'a> Iterator for Values<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        self.parts.next().map(Part::value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.parts.size_hint()
    }
}

impl ExactSizeIterator for Values<'_> {}
