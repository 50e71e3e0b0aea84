use mime::Mime;
use std::{collections::HashMap, path::Path};

use crate::Error;

const BUILTIN: &[(&str, &str)] = &[
    ("bmp", "image/bmp"),
    ("gif", "image/gif"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpe", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("svg", "image/svg+xml"),
    ("mp4", "video/mp4"),
    ("mpeg", "video/mpeg"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("txt", "text/plain"),
    ("csv", "text/csv"),
];

/// Maps lowercase file extensions to content types.
///
/// Every table starts out with a small set of common types. Registering an
/// extension that is already known replaces the previous entry, there is no way
/// to remove one.
#[derive(Clone, Debug)]
pub struct MimeTable {
    types: HashMap<String, Mime>,
    fallback: Mime,
}

impl MimeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type for `extension`, matched case-insensitively.
    /// Unknown extensions get `application/octet-stream`.
    pub fn lookup(&self, extension: &str) -> &Mime {
        self.types
            .get(&normalize(extension))
            .unwrap_or(&self.fallback)
    }

    pub fn lookup_filename(&self, filename: &str) -> &Mime {
        match Path::new(filename).extension().and_then(|ext| ext.to_str()) {
            Some(ext) => self.lookup(ext),
            None => &self.fallback,
        }
    }

    pub fn insert<S: AsRef<str>>(&mut self, extension: S, content_type: Mime) -> &mut Self {
        self.types
            .insert(normalize(extension.as_ref()), content_type);
        self
    }

    /// Overlay `(extension, content type)` pairs onto the table.
    ///
    /// Pairs are applied in order. If a content type fails to parse, the pairs
    /// before it stay merged and the error is returned.
    pub fn merge<I, K, V>(&mut self, entries: I) -> Result<&mut Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (ext, content_type) in entries {
            let content_type = content_type.as_ref().parse::<Mime>()?;
            self.insert(ext, content_type);
        }

        Ok(self)
    }
}

impl Default for MimeTable {
    fn default() -> Self {
        let types = BUILTIN
            .iter()
            .filter_map(|(ext, ct)| ct.parse::<Mime>().ok().map(|m| (ext.to_string(), m)))
            .collect();

        MimeTable {
            types,
            fallback: mime::APPLICATION_OCTET_STREAM,
        }
    }
}

fn normalize(extension: &str) -> String {
    extension.trim_start_matches('.').to_ascii_lowercase()
}
