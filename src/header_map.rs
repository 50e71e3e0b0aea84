use http::header::{HeaderName, HeaderValue};
use std::collections::HashMap;

use crate::Error;

/// A header target, implemented for http::HeaderMap and plain string maps.
/// Other frameworks can implement it for their own header containers.
pub trait HeaderMap {
    fn set_value(&mut self, header_key: &str, value: &str) -> Result<(), Error>;
}

impl HeaderMap for http::header::HeaderMap {
    fn set_value(&mut self, header_key: &str, value: &str) -> Result<(), Error> {
        let name = HeaderName::from_bytes(header_key.as_bytes()).map_err(Error::InvalidHeaderName)?;
        let value = HeaderValue::from_str(value).map_err(Error::InvalidHeader)?;

        self.insert(name, value);
        Ok(())
    }
}

impl HeaderMap for HashMap<String, String> {
    fn set_value(&mut self, header_key: &str, value: &str) -> Result<(), Error> {
        self.insert(header_key.to_string(), value.to_string());
        Ok(())
    }
}
