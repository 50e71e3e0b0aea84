use rand::{distr::Alphanumeric, Rng};
use std::fmt;

use crate::Error;

/// Length of generated boundaries.
pub const BOUNDARY_LEN: usize = 32;

/// RFC 2046 caps boundaries at 70 characters.
const MAX_BOUNDARY_LEN: usize = 70;

/// The delimiter token of one form. It never changes once created, every
/// delimiter line and the Content-Type header use the same token.
///
/// Nothing checks whether the token occurs inside a part body. With 32 random
/// alphanumerics a collision is unlikely but not impossible.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Boundary(String);

impl Boundary {
    pub fn generate() -> Self {
        let token = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(BOUNDARY_LEN)
            .map(char::from)
            .collect();

        Boundary(token)
    }

    /// Use a fixed token, mostly useful for reproducible output.
    ///
    /// Only characters that are valid unquoted in a header parameter are
    /// accepted: ASCII letters, digits and `'+_-.`.
    pub fn new<S: Into<String>>(token: S) -> Result<Self, Error> {
        let token = token.into();

        if token.is_empty() {
            return Err(Error::boundary("boundary must not be empty"));
        }

        if token.len() > MAX_BOUNDARY_LEN {
            return Err(Error::boundary(format!(
                "boundary is {} characters, at most {} are allowed",
                token.len(),
                MAX_BOUNDARY_LEN
            )));
        }

        if let Some(c) = token.chars().find(|c| !is_boundary_char(*c)) {
            return Err(Error::boundary(format!(
                "boundary contains forbidden character {:?}",
                c
            )));
        }

        Ok(Boundary(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_boundary_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '\'' | '+' | '_' | '-' | '.')
}

impl Default for Boundary {
    fn default() -> Self {
        Boundary::generate()
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Boundary {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
