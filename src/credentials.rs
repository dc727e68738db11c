//! Bearer-token credentials used to sign every request and stream.

use secrecy::{ExposeSecret as _, SecretString};

use crate::Result;
use crate::error::Error;

/// A set of credentials which are set programmatically.
///
/// The token is held in a [`SecretString`] so it is redacted from debug
/// output. The credentials are owned by the [`crate::config::Config`] and
/// shared read-only by every request and stream built from it.
#[derive(Clone, Debug)]
pub struct Credentials {
    bearer_token: SecretString,
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new("")
    }
}

impl Credentials {
    #[must_use]
    pub fn new<S: Into<String>>(bearer_token: S) -> Self {
        Self {
            bearer_token: SecretString::from(bearer_token.into()),
        }
    }

    /// Returns the bearer token, or an [`crate::error::EmptyCredentials`]
    /// error if the token is empty.
    pub fn retrieve(&self) -> Result<&str> {
        let token = self.bearer_token.expose_secret();
        if token.is_empty() {
            return Err(Error::credentials());
        }
        Ok(token)
    }

    /// Checks if the token is set.
    #[must_use]
    pub fn is_set(&self) -> bool {
        !self.bearer_token.expose_secret().is_empty()
    }
}
