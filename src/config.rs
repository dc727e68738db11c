//! Client configuration for sending requests to the Twitter API.

use std::fmt;
use std::sync::Arc;

use crate::credentials::Credentials;
use crate::retry::{NoRetryer, Retryer};

/// Provides client configuration for sending requests to the Twitter API.
///
/// Values left unset are filled with defaults when the configuration is
/// resolved by [`crate::client::Client::new`]: a fresh [`reqwest::Client`]
/// and the no-op retry policy. The retry budget normally comes from the
/// policy's `max_retries`; `with_max_retries` puts a hard cap on top of it.
#[derive(Clone, Default)]
pub struct Config {
    /// The credentials to use when signing requests
    pub(crate) credentials: Option<Credentials>,
    /// The HTTP client to use when sending requests
    pub(crate) http_client: Option<reqwest::Client>,
    /// Hard cap on retries, overriding a more generous policy
    pub(crate) max_retries: Option<u32>,
    /// Guides how failed attempts are retried; defaults to no retries
    pub(crate) retryer: Option<Arc<dyn Retryer>>,
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the credentials, returning the config for chaining.
    #[must_use]
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets the HTTP client, returning the config for chaining.
    #[must_use]
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the retry ceiling, returning the config for chaining.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Sets the retry policy, returning the config for chaining.
    #[must_use]
    pub fn with_retryer(mut self, retryer: Arc<dyn Retryer>) -> Self {
        self.retryer = Some(retryer);
        self
    }

    pub(crate) fn resolve(self) -> Resolved {
        Resolved {
            credentials: self.credentials.unwrap_or_default(),
            http_client: self.http_client.unwrap_or_default(),
            max_retries: self.max_retries,
            retryer: self.retryer.unwrap_or_else(|| Arc::new(NoRetryer)),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("credentials", &self.credentials)
            .field("http_client", &self.http_client)
            .field("max_retries", &self.max_retries)
            .field("retryer", &self.retryer.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Configuration with every default filled in, owned by the client.
#[derive(Clone)]
pub(crate) struct Resolved {
    pub(crate) credentials: Credentials,
    pub(crate) http_client: reqwest::Client,
    pub(crate) max_retries: Option<u32>,
    pub(crate) retryer: Arc<dyn Retryer>,
}

impl Resolved {
    /// The retry budget: the policy's ceiling, capped by the config.
    pub(crate) fn retry_budget(&self) -> u32 {
        let policy_max = self.retryer.max_retries();
        self.max_retries.map_or(policy_max, |cap| cap.min(policy_max))
    }
}
