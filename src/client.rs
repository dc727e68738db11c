//! Root client object tying configuration, API info and retry policy together.

use std::sync::Arc;

use crate::config::{Config, Resolved};
use crate::retry::Retryer;

/// Base endpoint for the Twitter API.
pub const ENDPOINT: &str = "https://api.twitter.com";
/// Twitter API version segment.
pub const API_VERSION: &str = "2";

/// Immutable API location data shared by every request and stream.
#[derive(Debug, Clone)]
pub(crate) struct ApiInfo {
    pub(crate) endpoint: String,
    pub(crate) api_version: String,
}

/// Client for interacting with the Twitter API.
///
/// The client is cheap to clone; clones share the underlying HTTP
/// connection pool, credentials and retry policy.
///
/// # Example
///
/// ```no_run
/// use twitter_client_sdk::{Client, Config};
/// use twitter_client_sdk::credentials::Credentials;
///
/// # async fn example() -> twitter_client_sdk::Result<()> {
/// let config = Config::new().with_credentials(Credentials::new("<bearer token>"));
/// let client = Client::new(config);
///
/// let rules = client.get_rules(&Default::default()).await?;
/// println!("{} active rules", rules.data.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    pub(crate) config: Resolved,
    pub(crate) api: ApiInfo,
}

impl Client {
    /// Creates a client against the production API endpoint.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_endpoint(config, ENDPOINT)
    }

    /// Creates a client against a custom base endpoint, e.g. a mock server.
    #[must_use]
    pub fn with_endpoint(config: Config, endpoint: &str) -> Self {
        Self {
            config: config.resolve(),
            api: ApiInfo {
                endpoint: endpoint.trim_end_matches('/').to_owned(),
                api_version: API_VERSION.to_owned(),
            },
        }
    }

    pub(crate) fn retryer(&self) -> &Arc<dyn Retryer> {
        &self.config.retryer
    }
}
