//! Endpoint descriptors and the one-shot request pipeline.
//!
//! A request goes through sign → send → classify → decode, retrying failed
//! attempts per the configured [`crate::retry::Retryer`]. Intermediate
//! attempt failures are logged stage-tagged; only the final error is
//! surfaced to the caller.

use std::fmt;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::debug;
use url::Url;

use crate::Result;
use crate::client::Client;
use crate::decode;
use crate::error::Error;
use crate::retry::Attempt;
use crate::types::Diagnostic;

/// Static description of one API operation.
///
/// Validated once before request construction; an invalid descriptor is a
/// terminal construction error and never enters the retry loop.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct Endpoint {
    /// Operation name, used in error messages
    pub name: String,
    /// HTTP method
    pub method: String,
    /// URL path below the API version segment
    pub path: String,
    /// Query parameters as an explicit ordered list
    pub query: Vec<(String, String)>,
}

impl Endpoint {
    #[must_use]
    pub fn new<N, M, P>(name: N, method: M, path: P) -> Self
    where
        N: Into<String>,
        M: Into<String>,
        P: Into<String>,
    {
        Self {
            name: name.into(),
            method: method.into(),
            path: path.into(),
            query: Vec::new(),
        }
    }

    /// Appends one query parameter, returning the endpoint for chaining.
    #[must_use]
    pub fn with_query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Checks that the required fields are present before the descriptor is
    /// used to construct a request.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.name.is_empty() || self.method.is_empty() || self.path.is_empty() {
            return Err(Error::construction(
                "endpoint info is missing required fields",
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name: {}, method: {}, path: {}",
            self.name, self.method, self.path
        )
    }
}

/// A validated descriptor turned into everything needed to build signed
/// request attempts: URL, method and serialized body.
#[derive(Debug)]
pub(crate) struct Prepared {
    /// Display form of the descriptor, for error messages
    pub(crate) endpoint: String,
    pub(crate) path: String,
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) body: Option<Vec<u8>>,
}

impl Client {
    pub(crate) fn prepare<Req>(&self, endpoint: &Endpoint, payload: Option<&Req>) -> Result<Prepared>
    where
        Req: Serialize + ?Sized,
    {
        endpoint.validate()?;

        let method: Method = endpoint.method.parse().map_err(|e| {
            Error::construction(format!("invalid HTTP method {}: {e}", endpoint.method))
        })?;

        let mut url = Url::parse(&format!(
            "{}/{}/{}",
            self.api.endpoint, self.api.api_version, endpoint.path
        ))?;
        if !endpoint.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &endpoint.query {
                pairs.append_pair(key, value);
            }
        }

        let body = match payload {
            Some(payload) => Some(serde_json::to_vec(payload).map_err(|e| {
                Error::construction(format!("failed to serialize request payload: {e}"))
            })?),
            None => None,
        };

        Ok(Prepared {
            endpoint: endpoint.to_string(),
            path: endpoint.path.clone(),
            method,
            url,
            body,
        })
    }

    /// Signs one attempt: builds the HTTP request with the bearer token
    /// attached. A credential failure is fatal, never retried.
    pub(crate) fn sign(&self, prepared: &Prepared) -> Result<reqwest::Request> {
        let token = self.config.credentials.retrieve()?;

        let mut builder = self
            .config
            .http_client
            .request(prepared.method.clone(), prepared.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {token}"));
        if let Some(body) = &prepared.body {
            builder = builder.body(body.clone());
        }
        builder
            .build()
            .map_err(|e| Error::construction(format!("failed to build HTTP request: {e}")))
    }

    /// Sends one request, returning the decoded response body.
    ///
    /// Issues exactly one signed HTTP call per attempt and at most
    /// `retry budget + 1` attempts total. The bearer token is re-read on
    /// every attempt.
    pub async fn send<Req, Res>(&self, endpoint: &Endpoint, payload: Option<&Req>) -> Result<Res>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned + Default,
    {
        let prepared = self.prepare(endpoint, payload)?;
        let budget = self.config.retry_budget();
        let mut attempts = 0_u32;

        loop {
            attempts += 1;

            let request = match self.sign(&prepared) {
                Ok(request) => request,
                Err(error) => {
                    debug!(stage = "sign", %error, endpoint = %prepared.endpoint, "request attempt failed");
                    return Err(error);
                }
            };

            let error = match self.attempt::<Res>(&prepared, request).await {
                Ok(response) => return Ok(response),
                Err(error) => error,
            };

            let attempt = Attempt {
                kind: error.kind(),
                status: error.status_code(),
                attempts,
            };
            if !error.is_retryable()
                || attempts > budget
                || !self.retryer().should_retry(&attempt)
            {
                return Err(error);
            }
            sleep(self.retryer().retry_rules(&attempt)).await;
        }
    }

    async fn attempt<Res>(&self, prepared: &Prepared, request: reqwest::Request) -> Result<Res>
    where
        Res: DeserializeOwned + Default,
    {
        let response = match self.config.http_client.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                let error = Error::transport(e);
                debug!(stage = "send", %error, endpoint = %prepared.endpoint, "request attempt failed");
                return Err(error);
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                let error = Error::transport(e);
                debug!(stage = "send", %error, endpoint = %prepared.endpoint, "request attempt failed");
                return Err(error);
            }
        };

        if status.as_u16() >= 400
            && let Some(error) = classify(prepared, status, &body)
        {
            debug!(stage = "classify", %error, endpoint = %prepared.endpoint, "request attempt failed");
            return Err(error);
        }

        match decode::decode_lenient::<Res>(&body) {
            Ok(Some(response)) => Ok(response),
            Ok(None) => Ok(Res::default()),
            Err(e) => {
                let error = Error::decode(Some(status), e);
                debug!(stage = "decode", %error, endpoint = %prepared.endpoint, "request attempt failed");
                Err(error)
            }
        }
    }
}

/// Builds the classified error for a non-success response, if the body
/// carries a filed diagnostic. An unfiled diagnostic is not an error.
///
/// A body that is not JSON at all (a proxy's HTML error page, say) still
/// reports the status, so a retryable 5xx stays retryable.
pub(crate) fn classify(prepared: &Prepared, status: StatusCode, body: &str) -> Option<Error> {
    match decode::decode_lenient::<Diagnostic>(body) {
        Err(_) => Some(Error::status(
            status,
            prepared.method.clone(),
            prepared.path.clone(),
            format!(
                "an error occurred in sending a request to {} with an undecodable error body",
                prepared.endpoint
            ),
        )),
        Ok(Some(diagnostic)) if diagnostic.is_filed() => Some(Error::status(
            status,
            prepared.method.clone(),
            prepared.path.clone(),
            format!(
                "an error occurred in sending a request to {} with error details: {diagnostic}",
                prepared.endpoint
            ),
        )),
        Ok(_) => None,
    }
}
