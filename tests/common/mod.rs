#![allow(
    unused,
    reason = "Not every integration test binary exercises every helper"
)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use twitter_client_sdk::credentials::Credentials;
use twitter_client_sdk::retry::{Attempt, Retryer};
use twitter_client_sdk::{Client, Config};

pub const BEARER_TOKEN: &str = "TEST-BEARER-TOKEN";

#[must_use]
pub fn client(base_url: &str) -> Client {
    Client::with_endpoint(
        Config::new().with_credentials(Credentials::new(BEARER_TOKEN)),
        base_url,
    )
}

#[must_use]
pub fn bearer_header() -> String {
    format!("Bearer {BEARER_TOKEN}")
}

/// Retries everything with no delay, up to `max` times. Keeps retry tests
/// fast and deterministic.
#[derive(Debug, Clone, Copy)]
pub struct ImmediateRetryer {
    pub max: u32,
}

impl Retryer for ImmediateRetryer {
    fn max_retries(&self) -> u32 {
        self.max
    }

    fn should_retry(&self, _attempt: &Attempt) -> bool {
        true
    }

    fn retry_rules(&self, _attempt: &Attempt) -> Duration {
        Duration::ZERO
    }
}

/// Like [`ImmediateRetryer`], but counts how often the policy was
/// consulted. Useful when no mock server is involved to count hits.
#[derive(Debug, Default)]
pub struct CountingRetryer {
    pub max: u32,
    pub consulted: AtomicU32,
}

impl Retryer for CountingRetryer {
    fn max_retries(&self) -> u32 {
        self.max
    }

    fn should_retry(&self, _attempt: &Attempt) -> bool {
        self.consulted.fetch_add(1, Ordering::SeqCst);
        true
    }

    fn retry_rules(&self, _attempt: &Attempt) -> Duration {
        Duration::ZERO
    }
}

/// Never considers any failure retryable, regardless of budget.
#[derive(Debug, Clone, Copy)]
pub struct RefuseRetryer {
    pub max: u32,
}

impl Retryer for RefuseRetryer {
    fn max_retries(&self) -> u32 {
        self.max
    }

    fn should_retry(&self, _attempt: &Attempt) -> bool {
        false
    }

    fn retry_rules(&self, _attempt: &Attempt) -> Duration {
        Duration::ZERO
    }
}
