//! Retry policies for failed request and stream connection attempts.
//!
//! A [`Retryer`] answers two questions for the pipeline: should this failed
//! attempt be retried, and how long to wait before the next one. The
//! pipeline enforces the hard attempt ceiling (`max_retries + 1` attempts)
//! regardless of what `should_retry` returns.

use std::time::Duration;

use backoff::backoff::Backoff as _;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

use crate::error::{Kind, StatusCode};

const DEFAULT_INITIAL_BACKOFF_DURATION: Duration = Duration::from_secs(1);
const DEFAULT_MAX_BACKOFF_DURATION: Duration = Duration::from_secs(60);
const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// One failed request or stream connection attempt, as seen by a policy.
///
/// This is a read-only view of the failure; policies never touch the
/// request itself.
#[non_exhaustive]
#[derive(Debug, Clone, Copy)]
pub struct Attempt {
    /// Classification of the failure
    pub kind: Kind,
    /// HTTP status of the failed response, if one was received
    pub status: Option<StatusCode>,
    /// How many attempts have been made so far, this one included
    pub attempts: u32,
}

/// Guides how failed attempts are retried.
///
/// Implementations may consider the attempt count when determining if an
/// attempt is retryable, but the pipeline uses `max_retries` to limit the
/// number of attempts regardless.
pub trait Retryer: Send + Sync {
    /// The number of times an attempt may be retried before failing.
    fn max_retries(&self) -> u32;

    /// Returns whether the failed attempt is retryable.
    fn should_retry(&self, attempt: &Attempt) -> bool;

    /// The delay to apply before making another attempt.
    fn retry_rules(&self, attempt: &Attempt) -> Duration;
}

/// Policy used when no retryer is configured: never retries anything.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRetryer;

impl Retryer for NoRetryer {
    fn max_retries(&self) -> u32 {
        0
    }

    fn should_retry(&self, _attempt: &Attempt) -> bool {
        false
    }

    fn retry_rules(&self, _attempt: &Attempt) -> Duration {
        Duration::ZERO
    }
}

/// Capped exponential backoff over retry-eligible failures.
///
/// Retries transport failures, stream disconnects, HTTP 429 and 5xx
/// responses. Delays follow an exponential schedule derived from the
/// configured bounds, with jitter.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct StandardRetryer {
    /// Maximum number of retries before giving up
    pub max_retries: u32,
    /// Backoff duration before the first retry
    pub initial_backoff: Duration,
    /// Ceiling on the backoff duration
    pub max_backoff: Duration,
    /// Multiplier applied between consecutive retries
    pub backoff_multiplier: f64,
}

impl Default for StandardRetryer {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: DEFAULT_INITIAL_BACKOFF_DURATION,
            max_backoff: DEFAULT_MAX_BACKOFF_DURATION,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl StandardRetryer {
    #[must_use]
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    fn schedule(&self) -> ExponentialBackoff {
        ExponentialBackoffBuilder::default()
            .with_initial_interval(self.initial_backoff)
            .with_max_interval(self.max_backoff)
            .with_multiplier(self.backoff_multiplier)
            .with_max_elapsed_time(None) // max attempts are enforced by the pipeline
            .build()
    }
}

impl Retryer for StandardRetryer {
    fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn should_retry(&self, attempt: &Attempt) -> bool {
        match attempt.kind {
            Kind::Transport | Kind::Stream => true,
            Kind::Status => attempt.status.is_some_and(|status| {
                status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }),
            _ => false,
        }
    }

    fn retry_rules(&self, attempt: &Attempt) -> Duration {
        // A fresh schedule stepped to the current attempt keeps the policy
        // stateless across concurrent requests sharing one retryer.
        let mut schedule = self.schedule();
        let mut delay = self.initial_backoff;
        for _ in 0..attempt.attempts {
            delay = schedule.next_backoff().unwrap_or(delay);
        }
        delay
    }
}
