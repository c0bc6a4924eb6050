//! Retry policy with exponential backoff, expressed as a state machine.
//!
//! A fetch moves through `Attempting -> (Backoff -> Attempting)* -> Succeeded | Exhausted`.
//! The transition only depends on how the last attempt was classified and
//! how many attempts have been spent, so attempt counts and total backoff
//! can be checked without any network or clock.
//!
//! | outcome     | budget left | first attempt | next state                    |
//! |-------------|-------------|---------------|-------------------------------|
//! | `Success`   | any         | any           | `Succeeded`                   |
//! | `Retryable` | yes         | any           | `Backoff(base * 2^(n-1))`     |
//! | `Retryable` | no          | any           | `Exhausted`                   |
//! | `Rejected`  | any         | yes           | `Attempting` (fallback agent) |
//! | `Rejected`  | any         | no            | `Exhausted`                   |
//! | `Fatal`     | any         | any           | `Exhausted`                   |
//!
//! Only a rejection of the very first request switches to the fallback
//! agent. The fallback attempt is an extra request on top of `max_attempts`.

use reqwest::{Method, StatusCode};
use std::time::Duration;

/// Statuses that suggest the request was refused by application-level
/// filtering rather than failing outright
pub const REJECTION_STATUSES: [u16; 4] = [401, 403, 406, 451];

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of requests, first try included
    pub max_attempts: u32,
    /// Delay before the first retry
    pub backoff_base: Duration,
    /// Optional ceiling for a single delay
    pub max_backoff: Option<Duration>,
    /// Statuses that are retried
    pub retry_statuses: Vec<u16>,
    /// Whether a rejected request gets one more try with the fallback agent
    pub agent_fallback: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff_base: Duration::from_secs(2),
            max_backoff: None,
            retry_statuses: vec![429, 500, 502, 503, 504],
            agent_fallback: true,
        }
    }
}

impl RetryPolicy {
    /// Set the attempt budget
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the base backoff delay
    pub fn backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Delay inserted after `failures` failed attempts (1-based):
    /// `base * 2^(failures - 1)`, capped by `max_backoff` when set.
    pub fn backoff_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        let delay = self.backoff_base.saturating_mul(1u32 << exponent);
        match self.max_backoff {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Worst-case total backoff when every attempt fails
    pub fn worst_case_backoff(&self) -> Duration {
        (1..self.max_attempts).fold(Duration::ZERO, |acc, n| {
            acc.saturating_add(self.backoff_for(n))
        })
    }

    /// Only GET and POST are retried
    pub fn is_method_retryable(&self, method: &Method) -> bool {
        *method == Method::GET || *method == Method::POST
    }

    /// Classify a response status
    pub fn classify_status(&self, status: StatusCode) -> Outcome {
        if status.is_success() {
            Outcome::Success
        } else if self.retry_statuses.contains(&status.as_u16()) {
            Outcome::Retryable
        } else if REJECTION_STATUSES.contains(&status.as_u16()) {
            Outcome::Rejected
        } else {
            Outcome::Fatal
        }
    }

    /// Classify a transport-level failure
    pub fn classify_error(&self, err: &reqwest::Error) -> Outcome {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            Outcome::Retryable
        } else if let Some(status) = err.status() {
            self.classify_status(status)
        } else {
            Outcome::Fatal
        }
    }
}

/// How a single attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    /// Transient failure: retryable status or connection-level error
    Retryable,
    /// Refused at the application layer (possible anti-bot filtering)
    Rejected,
    /// Permanent failure, e.g. a 404
    Fatal,
}

/// States of one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting { attempt: u32, fallback_agent: bool },
    Backoff { delay: Duration },
    Succeeded,
    Exhausted,
}

/// Drives the transitions for one fetch
#[derive(Debug, Clone)]
pub struct RetryMachine {
    policy: RetryPolicy,
    attempts: u32,
    budgeted_failures: u32,
    fallback_used: bool,
    /// The attempt in flight is the unbudgeted fallback request
    free_attempt: bool,
    total_backoff: Duration,
    state: RetryState,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
            budgeted_failures: 0,
            fallback_used: false,
            free_attempt: false,
            total_backoff: Duration::ZERO,
            state: RetryState::Attempting {
                attempt: 1,
                fallback_agent: false,
            },
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn state(&self) -> RetryState {
        self.state
    }

    /// Requests sent so far, including the fallback attempt
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Sum of all backoff delays scheduled so far
    pub fn total_backoff(&self) -> Duration {
        self.total_backoff
    }

    fn budget_left(&self) -> bool {
        self.budgeted_failures < self.policy.max_attempts
    }

    /// Record the outcome of the attempt in flight and move on
    pub fn on_outcome(&mut self, outcome: Outcome) -> RetryState {
        if !matches!(self.state, RetryState::Attempting { .. }) {
            return self.state;
        }
        self.attempts += 1;
        if self.free_attempt {
            self.free_attempt = false;
        } else {
            self.budgeted_failures += 1;
        }

        self.state = match outcome {
            Outcome::Success => RetryState::Succeeded,
            Outcome::Retryable if self.budget_left() => {
                let delay = self.policy.backoff_for(self.budgeted_failures);
                self.total_backoff += delay;
                RetryState::Backoff { delay }
            }
            Outcome::Rejected if self.policy.agent_fallback && self.attempts == 1 => {
                self.fallback_used = true;
                self.free_attempt = true;
                RetryState::Attempting {
                    attempt: self.attempts + 1,
                    fallback_agent: true,
                }
            }
            Outcome::Retryable | Outcome::Rejected | Outcome::Fatal => RetryState::Exhausted,
        };
        self.state
    }

    /// Leave the backoff state once the delay has elapsed
    pub fn resume(&mut self) -> RetryState {
        if let RetryState::Backoff { .. } = self.state {
            self.state = RetryState::Attempting {
                attempt: self.attempts + 1,
                fallback_agent: self.fallback_used,
            };
        }
        self.state
    }
}
