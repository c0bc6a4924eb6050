//! Utility modules supporting retrieval and analysis.
//!
//! - [`HttpClient`]: HTTP transport with retry, exponential backoff and a
//!   user-agent fallback for rejected requests
//! - [`RetryPolicy`] / [`RetryMachine`]: the retry state machine behind it
//! - [`dedupe`]: order-preserving removal of duplicate records
//! - [`extract`]: slice generated text into labeled sections
//!
//! # Retry with Backoff
//!
//! ```rust
//! use research_assistant::utils::{Outcome, RetryMachine, RetryPolicy, RetryState};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default()
//!     .max_attempts(3)
//!     .backoff_base(Duration::from_secs(2));
//! let mut machine = RetryMachine::new(policy);
//!
//! assert_eq!(
//!     machine.on_outcome(Outcome::Retryable),
//!     RetryState::Backoff { delay: Duration::from_secs(2) }
//! );
//! ```
//!
//! # Section Extraction
//!
//! ```rust
//! use research_assistant::utils::extract;
//!
//! let result = extract(
//!     "Key findings: X improves Y.\nMethodology: used Z.",
//!     &["Key findings", "Methodology"],
//! );
//! assert_eq!(result.get("Methodology"), Some("Methodology: used Z."));
//! ```

mod dedup;
mod extract;
mod http;
mod retry;

pub use dedup::{dedup_key, dedupe};
pub use extract::extract;
pub use http::{FetchRequest, FetchResponse, HttpClient, NetworkError};
pub use retry::{Outcome, RetryMachine, RetryPolicy, RetryState, REJECTION_STATUSES};
