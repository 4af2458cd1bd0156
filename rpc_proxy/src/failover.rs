//! Ordered failover across upstream candidates
//!
//! Shared by the EVM proxy, the Solana proxy and the client-side fallback
//! transport. Candidates are tried one at a time, never raced, so a
//! non-idempotent call reaches at most one upstream that accepted it.

use log::{debug, warn};
use std::fmt;
use std::future::Future;
use thiserror::Error;

/// Anything carrying an HTTP status the failover loop can classify
pub trait RpcReply {
    fn status(&self) -> u16;
}

/// 429 or any 5xx means "try the next upstream"
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Why a candidate was skipped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Status(u16),
    Error(String),
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Status(status) => write!(f, "RPC returned {}", status),
            Failure::Error(reason) => f.write_str(reason),
        }
    }
}

/// Every candidate was skipped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("all {attempts} upstream candidates failed")]
pub struct AllFailed {
    pub attempts: usize,
    pub last: Option<Failure>,
}

/// Send to each candidate in order and return the first reply that is not
/// retryable. Errors from `send` always count as retryable.
pub async fn select_first_successful<'a, C, R, E, P, F, Fut>(
    candidates: &'a [C],
    is_retryable: P,
    mut send: F,
) -> Result<R, AllFailed>
where
    C: fmt::Debug,
    R: RpcReply,
    E: fmt::Display,
    P: Fn(&R) -> bool,
    F: FnMut(&'a C) -> Fut,
    Fut: Future<Output = Result<R, E>>,
{
    let total = candidates.len();
    let mut last = None;

    for (index, candidate) in candidates.iter().enumerate() {
        match send(candidate).await {
            Ok(reply) if is_retryable(&reply) => {
                warn!(
                    "Upstream {:?} returned {} (attempt {}/{}), trying next",
                    candidate,
                    reply.status(),
                    index + 1,
                    total
                );
                last = Some(Failure::Status(reply.status()));
            }
            Ok(reply) => {
                debug!(
                    "Upstream {:?} answered {} on attempt {}/{}",
                    candidate,
                    reply.status(),
                    index + 1,
                    total
                );
                return Ok(reply);
            }
            Err(e) => {
                warn!(
                    "Upstream {:?} unreachable (attempt {}/{}): {}",
                    candidate,
                    index + 1,
                    total,
                    e
                );
                last = Some(Failure::Error(e.to_string()));
            }
        }
    }

    Err(AllFailed {
        attempts: total,
        last,
    })
}
