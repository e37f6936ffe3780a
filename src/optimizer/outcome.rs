//! Classifies an optimizer exchange into exactly one [`Outcome`].

use std::{fmt::Display, time::Duration};

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, warn};

use crate::decision::Decision;

/// The body of a successful optimizer response.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ResponseBody {
    /// Whether the remaining steps can be skipped.
    pub skip: bool,
    /// Why, as shown to the user. Optional on the wire.
    #[serde(default)]
    pub reason: String,
}

/// A non-2xx status returned by the optimizer.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// 400: the service did not understand the request body.
    BadRequest,
    /// 401: the token was refused.
    Unauthorized,
    /// 402: the account's plan does not include the optimizer.
    PlanRestricted,
    /// 429: too many requests.
    RateLimited,
    /// Any other non-2xx status.
    Unexpected(StatusCode),
}

impl From<StatusCode> for Rejection {
    fn from(status: StatusCode) -> Self {
        match status.as_u16() {
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            402 => Self::PlanRestricted,
            429 => Self::RateLimited,
            _ => Self::Unexpected(status),
        }
    }
}

impl Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest => write!(f, "Invalid request body sent to the optimizer service."),
            Self::Unauthorized => {
                write!(f, "Invalid authentication. Please check your optimizer token.")
            }
            Self::PlanRestricted => write!(
                f,
                "Your plan does not support the CI optimizer. Please upgrade your plan to use this feature."
            ),
            Self::RateLimited => write!(f, "Rate limit exceeded on the optimizer service."),
            Self::Unexpected(status) => match status.canonical_reason() {
                Some(reason) => write!(
                    f,
                    "A non-OK status was returned by the optimizer service: {} ({reason})",
                    status.as_u16()
                ),
                None => write!(
                    f,
                    "A non-OK status was returned by the optimizer service: {}",
                    status.as_u16()
                ),
            },
        }
    }
}

/// How an optimizer exchange ended.
///
/// Only [`Outcome::Verdict`] can lead to a skipped workflow. Every other variant runs everything.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The optimizer answered with a well-formed body.
    Verdict(ResponseBody),
    /// The optimizer answered 2xx but the body could not be parsed.
    MalformedBody {
        /// The parser error.
        error: String,
    },
    /// The optimizer answered with a non-2xx status.
    Rejected(Rejection),
    /// The optimizer did not answer within the configured timeout.
    TimedOut(Duration),
    /// The invocation was interrupted while waiting for the optimizer.
    Cancelled,
    /// The request could not be sent or the response could not be received.
    Transport {
        /// The transport error.
        error: String,
    },
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verdict(body) if body.reason.is_empty() => write!(f, "no reason given"),
            Self::Verdict(body) => write!(f, "{}", body.reason),
            Self::MalformedBody { .. } => {
                write!(f, "Failed to parse the optimizer response.")
            }
            Self::Rejected(rejection) => write!(f, "{rejection}"),
            Self::TimedOut(timeout) => {
                write!(f, "Request timed out after {} seconds", timeout.as_secs())
            }
            Self::Cancelled => write!(f, "Request cancelled before the optimizer answered."),
            Self::Transport { .. } => {
                write!(f, "Failed to make request to the optimizer service.")
            }
        }
    }
}

impl Outcome {
    /// Logs the outcome: the reason at info for a verdict, a warning otherwise.
    pub fn log(&self) {
        match self {
            Self::Verdict(_) => info!("{self}"),
            _ => warn!("{self}"),
        }
    }

    /// Converts the outcome into a decision, running the full workflow on anything but a verdict.
    pub fn into_decision(self) -> Decision {
        let reason = self.to_string();
        match self {
            Self::Verdict(body) => Decision {
                skip: body.skip,
                reason,
            },
            Self::MalformedBody { .. }
            | Self::Rejected(_)
            | Self::TimedOut(_)
            | Self::Cancelled
            | Self::Transport { .. } => Decision::run(reason),
        }
    }
}

/// Classifies the body of a 2xx response.
pub fn classify_body(bytes: &[u8]) -> Outcome {
    match serde_json::from_slice::<ResponseBody>(bytes) {
        Ok(body) => Outcome::Verdict(body),
        Err(err) => Outcome::MalformedBody {
            error: err.to_string(),
        },
    }
}
