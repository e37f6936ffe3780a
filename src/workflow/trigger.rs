//! Decides whether the optimizer should be asked at all.

use std::fmt::Display;

use super::TriggerEvent;

/// Events started by hand or by an API call. The full workflow always runs for these.
pub const DISPATCH_EVENTS: &[&str] = &["workflow_dispatch", "repository_dispatch"];

/// Whether the invocation should be checked against the optimizer.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The run belongs to a pull request and can be checked.
    Applicable {
        /// The pull request number.
        pr: u64,
    },
    /// The run cannot be checked and must not be skipped.
    NotApplicable(NotApplicable),
}

/// Why an invocation cannot be checked.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotApplicable {
    /// The workflow was dispatched manually or through the API.
    Dispatch,
    /// The event carries no pull request number.
    NoPullRequest,
}

impl Display for NotApplicable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dispatch => {
                write!(f, "Workflow dispatch event detected. Skipping optimizer checks.")
            }
            Self::NoPullRequest => write!(
                f,
                "No pull request number found. This may not be a pull request event."
            ),
        }
    }
}

/// Filters an invocation by its triggering event.
///
/// Needs nothing but the event, so runs that are never checked do not depend on the rest of the runner variables.
pub fn filter(event: &TriggerEvent) -> Trigger {
    if DISPATCH_EVENTS.contains(&event.name.as_str()) {
        return Trigger::NotApplicable(NotApplicable::Dispatch);
    }

    match event.pull_request {
        Some(pr) => Trigger::Applicable { pr },
        None => Trigger::NotApplicable(NotApplicable::NoPullRequest),
    }
}
