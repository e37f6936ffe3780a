//! The single answer an invocation produces.

use std::fmt::Display;

/// Whether the rest of the workflow may be skipped, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    /// `true` only when the optimizer confidently reported the remaining steps as redundant.
    pub skip: bool,
    /// The optimizer's reason, or the failure that made the workflow run in full.
    pub reason: String,
}

impl Decision {
    /// A decision to skip the rest of the workflow.
    pub fn skip<S>(reason: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            skip: true,
            reason: reason.into(),
        }
    }

    /// A decision to run the whole workflow.
    pub fn run<S>(reason: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            skip: false,
            reason: reason.into(),
        }
    }
}

impl Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "skip: {} ({})", self.skip, self.reason)
    }
}
