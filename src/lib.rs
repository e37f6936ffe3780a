//! A GitHub Actions gate asking a remote CI optimizer whether the rest of a pull request workflow can be skipped.
//!
//! One invocation sends at most one request. Whenever the answer is not a confident "skip", the workflow runs in
//! full: auth failures, rate limits, malformed responses and timeouts all resolve to `skip=false`.
//!
//! See: [`gate::run`]

pub mod config;
pub mod decision;
pub mod env;
pub mod gate;
pub mod logging;
pub mod optimizer;
pub mod report;
pub mod shutdown;
pub mod workflow;

pub use decision::Decision;
