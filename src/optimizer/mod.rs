//! The remote CI optimizer service.

pub mod client;
pub mod outcome;
pub mod payload;

pub use client::OptimizerClient;
pub use outcome::{Outcome, Rejection, ResponseBody};
pub use payload::{CALLER, Caller, RequestPayload};
