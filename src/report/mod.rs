//! Outcome aggregation and console output.
//!
//! Two aggregators drain the success and failure channels concurrently and
//! feed one shared message channel; the message sink writes that channel to
//! the output stream. Messages from one aggregator keep their order; messages
//! from the two aggregators interleave freely.

mod aggregate;
mod failure_log;
mod sink;

pub use aggregate::{
    FailureReport, SuccessTally, drain_failures, drain_successes, failure_message, success_message,
};
pub use failure_log::{FailureLog, FailureLogError};
pub use sink::drain_messages;
