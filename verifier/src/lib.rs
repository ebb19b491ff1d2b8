//! Contract verifier for the books API.
//!
//! # Overview
//! Authenticates once, then runs independent scenarios that each create their
//! own book and walk it through create, read, update and delete, asserting
//! status codes and echoed fields at every step.
//!
//! # Design
//! - Wire details live in `books-core`; this crate adds the blocking `ureq`
//!   transport, the contract checks, and the scenario state machine.
//! - Configuration is an explicit `VerifierConfig` handed to the verifier.
//! - Every call is attempted once with a per-call timeout; the first failure
//!   aborts the scenario it belongs to.

pub mod config;
pub mod error;
pub mod report;
pub mod runner;
pub mod scenario;
pub mod telemetry;
pub mod transport;
pub mod verifier;

#[cfg(test)]
mod test_support;

pub use config::{Cli, ConfigError, LogFormat, VerifierConfig};
pub use error::VerifyError;
pub use report::{Report, ScenarioResult};
pub use runner::Runner;
pub use scenario::{RunState, Scenario, ScenarioFailure};
pub use transport::UreqTransport;
pub use verifier::Verifier;
