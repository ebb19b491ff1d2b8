//! Drives a whole run: optional preflight, one authentication, then each
//! selected scenario in order.

use std::time::Instant;

use books_core::Transport;
use tracing::{error, info};

use crate::report::{Report, ScenarioResult};
use crate::scenario::Scenario;
use crate::verifier::Verifier;

pub struct Runner<T> {
    verifier: Verifier<T>,
    preflight: bool,
}

impl<T: Transport> Runner<T> {
    pub fn new(verifier: Verifier<T>) -> Self {
        Self {
            verifier,
            preflight: false,
        }
    }

    pub fn with_preflight(mut self, preflight: bool) -> Self {
        self.preflight = preflight;
        self
    }

    pub fn verifier(&self) -> &Verifier<T> {
        &self.verifier
    }

    /// Scenarios keep running after one of them fails; a failed preflight
    /// or login aborts the run before any scenario starts.
    pub fn run(&self, scenarios: &[Scenario]) -> Report {
        if self.preflight {
            if let Err(e) = self.verifier.health_check() {
                error!(error = %e, "preflight failed");
                return Report::aborted(e);
            }
        }

        let session = match self.verifier.authenticate() {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "authentication failed");
                return Report::aborted(e);
            }
        };

        let mut report = Report::default();
        for &scenario in scenarios {
            let started = Instant::now();
            let outcome = scenario.run(&self.verifier, &session);
            match &outcome {
                Ok(state) => info!(%scenario, %state, "scenario passed"),
                Err(failure) => error!(%scenario, %failure, "scenario failed"),
            }
            report.push(ScenarioResult {
                scenario,
                outcome,
                elapsed: started.elapsed(),
            });
        }
        info!(session_age_ms = session.age().as_millis() as u64, "run finished");
        report
    }
}
