//! Run results and their terminal rendering.

use std::fmt::Write as _;
use std::time::Duration;

use colored::Colorize;

use crate::error::VerifyError;
use crate::scenario::{RunState, Scenario, ScenarioFailure};

#[derive(Debug)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    pub outcome: Result<RunState, ScenarioFailure>,
    pub elapsed: Duration,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Outcome of one verifier run.
#[derive(Debug, Default)]
pub struct Report {
    /// Set when the run stopped before any scenario (preflight or login).
    pub aborted: Option<VerifyError>,
    pub results: Vec<ScenarioResult>,
}

impl Report {
    pub fn aborted(error: VerifyError) -> Self {
        Self {
            aborted: Some(error),
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: ScenarioResult) {
        self.results.push(result);
    }

    /// True when nothing aborted the run and every scenario passed.
    pub fn passed(&self) -> bool {
        self.aborted.is_none() && self.results.iter().all(ScenarioResult::passed)
    }

    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.passed()).count()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(error) = &self.aborted {
            let _ = writeln!(out, "{} run aborted - {error}", "FAIL".red().bold());
            return out;
        }
        for result in &self.results {
            match &result.outcome {
                Ok(state) => {
                    let _ = writeln!(
                        out,
                        "{} {} - {state} ({} ms)",
                        "OK".green().bold(),
                        result.scenario,
                        result.elapsed.as_millis()
                    );
                }
                Err(failure) => {
                    let _ = writeln!(out, "{} {} - {failure}", "FAIL".red().bold(), result.scenario);
                }
            }
        }
        let total = self.results.len();
        let failed = self.failed_count();
        let _ = writeln!(out, "{} passed, {failed} failed, {total} total", total - failed);
        out
    }
}
