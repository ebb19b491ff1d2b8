use std::process::ExitCode;

use anyhow::Context;
use books_verifier::{telemetry, Cli, Runner, UreqTransport, Verifier};
use clap::Parser;

fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    telemetry::init_tracing(cli.log_format)?;

    let config = cli.config();
    config.validate().context("invalid configuration")?;
    tracing::info!(base_url = %config.base_url, timeout = ?config.timeout, "starting verification");

    let transport = UreqTransport::new(config.timeout);
    let runner = Runner::new(Verifier::new(&config, transport)).with_preflight(cli.preflight);
    let report = runner.run(&cli.selected_scenarios());
    print!("{}", report.render());

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
