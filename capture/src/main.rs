mod api_client;
mod capture;
mod error;
mod scenario;

use crate::{
    capture::{capture_scenarios, CaptureSettings},
    scenario::ScenarioFile,
};
use anyhow::{bail, Context};
use clap::Parser;
use simtest::{redaction::DEFAULT_REPLACEMENT_DOMAIN, HyperTransport};
use std::{path::PathBuf, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Records live API exchanges into redacted simulation files.
#[derive(Debug, Parser)]
#[command(name = "simtest-capture", version)]
struct Cli {
    /// Domain of the live account, e.g. `acme.tpondemand.com`.
    #[arg(long, env = "SIMTEST_DOMAIN")]
    domain: String,
    /// Access token sent with every request. Never written to disk.
    #[arg(long, env = "SIMTEST_TOKEN", hide_env_values = true)]
    token: String,
    /// JSON file listing the scenarios to capture.
    #[arg(long)]
    scenarios: PathBuf,
    /// Directory receiving one `<scenario>.json` file per scenario.
    #[arg(long, default_value = "testdata/simulations")]
    output: PathBuf,
    /// Domain written in place of the live one.
    #[arg(long, default_value = DEFAULT_REPLACEMENT_DOMAIN)]
    replacement_domain: String,
    /// Per-scenario time limit in seconds.
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if cli.domain.trim().is_empty() {
        bail!("--domain must not be empty");
    }
    if cli.token.trim().is_empty() {
        bail!("--token must not be empty");
    }

    let file = ScenarioFile::load(&cli.scenarios)?;
    let settings = CaptureSettings {
        domain_name: cli.domain,
        token: cli.token,
        replacement_domain: cli.replacement_domain,
        output_dir: cli.output,
        timeout: Duration::from_secs(cli.timeout_secs),
    };

    info!(
        "Capturing {} scenarios into {}",
        file.scenarios.len(),
        settings.output_dir.display()
    );
    let summary = capture_scenarios(&file.scenarios, &settings, HyperTransport::new)
        .await
        .context("capture aborted")?;

    info!(
        "{} scenarios saved, {} failed",
        summary.saved.len(),
        summary.failed.len()
    );
    for name in &summary.failed {
        println!("FAILED {}", name);
    }

    Ok(())
}
