use crate::{
    api_client::{host_of, ApiClientBuilder},
    error::Error,
    scenario::Scenario,
};
use serde_json::Value;
use simtest::{HttpTransport, RecordingTransport, RedactOptions, Redactor, Simulation};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub domain_name: String,
    pub token: String,
    pub replacement_domain: String,
    pub output_dir: PathBuf,
    pub timeout: Duration,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct CaptureSummary {
    pub saved: Vec<PathBuf>,
    pub failed: Vec<String>,
}

/// Captures every scenario through a fresh recording transport, redacts it and
/// writes `<output_dir>/<name>.json`. A scenario that fails is reported and
/// skipped; failing to write a fixture aborts the run.
pub async fn capture_scenarios<T, F>(
    scenarios: &[Scenario],
    settings: &CaptureSettings,
    make_transport: F,
) -> Result<CaptureSummary, Error>
where
    T: HttpTransport + 'static,
    F: Fn() -> T,
{
    let options = RedactOptions::new(host_of(&settings.domain_name))
        .with_replacement_domain(settings.replacement_domain.as_str())
        .with_access_token(settings.token.as_str());
    let mut redactor = Redactor::new(options);
    let mut summary = CaptureSummary::default();

    for scenario in scenarios {
        info!("Capturing {}...", scenario.name);
        let transport = Arc::new(RecordingTransport::new(make_transport()));

        if let Err(e) = run_scenario(scenario, settings, transport.clone()).await {
            warn!("Capturing {} FAILED: {}", scenario.name, e);
            summary.failed.push(scenario.name.clone());
            continue;
        }

        let mut simulation = transport.take_simulation()?;
        label_pairs(&mut simulation, &scenario.name);

        redactor.reset();
        let simulation = redactor.redact(simulation);

        let path = fixture_path(&settings.output_dir, &scenario.name);
        simtest::save_simulation(&path, &simulation)?;
        info!("Capturing {} OK ({} pairs)", scenario.name, simulation.len());
        summary.saved.push(path);
    }

    Ok(summary)
}

async fn run_scenario<T: HttpTransport + 'static>(
    scenario: &Scenario,
    settings: &CaptureSettings,
    transport: Arc<RecordingTransport<T>>,
) -> Result<(), Error> {
    let client = ApiClientBuilder::new()
        .with_domain_name(settings.domain_name.as_str())
        .with_token(settings.token.as_str())
        .with_transport(transport)
        .build();
    debug!("{} requests against {}", scenario.requests.len(), client.base_url());

    let requests = async {
        let mut previous: Option<Value> = None;
        for request in &scenario.requests {
            let request = request.resolve(previous.as_ref())?;
            let body = client.send(&request).await?;
            previous = serde_json::from_slice(&body).ok();
        }
        Ok::<_, Error>(())
    };

    tokio::time::timeout(settings.timeout, requests)
        .await
        .map_err(|_| Error::Timeout(settings.timeout))?
}

fn label_pairs(simulation: &mut Simulation, name: &str) {
    for pair in &mut simulation.pairs {
        pair.description = Some(String::from(name));
    }
}

fn fixture_path(output_dir: &Path, name: &str) -> PathBuf {
    output_dir.join(format!("{}.json", name))
}
