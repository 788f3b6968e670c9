use hyper::http;
use std::{io, path::PathBuf, time::Duration};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP {status} from {method} {path}")]
    ErrorStatus {
        status: u16,
        method: String,
        path: String,
    },
    #[error("placeholder {selector} has no value in the previous response")]
    MissingValue { selector: String },
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] http::Error),
    #[error("reading response: {0}")]
    ReadResponse(#[from] hyper::Error),
    #[error("reading scenarios {}: {source}", path.display())]
    ReadScenarios { path: PathBuf, source: io::Error },
    #[error("parsing scenarios {}: {source}", path.display())]
    ParseScenarios {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Simulation(#[from] simtest::Error),
}
