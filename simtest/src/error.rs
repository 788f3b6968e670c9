use hyper::http;
use std::{io, path::PathBuf, sync};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("reading simulation {}: {source}", path.display())]
    ReadSimulation { path: PathBuf, source: io::Error },
    #[error("parsing simulation {}: {source}", path.display())]
    ParseSimulation {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("reading simulation directory {}: {source}", path.display())]
    ReadSimulationDir { path: PathBuf, source: io::Error },
    #[error("encoding simulation: {0}")]
    EncodeSimulation(serde_json::Error),
    #[error("writing simulation {}: {source}", path.display())]
    WriteSimulation { path: PathBuf, source: io::Error },
    #[error("IoError: {0}")]
    IoError(#[from] io::Error),
    #[error("The lock was poisoned")]
    PoisonedLock,
    #[error("The status code {0} is invalid")]
    InvalidStatusCode(u16),
    #[error("Invalid header name")]
    InvalidHeaderName,
    #[error("Invalid header value")]
    InvalidHeaderValue,
    #[error("Hyper error: {0}")]
    HyperError(#[from] hyper::Error),
    #[error("Http Error: {0}")]
    HttpError(#[from] http::Error),
    #[error("The simulation server thread exited before it started listening")]
    ServerStartup,
}

impl<T> From<sync::PoisonError<T>> for Error {
    fn from(_: sync::PoisonError<T>) -> Self {
        Error::PoisonedLock
    }
}

impl From<hyper::header::InvalidHeaderName> for Error {
    fn from(_: hyper::header::InvalidHeaderName) -> Self {
        Error::InvalidHeaderName
    }
}

impl From<hyper::header::InvalidHeaderValue> for Error {
    fn from(_: hyper::header::InvalidHeaderValue) -> Self {
        Error::InvalidHeaderValue
    }
}
