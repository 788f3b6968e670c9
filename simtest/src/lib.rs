mod data;
mod error;
mod fixture_manager;
mod http_client;
mod recording_transport;
pub mod redaction;
mod simulation_server;
mod util;

pub use data::{Body, Pair, RequestData, ResponseData, Simulation};
pub use error::{Error, Result};
pub use fixture_manager::{
    load_simulation, load_simulation_files, load_simulations_from_dir, save_simulation,
};
pub use http_client::{HttpTransport, HyperTransport};
pub use recording_transport::RecordingTransport;
pub use redaction::{RedactOptions, Redactor};
pub use simtest_codegen::simulation_test;
pub use simulation_server::{RecordedRequest, SimulationServer};
pub use util::redact_token;
