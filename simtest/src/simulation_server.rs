use crate::{
    data::{RequestData, ResponseData, Simulation},
    error::Error,
    util,
};
use hyper::{
    header::{HeaderValue, CONTENT_TYPE},
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server, StatusCode,
};
use std::{
    collections::HashMap,
    convert::Infallible,
    net::{SocketAddr, TcpListener},
    sync::{mpsc, Arc, Mutex, PoisonError},
    thread::{self, JoinHandle},
};
use tokio::{runtime::Runtime, sync::oneshot};
use tracing::{debug, error, info, warn};

/// An inbound request as seen by the simulation server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    /// Decoded query parameters in the order they were sent.
    pub query: Vec<(String, String)>,
    pub headers: HashMap<String, String>,
}

impl RecordedRequest {
    pub fn query_value(&self, key: &str) -> Option<&str> {
        util::first_value(&self.query, key)
    }
}

#[derive(Debug)]
struct ServerState {
    simulation: Simulation,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// An HTTP double that replays a [`Simulation`] on an ephemeral localhost port.
///
/// Requests are matched against the pairs in order and the first match is
/// served. Unmatched requests get a 404 naming the method and URL.
#[derive(Debug)]
pub struct SimulationServer {
    address: SocketAddr,
    state: Arc<ServerState>,
    shutdown: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl SimulationServer {
    /// Binds a listener and starts serving on a dedicated thread. Returns once
    /// the server accepts connections.
    pub fn start(simulation: Simulation) -> Result<Self, Error> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))?;
        listener.set_nonblocking(true)?;
        let address = listener.local_addr()?;

        let state = Arc::new(ServerState {
            simulation,
            requests: Mutex::new(Vec::new()),
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), Error>>();

        let server_state = state.clone();
        let join_handle = thread::spawn(move || {
            let runtime = match Runtime::new() {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = ready_tx.send(Err(e.into()));
                    return;
                }
            };

            runtime.block_on(async move {
                let builder = match Server::from_tcp(listener) {
                    Ok(builder) => builder,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.into()));
                        return;
                    }
                };

                let server = builder.serve(make_service_fn(move |_| {
                    let state = server_state.clone();
                    async move {
                        Ok::<_, Infallible>(service_fn(move |request| {
                            handle_request(state.clone(), request)
                        }))
                    }
                }));
                let _ = ready_tx.send(Ok(()));

                tokio::select! {
                    result = server => {
                        if let Err(e) = result {
                            error!("Simulation server error: {}", e);
                        }
                    }
                    _ = shutdown_rx => debug!("simulation server on {} shutting down", address),
                }
            });
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = join_handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = join_handle.join();
                return Err(Error::ServerStartup);
            }
        }

        info!(
            "simulation server listening on {} with {} pairs",
            address,
            state.simulation.len()
        );
        Ok(Self {
            address,
            state,
            shutdown: Some(shutdown_tx),
            join_handle: Some(join_handle),
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Base URL of the server, without a trailing slash.
    pub fn url(&self) -> String {
        format!("http://{}", self.address)
    }

    pub fn simulation(&self) -> &Simulation {
        &self.state.simulation
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Stops the listener and waits for the server thread. In-flight
    /// connections are dropped. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            if join_handle.join().is_err() {
                error!("simulation server thread on {} panicked", self.address);
            }
        }
    }
}

impl Drop for SimulationServer {
    fn drop(&mut self) {
        self.close();
    }
}

async fn handle_request(
    state: Arc<ServerState>,
    request: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    let recorded = RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        query: util::parse_query(request.uri().query()),
        headers: util::extract_headers(request.headers()),
    };
    debug!(
        "simulation request {} {}",
        recorded.method,
        util::redact_token(&request.uri().to_string())
    );
    state
        .requests
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(recorded.clone());

    // First match wins, in fixture order.
    let matched = state
        .simulation
        .pairs
        .iter()
        .find(|pair| request_matches(&recorded, &pair.request));

    let response = match matched {
        Some(pair) => build_response(&pair.response).unwrap_or_else(|e| {
            error!(
                "cannot serve simulation for {} {}: {}",
                recorded.method, recorded.path, e
            );
            plain_text(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("invalid simulation response: {}", e),
            )
        }),
        None => {
            warn!(
                "no matching simulation for {} {}",
                recorded.method,
                util::redact_token(&request.uri().to_string())
            );
            plain_text(
                StatusCode::NOT_FOUND,
                format!(
                    "no matching simulation for {} {}",
                    request.method(),
                    request.uri()
                ),
            )
        }
    };

    Ok(response)
}

/// Method and path must be equal; every query parameter the fixture pins must
/// be present with the same value. Other request parameters are ignored.
fn request_matches(request: &RecordedRequest, expected: &RequestData) -> bool {
    request.method == expected.method
        && request.path == expected.path
        && expected
            .query
            .iter()
            .all(|(key, value)| request.query_value(key) == Some(value.as_str()))
}

fn build_response(response_data: &ResponseData) -> Result<Response<Body>, Error> {
    let status = StatusCode::from_u16(response_data.status_or_default())
        .map_err(|_| Error::InvalidStatusCode(response_data.status))?;
    let mut response_builder = Response::builder().status(status);

    let headers = response_builder
        .headers_mut()
        .ok_or(Error::InvalidStatusCode(response_data.status))?;
    util::put_headers(headers, filter_headers(&response_data.headers))?;
    if !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    Ok(response_builder.body(response_data.body.to_bytes().into())?)
}

fn filter_headers<'a>(
    headers: &'a std::collections::BTreeMap<String, String>,
) -> impl Iterator<Item = (&'a String, &'a String)> + 'a {
    headers
        .iter()
        // Framing headers are recomputed for the served body.
        .filter(|(key, _)| {
            !key.eq_ignore_ascii_case("content-length")
                && !key.eq_ignore_ascii_case("transfer-encoding")
        })
}

fn plain_text(status: StatusCode, message: String) -> Response<Body> {
    let mut response = Response::new(Body::from(message));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    response
}
