use crate::{error::Error, scenario::ScenarioRequest};
use hyper::{body, header, Body, Request};
use simtest::{HttpTransport, HyperTransport};
use std::{collections::BTreeMap, sync::Arc};
use tracing::debug;

const USER_AGENT: &str = concat!("simtest-capture/", env!("CARGO_PKG_VERSION"));

/// Builder used to build an ApiClient instance
#[derive(Debug, Clone, Default)]
pub struct ApiClientBuilder {
    domain_name: Option<String>,
    token: Option<String>,
    transport: Option<Arc<dyn HttpTransport>>,
}

impl ApiClientBuilder {
    pub fn new() -> Self {
        Self {
            domain_name: None,
            token: None,
            transport: None,
        }
    }

    /// Use the given domain name, with or without a scheme. A bare domain is
    /// reached over HTTPS.
    pub fn with_domain_name<T: Into<String>>(mut self, domain_name: T) -> Self {
        self.domain_name = Some(domain_name.into());
        self
    }

    /// Send the given access token with every request.
    pub fn with_token<T: Into<String>>(mut self, token: T) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Send every request through `transport` instead of the network.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(mut self) -> ApiClient {
        ApiClient {
            base_url: base_url(self.domain_name.take().unwrap_or_default().as_str()),
            token: self.token.take().unwrap_or_default(),
            transport: self
                .transport
                .take()
                .unwrap_or_else(|| Arc::new(HyperTransport::new())),
        }
    }
}

/// Sends scenario requests the same way the client under test talks to the
/// live API: token and format as query parameters, JSON accepted.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    token: String,
    transport: Arc<dyn HttpTransport>,
}

impl ApiClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends one request and returns the response body. Any status of 400 or
    /// above is an error.
    pub async fn send(&self, scenario_request: &ScenarioRequest) -> Result<Vec<u8>, Error> {
        let url = self.url(scenario_request);
        debug!(
            "{} {}",
            scenario_request.method,
            simtest::redact_token(&url)
        );

        let request = Request::builder()
            .method(scenario_request.method.as_str())
            .uri(url)
            .header(header::ACCEPT, "application/json")
            .header(header::USER_AGENT, USER_AGENT)
            .body(Body::empty())?;

        let response = self.transport.round_trip(request).await?;
        let status = response.status();
        let bytes = body::to_bytes(response.into_body()).await?;
        debug!("HTTP {}, {} bytes", status.as_u16(), bytes.len());

        if status.as_u16() >= 400 {
            return Err(Error::ErrorStatus {
                status: status.as_u16(),
                method: scenario_request.method.clone(),
                path: scenario_request.path.clone(),
            });
        }

        Ok(bytes.to_vec())
    }

    fn url(&self, scenario_request: &ScenarioRequest) -> String {
        let mut params: BTreeMap<&str, &str> = scenario_request
            .query
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect();
        params.insert("access_token", &self.token);
        params.insert("format", "json");

        let query = params
            .iter()
            .map(|(key, value)| {
                format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
            })
            .collect::<Vec<_>>()
            .join("&");

        format!("{}{}?{}", self.base_url, scenario_request.path, query)
    }
}

fn base_url(domain_name: &str) -> String {
    let domain_name = domain_name.trim_end_matches('/');
    if domain_name.starts_with("http://") || domain_name.starts_with("https://") {
        String::from(domain_name)
    } else {
        format!("https://{}", domain_name)
    }
}

/// The bare host of a domain setting, as it appears inside payloads.
pub fn host_of(domain_name: &str) -> &str {
    let domain_name = domain_name.trim_end_matches('/');
    domain_name
        .strip_prefix("https://")
        .or_else(|| domain_name.strip_prefix("http://"))
        .unwrap_or(domain_name)
}
