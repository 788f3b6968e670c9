use crate::error::Error;
use async_trait::async_trait;
use hyper::{client::HttpConnector, Body, Client, Request, Response};
use hyper_tls::HttpsConnector;
use std::fmt::Debug;

/// A single request/response exchange with some HTTP service.
#[async_trait]
pub trait HttpTransport: Debug + Send + Sync {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, Error>;
}

/// Production transport that talks to the network over HTTP or HTTPS.
#[derive(Debug, Clone)]
pub struct HyperTransport {
    client: Client<HttpsConnector<HttpConnector>>,
}

impl HyperTransport {
    pub fn new() -> Self {
        Self {
            client: Client::builder().build(HttpsConnector::new()),
        }
    }
}

#[async_trait]
impl HttpTransport for HyperTransport {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, Error> {
        Ok(self.client.request(request).await?)
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for std::sync::Arc<T> {
    async fn round_trip(&self, request: Request<Body>) -> Result<Response<Body>, Error> {
        (**self).round_trip(request).await
    }
}
