use crate::{
    data::{Body, Pair, RequestData, ResponseData, Simulation},
    error::Error,
    http_client::HttpTransport,
    util::{self, ACCESS_TOKEN_PARAM, FORMAT_PARAM},
};
use async_trait::async_trait;
use hyper::{body, header::CONTENT_TYPE, Request, Response};
use std::{collections::BTreeMap, mem, sync::Mutex};
use tracing::debug;

/// Wraps another transport and records every exchange that went through it.
///
/// The caller sees exactly what the wrapped transport returned; the response
/// body is buffered and handed back as a fresh body.
#[derive(Debug)]
pub struct RecordingTransport<T> {
    base: T,
    pairs: Mutex<Vec<Pair>>,
}

impl<T: HttpTransport> RecordingTransport<T> {
    pub fn new(base: T) -> Self {
        Self {
            base,
            pairs: Mutex::new(Vec::new()),
        }
    }

    pub fn base(&self) -> &T {
        &self.base
    }

    /// A copy of the pairs recorded so far, in the order they were observed.
    pub fn pairs(&self) -> Result<Vec<Pair>, Error> {
        Ok(self.pairs.lock()?.clone())
    }

    pub fn build_simulation(&self) -> Result<Simulation, Error> {
        Ok(Simulation::new(self.pairs()?))
    }

    /// Drains the recorded pairs, leaving the transport ready for a new run.
    pub fn take_simulation(&self) -> Result<Simulation, Error> {
        let mut pairs = self.pairs.lock()?;
        Ok(Simulation::new(mem::take(&mut *pairs)))
    }

    fn request_data(request: &Request<hyper::Body>) -> RequestData {
        let mut query = BTreeMap::new();
        for (key, value) in util::parse_query(request.uri().query()) {
            if key == ACCESS_TOKEN_PARAM || key == FORMAT_PARAM {
                continue;
            }
            query.entry(key).or_insert(value);
        }

        RequestData {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            query,
        }
    }

    fn response_body(content_type: Option<&str>, bytes: &[u8]) -> Body {
        let text = String::from_utf8_lossy(bytes);
        let trimmed = text.trim_start();
        let looks_like_json = content_type.map_or(false, |ct| ct.contains("json"))
            || trimmed.starts_with('{')
            || trimmed.starts_with('[');

        if looks_like_json {
            if let Ok(value) = serde_json::from_slice(bytes) {
                return Body::Json(value);
            }
        }

        Body::Opaque(text.into_owned())
    }
}

#[async_trait]
impl<T: HttpTransport> HttpTransport for RecordingTransport<T> {
    async fn round_trip(
        &self,
        request: Request<hyper::Body>,
    ) -> Result<Response<hyper::Body>, Error> {
        let request_data = Self::request_data(&request);
        debug!(
            "recording {} {}",
            request_data.method,
            util::redact_token(&request.uri().to_string())
        );

        let response = self.base.round_trip(request).await?;
        let (parts, response_body) = response.into_parts();
        let bytes = body::to_bytes(response_body).await?;

        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());

        let mut headers = BTreeMap::new();
        if let Some(content_type) = content_type {
            headers.insert(String::from("Content-Type"), String::from(content_type));
        }

        let response_data = ResponseData {
            status: parts.status.as_u16(),
            body: Self::response_body(content_type, &bytes),
            headers,
        };

        debug!(
            "recorded {} {} -> {} ({} bytes)",
            request_data.method,
            request_data.path,
            response_data.status,
            bytes.len()
        );
        self.pairs.lock()?.push(Pair::new(request_data, response_data));

        Ok(Response::from_parts(parts, hyper::Body::from(bytes)))
    }
}
