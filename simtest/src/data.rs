use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

/// An ordered set of recorded exchanges. During replay the first pair whose
/// request matches wins, so order is part of the fixture.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    pub pairs: Vec<Pair>,
}

impl Simulation {
    pub fn new(pairs: Vec<Pair>) -> Self {
        Self { pairs }
    }

    /// Appends the pairs of `other` after the pairs of `self`.
    pub fn extend(&mut self, other: Simulation) {
        self.pairs.extend(other.pairs);
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// One recorded request/response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pair {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub request: RequestData,
    pub response: ResponseData,
}

impl Pair {
    pub fn new(request: RequestData, response: ResponseData) -> Self {
        Self {
            description: None,
            request,
            response,
        }
    }

    pub fn with_description<S: Into<String>>(mut self, description: S) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// The match key of a pair. `query` only lists the parameters the fixture
/// constrains; anything else on an incoming request is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestData {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
}

impl RequestData {
    pub fn new<S1: Into<String>, S2: Into<String>>(method: S1, path: S2) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            query: BTreeMap::new(),
        }
    }

    pub fn with_query<S1: Into<String>, S2: Into<String>>(mut self, key: S1, value: S2) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseData {
    /// Zero means "not set" and is served as 200.
    #[serde(default)]
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// A fixture without a body serves an empty one.
    #[serde(default)]
    pub body: Body,
}

impl ResponseData {
    pub fn new(status: u16, body: Body) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body,
        }
    }

    pub fn with_header<S1: Into<String>, S2: Into<String>>(mut self, name: S1, value: S2) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn status_or_default(&self) -> u16 {
        match self.status {
            0 => 200,
            status => status,
        }
    }
}

/// A recorded response payload.
///
/// In the fixture file a `Json` body is stored as the JSON value itself and an
/// `Opaque` body (XML, plain text, ...) as a JSON string literal, which keeps the
/// fixture valid JSON whatever the payload was. Reading a fixture maps every
/// string literal back to `Opaque`.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Opaque(String),
}

impl Body {
    /// The bytes a client should receive for this body.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Body::Json(value) => value.to_string().into_bytes(),
            Body::Opaque(text) => text.clone().into_bytes(),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::Opaque(String::new())
    }
}

impl Serialize for Body {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Body::Json(value) => value.serialize(serializer),
            Body::Opaque(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for Body {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => Body::Opaque(text),
            value => Body::Json(value),
        })
    }
}
