use crate::error::Error;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, fs, path::Path};

lazy_static! {
    /// `{items[0].id}`: a field path into the previous JSON response.
    static ref PLACEHOLDER_REGEX: Regex = Regex::new(r"\{([A-Za-z_][A-Za-z0-9_.\[\]]*)\}").unwrap();
}

/// A named group of requests whose exchanges end up in one fixture file.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub requests: Vec<ScenarioRequest>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ScenarioRequest {
    #[serde(default = "default_method")]
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub query: BTreeMap<String, String>,
}

impl ScenarioRequest {
    /// Fills `{field.path}` placeholders in the path and query values from the
    /// previous response of the same scenario. Array elements are addressed as
    /// `items[0]`.
    pub fn resolve(&self, previous: Option<&Value>) -> Result<ScenarioRequest, Error> {
        let mut query = BTreeMap::new();
        for (key, value) in &self.query {
            query.insert(key.clone(), fill(value, previous)?);
        }

        Ok(ScenarioRequest {
            method: self.method.clone(),
            path: fill(&self.path, previous)?,
            query,
        })
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Default)]
pub struct ScenarioFile {
    pub scenarios: Vec<Scenario>,
}

impl ScenarioFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::ReadScenarios {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&contents).map_err(|source| Error::ParseScenarios {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn default_method() -> String {
    String::from("GET")
}

fn fill(template: &str, previous: Option<&Value>) -> Result<String, Error> {
    let mut filled = String::with_capacity(template.len());
    let mut last = 0;
    for captures in PLACEHOLDER_REGEX.captures_iter(template) {
        let (whole, selector) = match (captures.get(0), captures.get(1)) {
            (Some(whole), Some(selector)) => (whole, selector.as_str()),
            _ => continue,
        };
        filled.push_str(&template[last..whole.start()]);
        filled.push_str(&lookup(previous, selector)?);
        last = whole.end();
    }
    filled.push_str(&template[last..]);

    Ok(filled)
}

fn lookup(previous: Option<&Value>, selector: &str) -> Result<String, Error> {
    let pointer = format!(
        "/{}",
        selector.replace('.', "/").replace('[', "/").replace(']', "")
    );

    match previous.and_then(|value| value.pointer(&pointer)) {
        Some(Value::String(text)) => Ok(text.clone()),
        Some(Value::Number(number)) => Ok(number.to_string()),
        Some(Value::Bool(flag)) => Ok(flag.to_string()),
        _ => Err(Error::MissingValue {
            selector: String::from(selector),
        }),
    }
}
