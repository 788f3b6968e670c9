use crate::error::Error;
use hyper::{
    header::{HeaderName, HeaderValue},
    HeaderMap,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

pub(crate) const ACCESS_TOKEN_PARAM: &str = "access_token";
pub(crate) const FORMAT_PARAM: &str = "format";

lazy_static! {
    static ref ACCESS_TOKEN_REGEX: Regex = Regex::new(r"(access_token=)[^&]*").unwrap();
}

pub fn extract_headers(header_map: &HeaderMap) -> HashMap<String, String> {
    // it currently ignores header values with opaque characters
    header_map
        .iter()
        .map(|(k, v)| (String::from(k.as_str()), v.to_str()))
        .filter_map(|(key, value)| value.ok().map(|v| (key, String::from(v))))
        .collect::<HashMap<_, _>>()
}

pub fn put_headers<'a, I: IntoIterator<Item = (&'a String, &'a String)>>(
    header_map: &mut HeaderMap<HeaderValue>,
    headers: I,
) -> Result<(), Error> {
    for (key, value) in headers {
        let header_name = HeaderName::from_lowercase(key.to_lowercase().as_bytes())?;
        let header_value = HeaderValue::from_str(value)?;
        header_map.insert(header_name, header_value);
    }

    Ok(())
}

/// Splits a raw query string into decoded `(key, value)` pairs, keeping their
/// order. A parameter without `=` gets an empty value.
pub fn parse_query(query: Option<&str>) -> Vec<(String, String)> {
    query
        .unwrap_or_default()
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode_component(key), decode_component(value)),
            None => (decode_component(pair), String::new()),
        })
        .collect()
}

/// The first value carried for `key`, if any.
pub fn first_value<'a>(query: &'a [(String, String)], key: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.as_str())
}

/// Masks the access token of a URL so it can be logged.
pub fn redact_token(uri: &str) -> String {
    ACCESS_TOKEN_REGEX
        .replace_all(uri, "${1}REDACTED")
        .into_owned()
}

fn decode_component(component: &str) -> String {
    let plus_decoded = component.replace('+', " ");
    String::from_utf8_lossy(&urlencoding::decode_binary(plus_decoded.as_bytes())).into_owned()
}
