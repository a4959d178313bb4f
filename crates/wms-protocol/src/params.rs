//! Request parameter store.
//!
//! Parameter names are case-insensitive; values are case-sensitive and have
//! URL escapes (`%2F`, `+`) translated.

use std::collections::HashMap;

use wms_common::{WmsError, WmsResult};

/// Decoded query-string parameters for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterStore {
    params: HashMap<String, String>,
}

impl ParameterStore {
    /// Parse a raw (still URL-encoded) query string.
    ///
    /// Pairs that do not contain exactly one `=` are skipped. A repeated key
    /// keeps its last value.
    pub fn parse(query: &str) -> Self {
        let mut params = HashMap::new();
        for pair in query.split('&') {
            let mut parts = pair.split('=');
            let (Some(key), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
                continue;
            };
            params.insert(key.to_lowercase(), decode_value(value));
        }
        Self { params }
    }

    /// Value of a required parameter.
    pub fn get(&self, name: &str) -> WmsResult<&str> {
        self.get_opt(name)
            .ok_or_else(|| WmsError::MissingParameter(name.to_lowercase()))
    }

    /// Value of an optional parameter, or `default` (returned unvalidated).
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get_opt(name).unwrap_or(default)
    }

    pub fn get_opt(&self, name: &str) -> Option<&str> {
        self.params.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

fn decode_value(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    let decoded = match urlencoding::decode(&spaced) {
        Ok(value) => value.into_owned(),
        Err(_) => spaced,
    };
    decoded.trim().to_string()
}
