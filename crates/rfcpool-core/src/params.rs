//! Opaque connection parameters

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Connection parameters handed verbatim to the [`crate::ConnectionFactory`].
///
/// The pool never interprets these; keys such as `ashost`, `client` or
/// `user` only mean something to the backend-specific factory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionParameters {
    params: HashMap<String, String>,
}

impl ConnectionParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a parameter, converting JSON scalars to their string form
    pub fn with_param(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        let str_val = match value.into() {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        self.params.insert(key.to_string(), str_val);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Keys present, without values; safe to log
    pub fn keys(&self) -> Vec<&str> {
        self.params.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl FromIterator<(String, String)> for ConnectionParameters {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}
