//! Serializable capture of an inbound request, for replay.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

/// Everything a handler needs to process a request again later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
    pub method: String,
    pub path: String,
    pub user_name: String,
    #[serde(default)]
    pub path_params: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Vec<u8>,
    /// Replays already attempted for this request.
    #[serde(default)]
    pub attempt: u32,
}

impl RequestSnapshot {
    /// Captures a request with no path parameters and an empty body.
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            user_name: user_name.into(),
            path_params: BTreeMap::new(),
            body: Vec::new(),
            attempt: 0,
        }
    }

    /// Adds a path parameter.
    pub fn with_path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Sets the raw body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Sets the body to the JSON encoding of `value`.
    pub fn with_json<T: Serialize>(self, value: &T) -> serde_json::Result<Self> {
        Ok(self.with_body(serde_json::to_vec(value)?))
    }

    /// Returns a path parameter.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Returns true if this request is being processed by the retry worker.
    pub fn is_replay(&self) -> bool {
        self.attempt > 0
    }
}
