//! Request payloads and error-detail DTOs for the storefront API.
//!
//! # Design
//! Success bodies stay untyped (`serde_json::Value`): the client is shared
//! by every storefront page and does not know their schemas. Only the
//! `detail` field of error bodies is modelled, because the presenter needs
//! to walk validation records.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Ordered `name=value` pairs, encoded as `application/x-www-form-urlencoded`.
///
/// Used both as a GET query string and as a pre-encoded form body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    pairs: Vec<(String, String)>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append; repeated names are kept in insertion order.
    pub fn append(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.pairs.push((name.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn encode(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter())
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SearchParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Body handed to POST/PUT.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Serialized as JSON when the content type is JSON.
    Json(Value),
    /// Already form data; always sent url-encoded, untouched.
    Form(SearchParams),
    /// Sent verbatim. The caller is responsible for the encoding.
    Raw(String),
}

impl Payload {
    pub fn json<T: Serialize>(value: &T) -> Result<Self, ApiError> {
        serde_json::to_value(value)
            .map(Payload::Json)
            .map_err(|e| ApiError::Serialization(e.to_string()))
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<SearchParams> for Payload {
    fn from(params: SearchParams) -> Self {
        Payload::Form(params)
    }
}

/// One element of a validation error location, e.g. `["body", "items", 0]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LocSegment {
    Index(i64),
    Key(String),
}

impl fmt::Display for LocSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocSegment::Index(i) => write!(f, "{i}"),
            LocSegment::Key(k) => f.write_str(k),
        }
    }
}

/// A single field-validation record as emitted by the API on 422.
///
/// Every field is optional on the wire; missing ones are rendered with
/// placeholders by the presenter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    #[serde(default)]
    pub loc: Vec<LocSegment>,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl FieldError {
    /// The offending field: the last segment of `loc`.
    pub fn field(&self) -> Option<&LocSegment> {
        self.loc.last()
    }
}

/// The API's `detail` field, classified for presentation.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    Message(String),
    Validation(Vec<FieldError>),
    Other(Value),
}

impl ErrorDetail {
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => ErrorDetail::Message(s.clone()),
            Value::Array(_) => match Vec::<FieldError>::deserialize(value) {
                Ok(errors) => ErrorDetail::Validation(errors),
                Err(_) => ErrorDetail::Other(value.clone()),
            },
            other => ErrorDetail::Other(other.clone()),
        }
    }
}
