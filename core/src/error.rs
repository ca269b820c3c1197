//! Error types for the storefront API client.
//!
//! # Design
//! HTTP failures split on whether the error body was JSON: `Status` keeps
//! only the code, `Api` keeps the decoded `detail` field untouched so callers
//! can inspect it programmatically. The `Display` strings are the user-facing
//! defaults the presenter falls back to.

use serde_json::Value;
use thiserror::Error;

use crate::types::ErrorDetail;

/// Errors returned by the client, the normalizer and the transport.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS, I/O
    /// while reading the body).
    #[error("Falha de rede: {0}")]
    Transport(String),

    /// Non-2xx status whose body was not JSON.
    #[error("Erro HTTP! status: {status}")]
    Status { status: u16 },

    /// Non-2xx status with a JSON body. `detail` is the body's `detail`
    /// field as received, `None` when the body had none.
    #[error("Erro da API")]
    Api {
        status: u16,
        detail: Option<Value>,
        body: Value,
    },

    /// A 2xx body that was not valid JSON.
    #[error("Resposta inválida da API: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("Falha ao serializar o corpo da requisição: {0}")]
    Serialization(String),

    /// Missing or malformed client configuration.
    #[error("Configuração inválida: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status } | ApiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw `detail` field of an API error body.
    pub fn detail(&self) -> Option<&Value> {
        match self {
            ApiError::Api { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    /// `detail` classified as message, validation list or opaque value.
    /// A JSON `null` or empty-string detail counts as absent.
    pub fn error_detail(&self) -> Option<ErrorDetail> {
        self.detail()
            .filter(|d| !d.is_null() && d.as_str() != Some(""))
            .map(ErrorDetail::from_value)
    }
}
