//! Turns a completed `HttpResponse` into the decoded body or an `ApiError`.

use serde_json::{json, Value};
use tracing::warn;

use crate::error::ApiError;
use crate::http::HttpResponse;

/// Message returned in place of a body for 204 responses.
pub const NO_CONTENT_MESSAGE: &str = "Operação realizada com sucesso (Status 204 No Content).";

/// The value a 204 resolves to: `{"message": NO_CONTENT_MESSAGE}`.
pub fn no_content() -> Value {
    json!({ "message": NO_CONTENT_MESSAGE })
}

/// Normalize a response.
///
/// - 204: the synthetic `no_content()` object; the body is ignored.
/// - other 2xx: the body parsed as JSON.
/// - non-2xx with a JSON body: `ApiError::Api` carrying its `detail`.
/// - non-2xx otherwise: `ApiError::Status`.
pub fn normalize(response: &HttpResponse) -> Result<Value, ApiError> {
    if response.status == 204 {
        return Ok(no_content());
    }

    if !response.is_success() {
        let body: Value = match serde_json::from_str(&response.body) {
            Ok(body) => body,
            Err(_) => {
                warn!(status = response.status, "non-JSON error response");
                return Err(ApiError::Status {
                    status: response.status,
                });
            }
        };
        warn!(status = response.status, "API error response");
        let detail = body.get("detail").cloned();
        return Err(ApiError::Api {
            status: response.status,
            detail,
            body,
        });
    }

    serde_json::from_str(&response.body).map_err(|e| ApiError::Deserialization(e.to_string()))
}
