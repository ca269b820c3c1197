//! Stateless request builder for the storefront API.
//!
//! # Design
//! `RequestClient` holds only the base origin and the default content type.
//! Every method builds an `HttpRequest` as plain data; `parse_response`
//! hands a completed response to the normalizer. Executing the round-trip
//! is left to a `Transport` (see `ApiClient`).

use serde_json::Value;
use tracing::debug;

use crate::config::{ClientConfig, DEFAULT_CONTENT_TYPE};
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::normalize::normalize;
use crate::types::{Payload, SearchParams};

/// Content type for a pre-encoded form body (`Payload::Form`).
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Synchronous, stateless request builder bound to one origin.
#[derive(Debug, Clone)]
pub struct RequestClient {
    base_url: String,
    default_content_type: String,
}

impl RequestClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            default_content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            default_content_type: config.default_content_type.clone(),
            ..Self::new(&config.base_url)
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `endpoint`, with `?<params>` appended only when `params` is
    /// present and non-empty.
    pub fn build_get(&self, endpoint: &str, params: Option<&SearchParams>, token: Option<&str>) -> HttpRequest {
        let mut url = self.url(endpoint);
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            url.push('?');
            url.push_str(&params.encode());
        }
        HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: auth_headers(token),
            body: None,
        }
    }

    /// POST `payload` with the given content type, or the configured default.
    pub fn build_post(
        &self,
        endpoint: &str,
        payload: &Payload,
        content_type: Option<&str>,
        token: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let content_type = content_type.unwrap_or(&self.default_content_type);
        let body = encode_body(payload, content_type)?;
        let mut headers = vec![("content-type".to_string(), content_type.to_string())];
        headers.extend(auth_headers(token));
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.url(endpoint),
            headers,
            body: Some(body),
        })
    }

    /// PUT always sends JSON, whatever the default content type is.
    pub fn build_put(&self, endpoint: &str, payload: &Value, token: Option<&str>) -> Result<HttpRequest, ApiError> {
        let body = serde_json::to_string(payload).map_err(|e| ApiError::Serialization(e.to_string()))?;
        let mut headers = vec![("content-type".to_string(), DEFAULT_CONTENT_TYPE.to_string())];
        headers.extend(auth_headers(token));
        Ok(HttpRequest {
            method: HttpMethod::Put,
            url: self.url(endpoint),
            headers,
            body: Some(body),
        })
    }

    pub fn build_delete(&self, endpoint: &str, token: Option<&str>) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Delete,
            url: self.url(endpoint),
            headers: auth_headers(token),
            body: None,
        }
    }

    /// Single entry point over the four builders.
    ///
    /// For GET a `Payload::Form` is used as the query string; any other
    /// payload on GET or DELETE is dropped. PUT requires a JSON payload and
    /// ignores `content_type`.
    pub fn build_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        payload: Option<&Payload>,
        content_type: Option<&str>,
        token: Option<&str>,
    ) -> Result<HttpRequest, ApiError> {
        let request = match method {
            HttpMethod::Get => {
                let params = match payload {
                    Some(Payload::Form(params)) => Some(params),
                    _ => None,
                };
                self.build_get(endpoint, params, token)
            }
            HttpMethod::Post => {
                let empty = Payload::Json(Value::Null);
                self.build_post(endpoint, payload.unwrap_or(&empty), content_type, token)?
            }
            HttpMethod::Put => match payload {
                Some(Payload::Json(value)) => self.build_put(endpoint, value, token)?,
                None => self.build_put(endpoint, &Value::Null, token)?,
                Some(_) => {
                    return Err(ApiError::Serialization(
                        "PUT bodies must be JSON".to_string(),
                    ))
                }
            },
            HttpMethod::Delete => self.build_delete(endpoint, token),
        };
        debug!(
            method = %request.method,
            url = %request.url,
            authenticated = token.is_some(),
            "built request"
        );
        Ok(request)
    }

    pub fn parse_response(&self, response: &HttpResponse) -> Result<Value, ApiError> {
        normalize(response)
    }

    fn url(&self, endpoint: &str) -> String {
        if endpoint.starts_with('/') {
            format!("{}{endpoint}", self.base_url)
        } else {
            format!("{}/{endpoint}", self.base_url)
        }
    }
}

fn auth_headers(token: Option<&str>) -> Vec<(String, String)> {
    token
        .map(|t| vec![("authorization".to_string(), format!("Bearer {t}"))])
        .unwrap_or_default()
}

/// Compares the media type only, so `application/json; charset=utf-8`
/// still counts as JSON.
fn is_json(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case(DEFAULT_CONTENT_TYPE))
        .unwrap_or(false)
}

fn encode_body(payload: &Payload, content_type: &str) -> Result<String, ApiError> {
    match payload {
        Payload::Form(params) => Ok(params.encode()),
        Payload::Json(value) if is_json(content_type) => {
            serde_json::to_string(value).map_err(|e| ApiError::Serialization(e.to_string()))
        }
        Payload::Json(Value::String(s)) => Ok(s.clone()),
        Payload::Json(value) => Ok(value.to_string()),
        Payload::Raw(raw) => Ok(raw.clone()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client() -> RequestClient {
        RequestClient::new("http://localhost:8000")
    }

    #[test]
    fn get_without_params_has_no_query() {
        let req = client().build_get("/products/", None, None);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:8000/products/");
        assert!(!req.url.contains('?'));
        assert!(req.headers.is_empty());
        assert!(req.body.is_none());
    }

    #[test]
    fn get_with_empty_params_has_no_query() {
        let params = SearchParams::new();
        let req = client().build_get("/products/", Some(&params), None);
        assert!(!req.url.contains('?'));
    }

    #[test]
    fn get_with_params_appends_encoded_query() {
        let params = SearchParams::new().append("name", "café").append("product_id", "3");
        let req = client().build_get("/products/", Some(&params), Some("tok"));
        assert_eq!(req.url, "http://localhost:8000/products/?name=caf%C3%A9&product_id=3");
        assert_eq!(req.header("Authorization"), Some("Bearer tok"));
    }

    #[test]
    fn post_json_serializes_payload() {
        let payload = Payload::Json(json!({"name": "Caneca", "price": 12.5, "QT": 3}));
        let req = client().build_post("/products/", &payload, None, Some("abc")).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("authorization"), Some("Bearer abc"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "Caneca", "price": 12.5, "QT": 3}));
    }

    #[test]
    fn post_form_passes_through() {
        let form = SearchParams::new().append("username", "ana").append("password", "s3cr3t!");
        let req = client()
            .build_post("/auth/token", &Payload::Form(form), Some(FORM_CONTENT_TYPE), None)
            .unwrap();
        assert_eq!(req.header("content-type"), Some("application/x-www-form-urlencoded"));
        assert_eq!(req.body.as_deref(), Some("username=ana&password=s3cr3t%21"));
        assert!(req.header("authorization").is_none());
    }

    #[test]
    fn post_form_ignores_json_content_type() {
        let form = SearchParams::new().append("a", "1");
        let req = client().build_post("/x", &Payload::Form(form), None, None).unwrap();
        assert_eq!(req.body.as_deref(), Some("a=1"));
        assert_eq!(req.header("content-type"), Some("application/json"));
    }

    #[test]
    fn post_raw_with_other_content_type_is_verbatim() {
        let payload = Payload::Raw("<xml/>".to_string());
        let req = client().build_post("/x", &payload, Some("text/xml"), None).unwrap();
        assert_eq!(req.body.as_deref(), Some("<xml/>"));
        assert_eq!(req.header("content-type"), Some("text/xml"));
    }

    #[test]
    fn post_json_string_with_other_content_type_is_bare_text() {
        let payload = Payload::Json(json!("plain text"));
        let req = client().build_post("/x", &payload, Some("text/plain"), None).unwrap();
        assert_eq!(req.body.as_deref(), Some("plain text"));
    }

    #[test]
    fn json_content_type_with_charset_still_serializes() {
        let payload = Payload::Json(json!("quoted"));
        let req = client()
            .build_post("/x", &payload, Some("application/json; charset=utf-8"), None)
            .unwrap();
        assert_eq!(req.body.as_deref(), Some("\"quoted\""));
    }

    #[test]
    fn configured_default_content_type_applies_to_post() {
        let config = ClientConfig::new("http://localhost:8000").with_default_content_type("text/plain");
        let client = RequestClient::from_config(&config);
        let req = client.build_post("/x", &Payload::Raw("hi".to_string()), None, None).unwrap();
        assert_eq!(req.header("content-type"), Some("text/plain"));
    }

    #[test]
    fn put_forces_json() {
        let config = ClientConfig::new("http://localhost:8000").with_default_content_type("text/plain");
        let client = RequestClient::from_config(&config);
        let req = client.build_put("/items/5", &json!({"QT": 1}), Some("t")).unwrap();
        assert_eq!(req.method, HttpMethod::Put);
        assert_eq!(req.url, "http://localhost:8000/items/5");
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("authorization"), Some("Bearer t"));
        assert_eq!(req.body.as_deref(), Some(r#"{"QT":1}"#));
    }

    #[test]
    fn delete_has_no_body_or_content_type() {
        let req = client().build_delete("/products/9", Some("t"));
        assert_eq!(req.method, HttpMethod::Delete);
        assert!(req.body.is_none());
        assert!(req.header("content-type").is_none());
        assert_eq!(req.headers.len(), 1);
    }

    #[test]
    fn authorization_present_iff_token_for_every_method() {
        let c = client();
        let payload = Payload::Json(json!({}));
        for method in [HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete] {
            let with = c.build_request(method, "/x", Some(&payload), None, Some("tok")).unwrap();
            let auth: Vec<_> = with
                .headers
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case("authorization"))
                .collect();
            assert_eq!(auth.len(), 1, "{method}");
            assert_eq!(auth[0].1, "Bearer tok", "{method}");

            let without = c.build_request(method, "/x", Some(&payload), None, None).unwrap();
            assert!(without.header("authorization").is_none(), "{method}");
        }
    }

    #[test]
    fn build_request_get_uses_form_as_query() {
        let params = Payload::Form(SearchParams::new().append("skip", "10"));
        let req = client()
            .build_request(HttpMethod::Get, "/users/", Some(&params), None, None)
            .unwrap();
        assert_eq!(req.url, "http://localhost:8000/users/?skip=10");
        assert!(req.body.is_none());
    }

    #[test]
    fn build_request_put_rejects_form() {
        let form = Payload::Form(SearchParams::new().append("a", "b"));
        let err = client()
            .build_request(HttpMethod::Put, "/x", Some(&form), None, None)
            .unwrap_err();
        assert!(matches!(err, ApiError::Serialization(_)));
    }

    #[test]
    fn trailing_slash_is_stripped_and_leading_slash_added() {
        let client = RequestClient::new("http://localhost:8000/");
        let req = client.build_delete("products/1", None);
        assert_eq!(req.url, "http://localhost:8000/products/1");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
