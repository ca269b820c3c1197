//! `RequestClient` paired with a `Transport`: one call, one round-trip.

use serde_json::Value;

use crate::client::RequestClient;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest};
use crate::present::ErrorPresenter;
use crate::transport::{Transport, UreqTransport};
use crate::types::{Payload, SearchParams};

/// Executes storefront API calls and normalizes their responses.
///
/// Holds no mutable state; clones share the underlying transport.
#[derive(Debug, Clone)]
pub struct ApiClient<T = UreqTransport> {
    requests: RequestClient,
    presenter: ErrorPresenter,
    transport: T,
}

impl ApiClient<UreqTransport> {
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_transport(config, UreqTransport::new())
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(config: &ClientConfig, transport: T) -> Self {
        Self {
            requests: RequestClient::from_config(config),
            presenter: ErrorPresenter::from_config(config),
            transport,
        }
    }

    pub fn requests(&self) -> &RequestClient {
        &self.requests
    }

    /// Presenter in the configured `ErrorStyle`.
    pub fn presenter(&self) -> &ErrorPresenter {
        &self.presenter
    }

    /// Build, execute and normalize a request for any method.
    pub fn send_request(
        &self,
        method: HttpMethod,
        endpoint: &str,
        payload: Option<&Payload>,
        content_type: Option<&str>,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        let request = self
            .requests
            .build_request(method, endpoint, payload, content_type, token)?;
        self.send(&request)
    }

    pub fn get(&self, endpoint: &str, params: Option<&SearchParams>, token: Option<&str>) -> Result<Value, ApiError> {
        let payload = params.cloned().map(Payload::Form);
        self.send_request(HttpMethod::Get, endpoint, payload.as_ref(), None, token)
    }

    pub fn post(
        &self,
        endpoint: &str,
        payload: &Payload,
        content_type: Option<&str>,
        token: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.send_request(HttpMethod::Post, endpoint, Some(payload), content_type, token)
    }

    pub fn put(&self, endpoint: &str, payload: &Value, token: Option<&str>) -> Result<Value, ApiError> {
        let payload = Payload::Json(payload.clone());
        self.send_request(HttpMethod::Put, endpoint, Some(&payload), None, token)
    }

    pub fn delete(&self, endpoint: &str, token: Option<&str>) -> Result<Value, ApiError> {
        self.send_request(HttpMethod::Delete, endpoint, None, None, token)
    }

    /// Execute an already-built request.
    pub fn send(&self, request: &HttpRequest) -> Result<Value, ApiError> {
        let response = self.transport.execute(request)?;
        self.requests.parse_response(&response)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use serde_json::json;

    use super::*;
    use crate::config::ErrorStyle;
    use crate::http::HttpResponse;
    use crate::normalize::NO_CONTENT_MESSAGE;

    /// Records every request and answers with a fixed response.
    struct Canned {
        response: HttpResponse,
        seen: RefCell<Vec<HttpRequest>>,
    }

    impl Canned {
        fn new(status: u16, body: &str) -> Self {
            Self {
                response: HttpResponse::new(status, body),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for Canned {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            self.seen.borrow_mut().push(request.clone());
            Ok(self.response.clone())
        }
    }

    struct Unreachable;

    impl Transport for Unreachable {
        fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, ApiError> {
            Err(ApiError::Transport("connection refused".to_string()))
        }
    }

    fn config() -> ClientConfig {
        ClientConfig::new("http://loja.test")
    }

    #[test]
    fn put_resolves_to_decoded_body() {
        let canned = Canned::new(200, r#"{"id":5,"name":"Caneca","price":10.0,"QT":2}"#);
        let client = ApiClient::with_transport(&config(), &canned);
        let value = client.put("/items/5", &json!({"QT": 2}), Some("valid-token")).unwrap();
        assert_eq!(value, json!({"id": 5, "name": "Caneca", "price": 10.0, "QT": 2}));

        let seen = canned.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url, "http://loja.test/items/5");
        assert_eq!(seen[0].header("authorization"), Some("Bearer valid-token"));
    }

    #[test]
    fn one_round_trip_per_call_even_on_failure() {
        let canned = Canned::new(500, "boom");
        let client = ApiClient::with_transport(&config(), &canned);
        assert!(client.delete("/products/1", Some("t")).is_err());
        assert_eq!(canned.seen.borrow().len(), 1);
    }

    #[test]
    fn delete_no_content_yields_message() {
        let canned = Canned::new(204, "");
        let client = ApiClient::with_transport(&config(), &canned);
        let value = client.delete("/products/1", Some("t")).unwrap();
        assert_eq!(value["message"], NO_CONTENT_MESSAGE);
    }

    #[test]
    fn get_passes_params() {
        let canned = Canned::new(200, "[]");
        let client = ApiClient::with_transport(&config(), &canned);
        let params = SearchParams::new().append("name", "x");
        client.get("/products/", Some(&params), None).unwrap();
        assert_eq!(canned.seen.borrow()[0].url, "http://loja.test/products/?name=x");
    }

    #[test]
    fn presenter_follows_configured_style() {
        let canned = Canned::new(401, r#"{"detail":"Incorrect username or password"}"#);
        let config = config().with_error_style(ErrorStyle::Detailed);
        let client = ApiClient::with_transport(&config, &canned);
        let err = client.post("/login", &Payload::Json(json!({})), None, None).unwrap_err();
        assert_eq!(
            client.presenter().message(&err),
            "Erro da API: Incorrect username or password"
        );
    }

    fn assert_shareable<T: Clone + Send + Sync>() {}

    #[test]
    fn client_is_clone_send_sync() {
        assert_shareable::<ApiClient<UreqTransport>>();
        assert_shareable::<ApiClient>();
    }

    #[test]
    fn transport_failure_propagates() {
        let client = ApiClient::with_transport(&config(), Unreachable);
        let err = client.get("/products/", None, None).unwrap_err();
        assert!(matches!(err, ApiError::Transport(_)));
    }
}
