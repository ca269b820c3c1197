//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `RequestClient` builds
//! `HttpRequest` values and the normalizer consumes `HttpResponse` values;
//! a `Transport` (see `transport.rs`) sits between the two and is the only
//! place that touches the network.

use std::fmt;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// GET and DELETE never carry a body.
    pub fn allows_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data.
///
/// `url` is absolute: base origin, endpoint and (for GET) the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// An HTTP response described as plain data, with the body read in full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// `true` for any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_ignores_case() {
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost/".to_string(),
            headers: vec![("authorization".to_string(), "Bearer abc".to_string())],
            body: None,
        };
        assert_eq!(req.header("Authorization"), Some("Bearer abc"));
        assert_eq!(req.header("content-type"), None);
    }

    #[test]
    fn success_range_is_2xx() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(301, "").is_success());
        assert!(!HttpResponse::new(422, "").is_success());
    }

    #[test]
    fn only_post_and_put_allow_body() {
        assert!(!HttpMethod::Get.allows_body());
        assert!(!HttpMethod::Delete.allows_body());
        assert!(HttpMethod::Post.allows_body());
        assert!(HttpMethod::Put.allows_body());
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }
}
