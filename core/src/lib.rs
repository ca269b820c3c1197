//! Client core for the storefront HTTP API.
//!
//! # Overview
//! Builds `HttpRequest` values, executes them through a `Transport`,
//! normalizes the `HttpResponse` into JSON or an `ApiError`, and turns
//! errors into display strings for the UI.
//!
//! # Design
//! - `RequestClient` is stateless: it holds the injected base origin and the
//!   default content type, nothing else.
//! - Building and parsing are pure; `Transport` is the only I/O seam, so
//!   tests can run against canned responses or the mock server.
//! - `ErrorPresenter` carries the one presentation policy, selected by
//!   `ErrorStyle` in `ClientConfig`.

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod normalize;
pub mod present;
pub mod transport;
pub mod types;

pub use api::ApiClient;
pub use client::{RequestClient, FORM_CONTENT_TYPE};
pub use config::{ClientConfig, ErrorStyle, DEFAULT_CONTENT_TYPE};
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use normalize::{normalize, no_content, NO_CONTENT_MESSAGE};
pub use present::{render_alert, ErrorPresenter, MemoryRegion, OutputRegion};
pub use transport::{Transport, UreqTransport};
pub use types::{ErrorDetail, FieldError, LocSegment, Payload, SearchParams};
