//! HTTP seam between the client and the network.
//!
//! `ServiceClient` talks to the identity provider and the analytics API only through
//! [`HttpTransport`], so the request/response mapping can be exercised without a network.

mod mock;
mod reqwest_transport;

use crate::error::{PbiError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

pub use mock::MockTransport;
pub use reqwest_transport::ReqwestTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Form(Vec<(String, String)>),
    Empty,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self.header("Content-Type", "application/json")
    }

    pub fn form(mut self, fields: Vec<(String, String)>) -> Self {
        self.body = Some(RequestBody::Form(fields));
        self
    }

    pub fn empty_body(mut self) -> Self {
        self.body = Some(RequestBody::Empty);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| PbiError::Decode(e.to_string()))
    }
}

/// Sends one request and hands back whatever status the server answered with.
///
/// Implementations return `Err` only when no HTTP response was obtained at all. Status
/// interpretation belongs to the caller.
pub trait HttpTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_request_sets_content_type() {
        let req = HttpRequest::post("https://example.test/x").json(json!({"a": 1}));
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.header_value("content-type"), Some("application/json"));
        assert_eq!(req.body, Some(RequestBody::Json(json!({"a": 1}))));
    }

    #[test]
    fn test_response_decode_error() {
        let resp = HttpResponse::new(200, "<html>");
        let decoded: Result<Value> = resp.json();
        assert!(matches!(decoded, Err(PbiError::Decode(_))));
    }
}
