use std::collections::BTreeMap;

/// One side of an HTTP exchange as seen by expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpMessage {
    pub headers: BTreeMap<String, String>,
    pub body: String,
    /// Path parameters by name.
    pub path: BTreeMap<String, String>,
    /// Query parameters by name.
    pub query: BTreeMap<String, String>,
}

impl HttpMessage {
    /// Header names compare case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// The request/response pair captured by the most recent step execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSnapshot {
    pub url: String,
    pub method: String,
    pub status_code: u16,
    /// Response content type as reported by the transport.
    pub content_type: Option<String>,
    pub request: HttpMessage,
    pub response: HttpMessage,
}

impl TransactionSnapshot {
    pub fn new(method: impl Into<String>, url: impl Into<String>, status_code: u16) -> Self {
        Self {
            url: url.into(),
            method: method.into(),
            status_code,
            ..Self::default()
        }
    }

    pub fn with_response_body(mut self, content_type: &str, body: impl Into<String>) -> Self {
        self.content_type = Some(content_type.to_string());
        self.response.body = body.into();
        self
    }

    pub fn with_response_header(mut self, name: &str, value: &str) -> Self {
        self.response.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_request_body(mut self, content_type: &str, body: impl Into<String>) -> Self {
        self.request
            .headers
            .insert("Content-Type".to_string(), content_type.to_string());
        self.request.body = body.into();
        self
    }

    pub fn response_content_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .or_else(|| self.response.header("content-type"))
    }

    pub fn request_content_type(&self) -> Option<&str> {
        self.request.header("content-type")
    }
}
