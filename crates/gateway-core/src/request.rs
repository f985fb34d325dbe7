//! Inbound proxy request model.
//!
//! The gateway forwards requests verbatim. The only things it reads out of the
//! body are the requested model and the `stream` flag, and the only change it
//! makes is asking streaming providers for a trailing usage chunk.

use bytes::Bytes;
use http::header::{AUTHORIZATION, CONTENT_LENGTH, HOST};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::Value;

use crate::channel::Channel;
use crate::error::{GatewayError, GatewayResult};

/// Header carrying the channel credential alongside `Authorization`
pub const X_API_KEY: HeaderName = HeaderName::from_static("x-api-key");

/// A request accepted on the proxy mount, ready to be forwarded
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    /// HTTP method
    pub method: Method,
    /// Full inbound path, e.g. `/v1/chat/completions`
    pub path: String,
    /// Raw query string without the leading `?`
    pub query: Option<String>,
    /// Inbound headers
    pub headers: HeaderMap,
    /// Body to forward (possibly rewritten, see [`ProxyRequest::new`])
    pub body: Bytes,
    /// Model named in a JSON body
    pub model: Option<String>,
    /// Whether the JSON body asked for a streamed response
    pub stream: bool,
}

impl ProxyRequest {
    /// Build a proxy request from the inbound parts.
    ///
    /// The body is parsed best-effort; non-JSON bodies are forwarded untouched.
    /// For `stream: true` bodies, `stream_options.include_usage` is forced to
    /// `true` so providers that support it emit a final usage chunk.
    pub fn new(
        method: Method,
        path: impl Into<String>,
        query: Option<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        let mut model = None;
        let mut stream = false;
        let mut forwarded = body;

        if let Ok(Value::Object(mut object)) = serde_json::from_slice::<Value>(&forwarded) {
            model = match object.get("model") {
                None | Some(Value::Null) => None,
                Some(Value::String(name)) => Some(name.clone()),
                Some(other) => Some(other.to_string()),
            };
            stream = matches!(object.get("stream"), Some(Value::Bool(true)));

            if stream && request_usage_chunk(&mut object) {
                if let Ok(rewritten) = serde_json::to_vec(&Value::Object(object)) {
                    forwarded = Bytes::from(rewritten);
                }
            }
        }

        Self {
            method,
            path: path.into(),
            query: query.filter(|q| !q.is_empty()),
            headers,
            body: forwarded,
            model,
            stream,
        }
    }

    /// Path plus `?query` when present
    #[must_use]
    pub fn path_and_query(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        }
    }

    /// Upstream target for a channel: normalized base URL + path + query
    #[must_use]
    pub fn target_url(&self, channel: &Channel) -> String {
        format!("{}{}", channel.normalized_base_url(), self.path_and_query())
    }

    /// Outbound headers for a channel.
    ///
    /// Replaces the caller's credential with the channel's (both
    /// `Authorization: Bearer` and `x-api-key`) and drops `host` and
    /// `content-length`.
    pub fn headers_for(&self, channel: &Channel) -> GatewayResult<HeaderMap> {
        let mut headers = self.headers.clone();
        headers.remove(HOST);
        headers.remove(CONTENT_LENGTH);

        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", channel.api_key()))
            .map_err(|_| invalid_credential(channel))?;
        let mut key =
            HeaderValue::from_str(channel.api_key()).map_err(|_| invalid_credential(channel))?;
        bearer.set_sensitive(true);
        key.set_sensitive(true);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(X_API_KEY, key);
        Ok(headers)
    }
}

fn invalid_credential(channel: &Channel) -> GatewayError {
    GatewayError::internal(format!(
        "channel {} has a credential that is not a valid header value",
        channel.id
    ))
}

/// Returns true when the body had to be changed.
fn request_usage_chunk(object: &mut serde_json::Map<String, Value>) -> bool {
    match object.get_mut("stream_options") {
        Some(Value::Object(options)) => {
            if matches!(options.get("include_usage"), Some(Value::Bool(true))) {
                return false;
            }
            options.insert("include_usage".to_string(), Value::Bool(true));
            true
        }
        _ => {
            let mut options = serde_json::Map::new();
            options.insert("include_usage".to_string(), Value::Bool(true));
            object.insert("stream_options".to_string(), Value::Object(options));
            true
        }
    }
}
