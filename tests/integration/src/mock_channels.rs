//! wiremock-backed upstream channels

use gateway_core::Channel;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::fixtures::{chat_response, error_response, sse_body};

const CHAT_PATH: &str = "/v1/chat/completions";

/// A mock upstream provider standing behind one channel
pub struct MockChannel {
    /// Channel id
    pub id: String,
    /// The mock server
    pub server: MockServer,
}

impl MockChannel {
    /// Start a new mock upstream
    pub async fn start(id: &str) -> Self {
        Self {
            id: id.to_string(),
            server: MockServer::start().await,
        }
    }

    /// Channel record pointing at this server, configured the way operators
    /// usually write it (with a trailing `/v1`)
    pub fn channel(&self) -> Channel {
        Channel::new(
            self.id.clone(),
            format!("{}/v1", self.server.uri()),
            self.api_key(),
        )
    }

    /// Upstream credential of this channel
    pub fn api_key(&self) -> String {
        format!("sk-upstream-{}", self.id)
    }

    /// Requests received so far
    pub async fn calls(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    /// Bodies of the requests received so far
    pub async fn received_bodies(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter_map(|request| serde_json::from_slice(&request.body).ok())
            .collect()
    }

    /// Successful chat completion with usage
    pub async fn mock_chat_completion(&self, model: &str, prompt: u64, completion: u64) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_response(model, "Hello from the test upstream", prompt, completion)),
            )
            .mount(&self.server)
            .await;
    }

    /// Every chat completion fails with `status`
    pub async fn mock_status(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(
                ResponseTemplate::new(status)
                    .set_body_json(error_response("upstream_error", "upstream failed")),
            )
            .mount(&self.server)
            .await;
    }

    /// The first `failures` chat completions fail with 503, later ones succeed
    pub async fn mock_flaky(&self, model: &str, failures: u64) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(failures)
            .with_priority(1)
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_response(model, "ok", 2, 3)))
            .with_priority(2)
            .mount(&self.server)
            .await;
    }

    /// Streamed completion; only matches when usage reporting was requested
    pub async fn mock_stream(&self, model: &str, pieces: &[&str], usage: Option<(u64, u64)>) {
        Mock::given(method("POST"))
            .and(path(CHAT_PATH))
            .and(body_partial_json(json!({
                "stream": true,
                "stream_options": {"include_usage": true}
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(sse_body(model, pieces, usage), "text/event-stream"),
            )
            .mount(&self.server)
            .await;
    }

    /// `/v1/models` listing
    pub async fn mock_models(&self, ids: &[&str]) {
        let data: Vec<Value> = ids.iter().map(|id| json!({"id": id, "object": "model"})).collect();
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"object": "list", "data": data})))
            .mount(&self.server)
            .await;
    }
}
