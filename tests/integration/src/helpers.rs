//! Test helper utilities for integration tests

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use gateway_config::{GatewayConfig, ProxySettings};
use gateway_core::{MemoryStore, Token};
use gateway_server::{AppState, Server, ServerError};
use once_cell::sync::Lazy;
use reqwest::{Client, Response};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

/// Key of the default caller token
pub const TEST_KEY: &str = "sk-test-caller";

/// Id of the default caller token
pub const TEST_TOKEN_ID: &str = "tok-test";

/// Initialize tracing for tests (only once)
static TRACING: Lazy<()> = Lazy::new(|| {
    if std::env::var("TEST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
});

/// Initialize tracing for tests
pub fn init_tracing() {
    Lazy::force(&TRACING);
}

/// Store holding one active caller token
pub fn caller_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    store.insert_token(TEST_KEY, Token::new(TEST_TOKEN_ID));
    store
}

/// Configuration with a short retry delay
pub fn test_config(retry_rounds: u32) -> GatewayConfig {
    GatewayConfig {
        proxy: ProxySettings {
            retry_rounds,
            retry_delay_ms: 20,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// A gateway served on an ephemeral local port
pub struct TestGateway {
    /// The server address
    pub addr: SocketAddr,
    /// HTTP client for making requests
    pub client: Client,
    /// Base URL for the server
    pub base_url: String,
    /// Backing store, for assertions on usage
    pub store: Arc<MemoryStore>,
    /// Shared state, for settling background metering
    pub state: AppState,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), ServerError>>>,
}

impl TestGateway {
    /// Start a gateway over `store` with the given configuration
    pub async fn start(store: Arc<MemoryStore>, config: GatewayConfig) -> Self {
        init_tracing();

        let state = AppState::builder()
            .config(config)
            .store(store.clone())
            .build()
            .expect("Failed to build state");

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        let server = Server::new(Default::default(), state.clone());
        let handle = tokio::spawn(server.serve(listener, async {
            let _ = shutdown_rx.await;
        }));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create client");

        Self {
            addr,
            client,
            base_url: format!("http://{addr}"),
            store,
            state,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    /// Start with one retry round
    pub async fn with_store(store: Arc<MemoryStore>) -> Self {
        Self::start(store, test_config(1)).await
    }

    /// Get the full URL for a path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Make a GET request without credentials
    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Request failed")
    }

    /// Make a GET request as the default caller
    pub async fn get_authorized(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .bearer_auth(TEST_KEY)
            .send()
            .await
            .expect("Request failed")
    }

    /// Make a POST request with a JSON body as the given caller
    pub async fn post_json_as(&self, key: &str, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .bearer_auth(key)
            .json(body)
            .send()
            .await
            .expect("Request failed")
    }

    /// Make a POST request with a JSON body as the default caller
    pub async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.post_json_as(TEST_KEY, path, body).await
    }

    /// Make a streaming POST request and collect the chunks as received
    pub async fn post_streaming(&self, path: &str, body: &Value) -> (u16, Vec<String>) {
        use futures::StreamExt;

        let response = self.post_json(path, body).await;
        let status = response.status().as_u16();

        let mut chunks = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.expect("Stream failed");
            chunks.push(String::from_utf8_lossy(&bytes).into_owned());
        }

        (status, chunks)
    }

    /// Wait for background metering started so far
    pub async fn settle(&self) {
        self.state.metering.settle().await;
    }

    /// Trigger graceful shutdown and wait for the server to finish draining
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .expect("Server task panicked")
                .expect("Server error");
        }
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Assert that a response has the expected status code
pub fn assert_status(response: &Response, expected: u16) {
    assert_eq!(
        response.status().as_u16(),
        expected,
        "Expected status {}, got {}",
        expected,
        response.status()
    );
}

/// Wait for a condition to be true with timeout
pub async fn wait_for<F>(condition: F, timeout: Duration) -> bool
where
    F: Fn() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

/// Generate a random caller key
pub fn random_api_key() -> String {
    format!("sk-test-{}", uuid::Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_gateway_health() {
        let gateway = TestGateway::with_store(caller_store()).await;

        let response = gateway.get("/health").await;
        assert_status(&response, 200);

        let json: Value = response.json().await.unwrap();
        assert_eq!(json["status"], "healthy");
    }

    #[tokio::test]
    async fn test_gateway_live() {
        let gateway = TestGateway::with_store(caller_store()).await;
        assert_status(&gateway.get("/live").await, 200);
        gateway.stop().await;
    }

    #[test]
    fn test_random_api_key() {
        let key1 = random_api_key();
        let key2 = random_api_key();
        assert!(key1.starts_with("sk-test-"));
        assert_ne!(key1, key2);
    }
}
