//! Operational endpoints and authentication

use gateway_core::{ChannelStatus, Token, TokenStatus};
use serde_json::Value;

use crate::{
    assert_status, caller_store, chat_request, random_api_key, MockChannel, TestGateway,
};

#[tokio::test]
async fn test_readiness_requires_active_channel() {
    let store = caller_store();
    let gateway = TestGateway::with_store(store.clone()).await;
    assert_status(&gateway.get("/ready").await, 503);

    let upstream = MockChannel::start("a").await;
    store.upsert_channel(upstream.channel());
    assert_status(&gateway.get("/ready").await, 200);
}

#[tokio::test]
async fn test_models_are_aggregated_across_active_channels() {
    let first = MockChannel::start("first").await;
    let second = MockChannel::start("second").await;
    let parked = MockChannel::start("parked").await;

    let store = caller_store();
    store.upsert_channel(first.channel().with_name("First").with_models(["gpt-4o", "o1"]));
    store.upsert_channel(second.channel().with_models(["gpt-4o"]));
    store.upsert_channel(
        parked
            .channel()
            .with_models(["hidden"])
            .with_status(ChannelStatus::Disabled),
    );
    let gateway = TestGateway::with_store(store).await;

    let response = gateway.get("/api/models").await;
    assert_status(&response, 200);
    let json: Value = response.json().await.unwrap();

    let models = json["models"].as_array().unwrap();
    assert_eq!(models.len(), 2);
    assert_eq!(models[0]["id"], "gpt-4o");
    assert_eq!(models[0]["channels"].as_array().unwrap().len(), 2);
    assert_eq!(models[0]["channels"][0]["name"], "First");
    assert_eq!(models[1]["id"], "o1");
}

#[tokio::test]
async fn test_models_passthrough_under_proxy_mount() {
    let upstream = MockChannel::start("lister").await;
    upstream.mock_models(&["m1", "m2"]).await;

    let store = caller_store();
    store.upsert_channel(upstream.channel());
    let gateway = TestGateway::with_store(store).await;

    let response = gateway.get_authorized("/v1/models").await;
    assert_status(&response, 200);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["data"][1]["id"], "m2");
}

#[tokio::test]
async fn test_authentication_errors() {
    let store = caller_store();
    store.insert_token("sk-off", Token::new("tok-off").with_status(TokenStatus::Disabled));
    let gateway = TestGateway::with_store(store).await;
    let body = chat_request("gpt-4o", false);

    let response = gateway
        .client
        .post(gateway.url("/v1/chat/completions"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_status(&response, 401);

    let response = gateway
        .post_json_as(&random_api_key(), "/v1/chat/completions", &body)
        .await;
    assert_status(&response, 401);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["code"], "unauthorized");

    let response = gateway
        .post_json_as("sk-off", "/v1/chat/completions", &body)
        .await;
    assert_status(&response, 403);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["code"], "token_disabled");
}

#[tokio::test]
async fn test_metrics_reflect_proxied_traffic() {
    let upstream = MockChannel::start("m").await;
    upstream.mock_chat_completion("gpt-4o", 3, 4).await;

    let store = caller_store();
    store.upsert_channel(upstream.channel());
    let gateway = TestGateway::with_store(store).await;

    let response = gateway
        .post_json("/v1/chat/completions", &chat_request("gpt-4o", false))
        .await;
    assert_status(&response, 200);

    let text = gateway.get("/metrics").await.text().await.unwrap();
    assert!(text.contains("relay_gateway_proxy_requests_total{outcome=\"success\"} 1"));
    assert!(text.contains("relay_gateway_responses_total{class=\"2xx\"} 1"));
    assert!(text.contains("relay_gateway_tokens_total{kind=\"total\"} 7"));
}
