//! Channel eligibility and selection over HTTP

use gateway_core::{ChannelStatus, Token};

use crate::{assert_status, caller_store, chat_request, MockChannel, TestGateway};

#[tokio::test]
async fn test_token_scope_limits_channels() {
    let allowed = MockChannel::start("allowed").await;
    allowed.mock_chat_completion("gpt-4o", 1, 1).await;
    let other = MockChannel::start("other").await;
    other.mock_chat_completion("gpt-4o", 1, 1).await;

    let store = caller_store();
    store.upsert_channel(allowed.channel());
    store.upsert_channel(other.channel());
    store.insert_token("sk-scoped", Token::new("tok-scoped").with_allowed_channels(["allowed"]));
    let gateway = TestGateway::with_store(store.clone()).await;

    for _ in 0..10 {
        let response = gateway
            .post_json_as("sk-scoped", "/v1/chat/completions", &chat_request("gpt-4o", false))
            .await;
        assert_status(&response, 200);
    }

    assert_eq!(allowed.calls().await, 10);
    assert_eq!(other.calls().await, 0);
    assert_eq!(store.token_usage("tok-scoped"), Some(20));
}

#[tokio::test]
async fn test_token_scope_matching_nothing_is_rejected() {
    let upstream = MockChannel::start("real").await;
    upstream.mock_chat_completion("gpt-4o", 1, 1).await;

    let store = caller_store();
    store.upsert_channel(upstream.channel());
    store.insert_token("sk-lost", Token::new("tok-lost").with_allowed_channels(["missing"]));
    let gateway = TestGateway::with_store(store.clone()).await;

    let response = gateway
        .post_json_as("sk-lost", "/v1/chat/completions", &chat_request("gpt-4o", false))
        .await;

    assert_status(&response, 503);
    assert_eq!(upstream.calls().await, 0);
    assert!(store.usage_records().is_empty());
}

#[tokio::test]
async fn test_model_filter_picks_supporting_channel() {
    let gpt = MockChannel::start("gpt").await;
    gpt.mock_chat_completion("gpt-4o", 1, 1).await;
    let claude = MockChannel::start("claude").await;
    claude.mock_chat_completion("claude-3", 1, 1).await;

    let store = caller_store();
    store.upsert_channel(gpt.channel().with_models(["gpt-4o"]));
    store.upsert_channel(claude.channel().with_models(["claude-3"]));
    let gateway = TestGateway::with_store(store).await;

    for _ in 0..5 {
        let response = gateway
            .post_json("/v1/chat/completions", &chat_request("claude-3", false))
            .await;
        assert_status(&response, 200);
    }

    assert_eq!(claude.calls().await, 5);
    assert_eq!(gpt.calls().await, 0);
}

#[tokio::test]
async fn test_unknown_model_falls_back_to_all_channels() {
    let upstream = MockChannel::start("gpt").await;
    upstream.mock_chat_completion("mystery", 1, 1).await;

    let store = caller_store();
    store.upsert_channel(upstream.channel().with_models(["gpt-4o"]));
    let gateway = TestGateway::with_store(store).await;

    let response = gateway
        .post_json("/v1/chat/completions", &chat_request("mystery", false))
        .await;

    assert_status(&response, 200);
    assert_eq!(upstream.calls().await, 1);
}

#[tokio::test]
async fn test_disabled_channel_is_never_used() {
    let live = MockChannel::start("live").await;
    live.mock_chat_completion("gpt-4o", 1, 1).await;
    let parked = MockChannel::start("parked").await;
    parked.mock_chat_completion("gpt-4o", 1, 1).await;

    let store = caller_store();
    store.upsert_channel(live.channel());
    store.upsert_channel(parked.channel().with_status(ChannelStatus::Disabled));
    let gateway = TestGateway::with_store(store).await;

    for _ in 0..5 {
        let response = gateway
            .post_json("/v1/chat/completions", &chat_request("gpt-4o", false))
            .await;
        assert_status(&response, 200);
    }

    assert_eq!(parked.calls().await, 0);
}
