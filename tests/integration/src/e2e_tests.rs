//! End-to-end proxy flows over a real listener

use std::time::{Duration, Instant};

use gateway_core::{Channel, UsageStatus};
use serde_json::Value;

use crate::{
    assert_status, caller_store, chat_request, test_config, wait_for, MockChannel, TestGateway,
    TEST_TOKEN_ID,
};

#[tokio::test]
async fn test_chat_completion_is_relayed_and_billed() {
    let upstream = MockChannel::start("primary").await;
    upstream.mock_chat_completion("gpt-4o", 12, 8).await;

    let store = caller_store();
    store.upsert_channel(upstream.channel());
    let gateway = TestGateway::with_store(store.clone()).await;

    let response = gateway
        .post_json("/v1/chat/completions", &chat_request("gpt-4o", false))
        .await;
    assert_status(&response, 200);
    assert!(response.headers().contains_key("x-request-id"));

    let json: Value = response.json().await.unwrap();
    assert_eq!(json["usage"]["total_tokens"], 20);

    let records = store.usage_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel_id.as_deref(), Some("primary"));
    assert_eq!(records[0].request_path, "/v1/chat/completions");
    assert_eq!(records[0].prompt_tokens, 12);
    assert_eq!(records[0].completion_tokens, 8);
    assert_eq!(store.token_usage(TEST_TOKEN_ID), Some(20));
}

#[tokio::test]
async fn test_second_round_reaches_recovered_channel() {
    let upstream = MockChannel::start("flaky").await;
    upstream.mock_flaky("gpt-4o", 1).await;

    let store = caller_store();
    store.upsert_channel(upstream.channel());
    let gateway = TestGateway::start(store.clone(), test_config(2)).await;

    let started = Instant::now();
    let response = gateway
        .post_json("/v1/chat/completions", &chat_request("gpt-4o", false))
        .await;

    assert_status(&response, 200);
    assert!(started.elapsed() >= Duration::from_millis(20));
    assert_eq!(upstream.calls().await, 2);
    assert_eq!(store.usage_records()[0].total_tokens, 5);
}

#[tokio::test]
async fn test_last_failure_is_returned_verbatim() {
    let first = MockChannel::start("a").await;
    first.mock_status(503).await;
    let second = MockChannel::start("b").await;
    second.mock_status(503).await;

    let store = caller_store();
    store.upsert_channel(first.channel());
    store.upsert_channel(second.channel());
    let gateway = TestGateway::start(store.clone(), test_config(2)).await;

    let response = gateway
        .post_json("/v1/chat/completions", &chat_request("gpt-4o", false))
        .await;

    assert_status(&response, 503);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["error"]["code"], "upstream_error");

    assert_eq!(first.calls().await + second.calls().await, 4);
    let records = store.usage_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, UsageStatus::Error);
    assert!(records[0].channel_id.is_some());
}

#[tokio::test]
async fn test_non_retryable_status_does_not_start_another_round() {
    let upstream = MockChannel::start("strict").await;
    upstream.mock_status(401).await;

    let store = caller_store();
    store.upsert_channel(upstream.channel());
    let gateway = TestGateway::start(store, test_config(3)).await;

    let response = gateway
        .post_json("/v1/chat/completions", &chat_request("gpt-4o", false))
        .await;

    assert_status(&response, 401);
    assert_eq!(upstream.calls().await, 1);
}

#[tokio::test]
async fn test_unreachable_upstream_yields_gateway_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let store = caller_store();
    store.upsert_channel(Channel::new("gone", dead, "sk-gone"));
    let gateway = TestGateway::with_store(store.clone()).await;

    let response = gateway
        .post_json("/v1/chat/completions", &chat_request("gpt-4o", false))
        .await;

    assert_status(&response, 502);
    let json: Value = response.json().await.unwrap();
    assert_eq!(json["code"], "upstream_unavailable");

    let records = store.usage_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].channel_id, None);
    assert_eq!(records[0].status, UsageStatus::Error);
}

#[tokio::test]
async fn test_stream_chunks_arrive_and_usage_is_billed_once() {
    let upstream = MockChannel::start("streamer").await;
    upstream
        .mock_stream("gpt-4o", &["Once", " upon", " a time"], Some((9, 21)))
        .await;

    let store = caller_store();
    store.upsert_channel(upstream.channel());
    let gateway = TestGateway::with_store(store.clone()).await;

    let (status, chunks) = gateway
        .post_streaming("/v1/chat/completions", &chat_request("gpt-4o", true))
        .await;
    assert_eq!(status, 200);
    let text = chunks.concat();
    assert!(text.contains(" upon"));
    assert!(text.trim_end().ends_with("data: [DONE]"));

    gateway.settle().await;

    let records = store.usage_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].total_tokens, 30);
    assert_eq!(store.token_usage(TEST_TOKEN_ID), Some(30));

    let forwarded = upstream.received_bodies().await;
    assert_eq!(forwarded[0]["stream_options"]["include_usage"], true);
    assert_eq!(forwarded[0]["model"], "gpt-4o");
}

#[tokio::test]
async fn test_stream_without_usage_is_billed_as_zero() {
    let upstream = MockChannel::start("quiet").await;
    upstream.mock_stream("gpt-4o", &["a", "b"], None).await;

    let store = caller_store();
    store.upsert_channel(upstream.channel());
    let gateway = TestGateway::with_store(store.clone()).await;

    let (status, _) = gateway
        .post_streaming("/v1/chat/completions", &chat_request("gpt-4o", true))
        .await;
    assert_eq!(status, 200);

    let recorded = wait_for(|| store.usage_records().len() == 1, Duration::from_secs(5)).await;
    assert!(recorded);
    assert_eq!(store.usage_records()[0].total_tokens, 0);
    assert_eq!(store.token_usage(TEST_TOKEN_ID), Some(0));
}

#[tokio::test]
async fn test_shutdown_waits_for_stream_metering() {
    let upstream = MockChannel::start("streamer").await;
    upstream.mock_stream("gpt-4o", &["hi"], Some((1, 1))).await;

    let store = caller_store();
    store.upsert_channel(upstream.channel());
    let gateway = TestGateway::with_store(store.clone()).await;

    let (status, _) = gateway
        .post_streaming("/v1/chat/completions", &chat_request("gpt-4o", true))
        .await;
    assert_eq!(status, 200);

    gateway.stop().await;
    assert_eq!(store.usage_records().len(), 1);
    assert_eq!(store.token_usage(TEST_TOKEN_ID), Some(2));
}

#[tokio::test]
async fn test_concurrent_requests_bill_every_token() {
    let upstream = MockChannel::start("busy").await;
    upstream.mock_chat_completion("gpt-4o", 1, 2).await;

    let store = caller_store();
    store.upsert_channel(upstream.channel());
    let gateway = TestGateway::with_store(store.clone()).await;

    let body = chat_request("gpt-4o", false);
    let requests = (0..16).map(|_| gateway.post_json("/v1/chat/completions", &body));
    let responses = futures::future::join_all(requests).await;
    assert!(responses.iter().all(|r| r.status().as_u16() == 200));

    assert_eq!(store.usage_records().len(), 16);
    assert_eq!(store.token_usage(TEST_TOKEN_ID), Some(48));
}
