//! Canned upstream payloads

use serde_json::{json, Value};

/// Non-streaming chat completion carrying a usage object
pub fn chat_response(model: &str, content: &str, prompt: u64, completion: u64) -> Value {
    json!({
        "id": "chatcmpl-test123",
        "object": "chat.completion",
        "created": 1_700_000_000,
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }],
        "usage": {
            "prompt_tokens": prompt,
            "completion_tokens": completion,
            "total_tokens": prompt + completion
        }
    })
}

/// OpenAI-style error body
pub fn error_response(code: &str, message: &str) -> Value {
    json!({
        "error": {
            "message": message,
            "type": "invalid_request_error",
            "code": code
        }
    })
}

/// Chat request body
pub fn chat_request(model: &str, stream: bool) -> Value {
    json!({
        "model": model,
        "stream": stream,
        "messages": [{"role": "user", "content": "Hello, how are you?"}]
    })
}

/// SSE body: one delta event per piece of content, then a usage-only event
/// and the terminator
pub fn sse_body(model: &str, pieces: &[&str], usage: Option<(u64, u64)>) -> String {
    let mut body = String::new();
    for piece in pieces {
        let event = json!({
            "id": "chatcmpl-stream",
            "object": "chat.completion.chunk",
            "model": model,
            "choices": [{"index": 0, "delta": {"content": piece}, "finish_reason": null}]
        });
        body.push_str(&format!("data: {event}\n\n"));
    }
    if let Some((prompt, completion)) = usage {
        let event = json!({
            "id": "chatcmpl-stream",
            "object": "chat.completion.chunk",
            "model": model,
            "choices": [],
            "usage": {
                "prompt_tokens": prompt,
                "completion_tokens": completion,
                "total_tokens": prompt + completion
            }
        });
        body.push_str(&format!("data: {event}\n\n"));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_body_shape() {
        let body = sse_body("gpt-4o", &["Hel", "lo"], Some((3, 2)));
        assert_eq!(body.matches("data: ").count(), 4);
        assert!(body.ends_with("data: [DONE]\n\n"));
        assert!(body.contains("\"total_tokens\":5"));
    }

    #[test]
    fn test_chat_response_totals() {
        let value = chat_response("gpt-4o", "hi", 4, 6);
        assert_eq!(value["usage"]["total_tokens"], 10);
    }
}
