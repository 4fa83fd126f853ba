//! Streaming one candidate from one provider.
//!
//! Each candidate is a separate `chat/completions` request with
//! `stream: true`. The SSE body is split on newlines and every `data:` payload
//! is turned into a [`Delta`] for the candidate's index. Failures become a
//! short `[error]` fragment so the user sees why a candidate is empty.

use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::builtin::AuthMode;
use super::ProviderEndpoint;
use crate::api::{ChatMessage, ChatRequest, ChatResponse};
use crate::core::backend::Delta;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_ERROR_CHARS: usize = 300;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Content(String),
    Done,
    Error(String),
    Ignored,
}

pub fn parse_sse_line(line: &str) -> SseEvent {
    let Some(payload) = line.trim().strip_prefix("data:").map(str::trim_start) else {
        return SseEvent::Ignored;
    };

    if payload == "[DONE]" {
        return SseEvent::Done;
    }

    match serde_json::from_str::<ChatResponse>(payload) {
        Ok(response) => response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            .filter(|content| !content.is_empty())
            .map(SseEvent::Content)
            .unwrap_or(SseEvent::Ignored),
        Err(_) if payload.trim().is_empty() => SseEvent::Ignored,
        Err(_) => SseEvent::Error(summarize_error(payload)),
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .or_else(|| value.get("message").and_then(|v| v.as_str()))
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Reduces an error body to one readable line.
pub fn summarize_error(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty response>".to_string();
    }

    let summary = serde_json::from_str::<serde_json::Value>(trimmed)
        .ok()
        .and_then(|value| extract_error_summary(&value))
        .filter(|summary| !summary.is_empty())
        .unwrap_or_else(|| trimmed.split_whitespace().collect::<Vec<_>>().join(" "));

    if summary.chars().count() > MAX_ERROR_CHARS {
        let mut cut: String = summary.chars().take(MAX_ERROR_CHARS).collect();
        cut.push('…');
        cut
    } else {
        summary
    }
}

pub fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

pub fn add_auth_headers(
    request: reqwest::RequestBuilder,
    mode: AuthMode,
    api_key: &str,
) -> reqwest::RequestBuilder {
    match mode {
        AuthMode::Anthropic => request
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION),
        AuthMode::Bearer => request.header("Authorization", format!("Bearer {api_key}")),
    }
}

pub struct CandidateRequest {
    pub client: reqwest::Client,
    pub endpoint: ProviderEndpoint,
    pub messages: Vec<ChatMessage>,
    pub index: usize,
    pub cancel: CancellationToken,
}

/// Spawns the request. `tx` is dropped when the candidate ends, for any reason.
pub fn spawn_candidate_stream(
    request: CandidateRequest,
    tx: mpsc::UnboundedSender<Delta>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let cancel = request.cancel.clone();
        tokio::select! {
            _ = stream_candidate(&request, &tx) => {}
            _ = cancel.cancelled() => {
                debug!(provider = %request.endpoint.id, "candidate stream cancelled");
            }
        }
    })
}

fn emit(tx: &mpsc::UnboundedSender<Delta>, index: usize, fragment: String) {
    if !fragment.is_empty() {
        let _ = tx.send(Delta { index, fragment });
    }
}

fn emit_error(tx: &mpsc::UnboundedSender<Delta>, index: usize, provider: &str, message: &str) {
    warn!(provider, index, error = message, "candidate failed");
    emit(tx, index, format!("[error] {message}"));
}

async fn stream_candidate(request: &CandidateRequest, tx: &mpsc::UnboundedSender<Delta>) {
    let CandidateRequest {
        client,
        endpoint,
        messages,
        index,
        ..
    } = request;
    let index = *index;

    let body = ChatRequest {
        model: endpoint.model.clone(),
        messages: messages.clone(),
        stream: true,
        max_tokens: endpoint.max_tokens,
    };

    let http_request = client
        .post(chat_completions_url(&endpoint.base_url))
        .header("Content-Type", "application/json");
    let http_request = add_auth_headers(http_request, endpoint.auth_mode, &endpoint.api_key);

    let response = match http_request.json(&body).send().await {
        Ok(response) => response,
        Err(e) => {
            emit_error(tx, index, &endpoint.id, &e.to_string());
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        let message = format!("{status}: {}", summarize_error(&text));
        emit_error(tx, index, &endpoint.id, &message);
        return;
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();
    let mut fragments = 0usize;

    while let Some(chunk) = stream.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                emit_error(tx, index, &endpoint.id, &e.to_string());
                return;
            }
        };
        buffer.extend_from_slice(&bytes);

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            let line = String::from_utf8_lossy(&buffer[..newline_pos]).into_owned();
            buffer.drain(..=newline_pos);

            match parse_sse_line(&line) {
                SseEvent::Content(content) => {
                    fragments += 1;
                    emit(tx, index, content);
                }
                SseEvent::Done => {
                    debug!(provider = %endpoint.id, fragments, "candidate finished");
                    return;
                }
                SseEvent::Error(message) => {
                    emit_error(tx, index, &endpoint.id, &message);
                    return;
                }
                SseEvent::Ignored => {}
            }
        }
    }

    debug!(provider = %endpoint.id, fragments, "candidate stream ended without [DONE]");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sse_line_handles_spacing_variants() {
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#),
            SseEvent::Content("Hello".into())
        );
        assert_eq!(
            parse_sse_line(r#"data:{"choices":[{"delta":{"content":"World"}}]}"#),
            SseEvent::Content("World".into())
        );
        assert_eq!(parse_sse_line("data: [DONE]"), SseEvent::Done);
        assert_eq!(parse_sse_line("data:[DONE]\r"), SseEvent::Done);
    }

    #[test]
    fn parse_sse_line_skips_non_content() {
        assert_eq!(parse_sse_line(""), SseEvent::Ignored);
        assert_eq!(parse_sse_line(": keep-alive"), SseEvent::Ignored);
        assert_eq!(parse_sse_line("event: message_start"), SseEvent::Ignored);
        assert_eq!(parse_sse_line("data: "), SseEvent::Ignored);
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseEvent::Ignored
        );
        assert_eq!(
            parse_sse_line(r#"data: {"choices":[{"delta":{"content":""},"finish_reason":"stop"}]}"#),
            SseEvent::Ignored
        );
        assert_eq!(parse_sse_line(r#"data: {"choices":[]}"#), SseEvent::Ignored);
    }

    #[test]
    fn parse_sse_line_routes_stream_errors() {
        assert_eq!(
            parse_sse_line(r#"data: {"error":{"message":"internal   server error"}}"#),
            SseEvent::Error("internal server error".into())
        );
    }

    #[test]
    fn summarize_error_prefers_json_message() {
        assert_eq!(
            summarize_error(r#"{"error":{"message":"model overloaded","type":"x"}}"#),
            "model overloaded"
        );
        assert_eq!(summarize_error(r#"{"message":"bad key"}"#), "bad key");
        assert_eq!(summarize_error(r#"{"error":"quota"}"#), "quota");
        assert_eq!(
            summarize_error(r#"{"status":"failed"}"#),
            r#"{"status":"failed"}"#
        );
        assert_eq!(summarize_error("  plain\n failure "), "plain failure");
        assert_eq!(summarize_error(""), "<empty response>");
    }

    #[test]
    fn summarize_error_truncates_long_bodies() {
        let long = "x".repeat(MAX_ERROR_CHARS + 50);
        let summary = summarize_error(&long);
        assert_eq!(summary.chars().count(), MAX_ERROR_CHARS + 1);
        assert!(summary.ends_with('…'));
    }

    #[test]
    fn chat_url_handles_trailing_slashes() {
        assert_eq!(
            chat_completions_url("https://api.example.com/v1"),
            "https://api.example.com/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url("https://api.example.com/v1///"),
            "https://api.example.com/v1/chat/completions"
        );
    }

    #[test]
    fn anthropic_auth_uses_api_key_header() {
        let client = reqwest::Client::new();
        let request = add_auth_headers(
            client.get("https://example.com"),
            AuthMode::Anthropic,
            "secret",
        )
        .build()
        .expect("request");

        assert_eq!(request.headers()["x-api-key"], "secret");
        assert_eq!(request.headers()["anthropic-version"], ANTHROPIC_VERSION);
        assert!(request.headers().get("authorization").is_none());
    }

    #[test]
    fn bearer_auth_uses_authorization_header() {
        let client = reqwest::Client::new();
        let request = add_auth_headers(client.get("https://example.com"), AuthMode::Bearer, "k")
            .build()
            .expect("request");

        assert_eq!(request.headers()["authorization"], "Bearer k");
        assert!(request.headers().get("x-api-key").is_none());
    }
}
