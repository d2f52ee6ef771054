//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, and any endpoint
//! exposing an OpenAI-compatible `/v1/chat/completions`.
//!
//! Supports:
//! - Chat completions (non-streaming and streaming SSE)
//! - Model listing and health checks
//!
//! Note: function routing in Marquee is prompt-encoded (the model
//! replies with a JSON plan of call signatures), so this provider has no
//! native tool-calling plumbing.

use async_trait::async_trait;
use futures::StreamExt;
use marquee_core::error::ProviderError;
use marquee_core::message::{Message, Role};
use marquee_core::provider::*;
use serde::Deserialize;
use tracing::{debug, warn};

/// An OpenAI-compatible LLM provider.
#[derive(Debug)]
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new(
            "ollama",
            base_url.unwrap_or("http://localhost:11434/v1"),
            "ollama", // Ollama doesn't need a real key
        )
    }

    /// Convert our Message types to OpenAI API format.
    fn to_api_messages(messages: &[Message]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| {
                serde_json::json!({
                    "role": match m.role {
                        Role::User => "user",
                        Role::Assistant => "assistant",
                        Role::System => "system",
                        Role::Tool => "tool",
                    },
                    "content": m.content,
                })
            })
            .collect()
    }

    fn build_body(request: &ProviderRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": stream,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        if stream {
            body["stream_options"] = serde_json::json!({ "include_usage": true });
        }

        body
    }

    fn map_error_status(status: u16, body: String) -> ProviderError {
        match status {
            429 => ProviderError::RateLimited {
                retry_after_secs: 5,
            },
            401 | 403 => ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ),
            _ => ProviderError::ApiError {
                status_code: status,
                message: body,
            },
        }
    }
}

#[async_trait]
impl marquee_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(&request, false);

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider returned error");
            return Err(Self::map_error_status(status, error_body));
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::ApiError {
                    status_code: 200,
                    message: "No choices in response".into(),
                })?;

        let message = Message::assistant(choice.message.content.unwrap_or_default());

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message,
            usage,
            model: api_response.model,
        })
    }

    async fn stream(
        &self,
        request: ProviderRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let url = format!("{}/chat/completions", self.base_url);
        let body = Self::build_body(&request, true);

        debug!(provider = %self.name, model = %request.model, "Sending streaming request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Provider streaming error");
            return Err(Self::map_error_status(status, error_body));
        }

        let (tx, rx) = tokio::sync::mpsc::channel(64);

        // Spawn task to read the SSE byte stream and parse chunks
        tokio::spawn(async move {
            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut usage: Option<Usage> = None;

            while let Some(chunk_result) = byte_stream.next().await {
                let bytes = match chunk_result {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx
                            .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                            .await;
                        return;
                    }
                };

                // Append new bytes to our line buffer
                buffer.push_str(&String::from_utf8_lossy(&bytes));

                // Process complete lines
                while let Some(line_end) = buffer.find('\n') {
                    let line = buffer[..line_end].trim_end_matches('\r').to_string();
                    buffer = buffer[line_end + 1..].to_string();

                    // Skip empty lines and SSE comments
                    if line.is_empty() || line.starts_with(':') {
                        continue;
                    }

                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    let data = data.trim();

                    // "[DONE]" signals end of stream
                    if data == "[DONE]" {
                        let _ = tx
                            .send(Ok(StreamChunk {
                                content: None,
                                done: true,
                                usage: usage.take(),
                            }))
                            .await;
                        return;
                    }

                    match serde_json::from_str::<StreamResponse>(data) {
                        Ok(stream_resp) => {
                            if let Some(u) = stream_resp.usage {
                                usage = Some(Usage {
                                    prompt_tokens: u.prompt_tokens,
                                    completion_tokens: u.completion_tokens,
                                    total_tokens: u.total_tokens,
                                });
                            }

                            if let Some(choice) = stream_resp.choices.first() {
                                let has_content = choice
                                    .delta
                                    .content
                                    .as_ref()
                                    .is_some_and(|c| !c.is_empty());

                                if has_content {
                                    let chunk = StreamChunk {
                                        content: choice.delta.content.clone(),
                                        done: false,
                                        usage: None,
                                    };

                                    if tx.send(Ok(chunk)).await.is_err() {
                                        return; // receiver dropped
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            debug!(error = %e, "Skipping unparseable SSE chunk");
                        }
                    }
                }
            }

            // Stream ended without [DONE]; emit a final chunk anyway
            let _ = tx
                .send(Ok(StreamChunk {
                    content: None,
                    done: true,
                    usage: usage.take(),
                }))
                .await;
        });

        Ok(rx)
    }
}

// --- API wire types ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    model: String,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_messages_map_roles() {
        let messages = vec![
            Message::system("routing prompt"),
            Message::user("what's playing?"),
            Message::assistant("{\"functions\": []}"),
            Message::tool_result("No movies are currently playing."),
        ];

        let api = OpenAiCompatProvider::to_api_messages(&messages);
        let roles: Vec<_> = api.iter().map(|m| m["role"].as_str().unwrap()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "tool"]);
        assert_eq!(api[1]["content"], "what's playing?");
    }

    #[test]
    fn body_includes_max_tokens_when_set() {
        let request = ProviderRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.2,
            max_tokens: Some(500),
            stream: false,
        };

        let body = OpenAiCompatProvider::build_body(&request, false);
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["stream"], false);

        let streaming = OpenAiCompatProvider::build_body(&request, true);
        assert_eq!(streaming["stream"], true);
        assert_eq!(streaming["stream_options"]["include_usage"], true);
    }

    #[test]
    fn error_status_mapping() {
        assert!(matches!(
            OpenAiCompatProvider::map_error_status(429, String::new()),
            ProviderError::RateLimited { .. }
        ));
        assert!(matches!(
            OpenAiCompatProvider::map_error_status(401, String::new()),
            ProviderError::AuthenticationFailed(_)
        ));
        assert!(matches!(
            OpenAiCompatProvider::map_error_status(500, String::new()),
            ProviderError::ApiError {
                status_code: 500,
                ..
            }
        ));
    }

    #[test]
    fn parse_completion_response() {
        let raw = serde_json::json!({
            "model": "gpt-4o-mini",
            "choices": [{"message": {"content": "{\"functions\": []}"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 5, "total_tokens": 17}
        });
        let parsed: ApiResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.choices[0].message.content.as_deref(), Some("{\"functions\": []}"));
        assert_eq!(parsed.usage.unwrap().total_tokens, 17);
    }

    #[test]
    fn parse_stream_chunk() {
        let raw = r#"{"choices":[{"delta":{"content":"Du"},"finish_reason":null}]}"#;
        let parsed: StreamResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.choices[0].delta.content.as_deref(), Some("Du"));
    }
}
