// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! OpenAI-compatible inference engine
//!
//! Talks to any server exposing `/v1/chat/completions` with SSE streaming,
//! such as llama.cpp's `llama-server` running a local GGUF model.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::error::{ApiError, Result, WoodyError};
use crate::llm::message::Turn;
use crate::llm::provider::{CompletionRequest, Fragment, FragmentStream, InferenceEngine};

/// Inference engine backed by an OpenAI-compatible HTTP server
pub struct OpenAiCompatEngine {
    client: Client,
    base_url: String,
    model: String,
}

impl OpenAiCompatEngine {
    /// Create an engine for the server at `base_url`
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    /// Create an engine from settings (env override applied)
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.get_inference_url(), settings.inference.model.clone())
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn build_request<'a>(&'a self, request: &'a CompletionRequest) -> OaiRequest<'a> {
        OaiRequest {
            model: &self.model,
            messages: &request.messages,
            stream: true,
            max_tokens: request.max_tokens,
            stop: &request.stop,
            temperature: request.temperature,
            seed: request.seed,
        }
    }
}

#[async_trait]
impl InferenceEngine for OpenAiCompatEngine {
    fn name(&self) -> &str {
        "openai-compat"
    }

    async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream> {
        let body = self.build_request(&request);

        let response = self
            .client
            .post(self.completions_url())
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WoodyError::Api(ApiError::Timeout)
                } else {
                    WoodyError::Api(ApiError::Network(format!(
                        "Failed to reach inference server: {}",
                        e
                    )))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(WoodyError::Api(ApiError::ServerError {
                status,
                message: format!("Inference server error: {}", body),
            }));
        }

        let byte_stream = response.bytes_stream();

        // Lines are split on raw bytes so multi-byte characters survive chunk boundaries
        let fragment_stream = async_stream::try_stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut done = false;

            for await chunk_result in byte_stream {
                let chunk = chunk_result
                    .map_err(|e| WoodyError::Api(ApiError::StreamError(e.to_string())))?;
                buffer.extend_from_slice(&chunk);

                while let Some(line_end) = buffer.iter().position(|b| *b == b'\n') {
                    let line: Vec<u8> = buffer.drain(..=line_end).collect();
                    let line = String::from_utf8_lossy(&line);

                    match parse_sse_line(line.trim()) {
                        Some(SseLine::Done) => {
                            done = true;
                            break;
                        }
                        Some(SseLine::Content(text)) => yield Fragment::Content(text),
                        None => {}
                    }
                }

                if done {
                    break;
                }
            }

            yield Fragment::End;
        };

        Ok(Box::pin(fragment_stream))
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    Content(String),
    Done,
}

/// Interpret one SSE line. Comments, blank lines, non-data fields, chunks
/// without text and unparseable payloads yield `None`.
fn parse_sse_line(line: &str) -> Option<SseLine> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return Some(SseLine::Done);
    }

    let chunk: OaiStreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::debug!(error = %e, "skipping unparseable stream chunk");
            return None;
        }
    };

    chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty())
        .map(SseLine::Content)
}

// OpenAI-compatible wire types

#[derive(Debug, Serialize)]
struct OaiRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
    stream: bool,
    max_tokens: u32,
    #[serde(skip_serializing_if = "is_empty_slice")]
    stop: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<u32>,
}

fn is_empty_slice(items: &&[String]) -> bool {
    items.is_empty()
}

#[derive(Debug, Deserialize)]
struct OaiStreamChunk {
    #[serde(default)]
    choices: Vec<OaiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OaiStreamChoice {
    #[serde(default)]
    delta: OaiDelta,
}

#[derive(Debug, Default, Deserialize)]
struct OaiDelta {
    #[serde(default)]
    content: Option<String>,
}
