// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Inference engine trait and related types
//!
//! Defines the abstraction layer over whatever produces model tokens.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::config::InferenceConfig;
use crate::error::Result;
use crate::llm::message::Turn;

/// Lazy sequence of fragments produced by one completion
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment>> + Send>>;

/// Main trait for inference backends
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    /// Get the engine name (e.g., "openai-compat")
    fn name(&self) -> &str;

    /// Start a streaming completion.
    ///
    /// An `Err` here means the stream never started. Errors yielded by the
    /// stream itself happen after some fragments may already have arrived.
    async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream>;
}

/// Request for a streaming completion
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Messages in the conversation, system turn first
    pub messages: Vec<Turn>,

    /// Generation stops at any of these
    pub stop: Vec<String>,

    /// Maximum tokens in response
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Sampling seed
    pub seed: Option<u32>,
}

impl CompletionRequest {
    /// Build a request with the generation limits from settings.
    pub fn from_config(messages: Vec<Turn>, config: &InferenceConfig) -> Self {
        Self {
            messages,
            stop: config.stop.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            seed: config.seed,
        }
    }
}

/// One item of a completion stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Generated text
    Content(String),
    /// Generation finished
    End,
}

impl Fragment {
    pub fn content(text: impl Into<String>) -> Self {
        Fragment::Content(text.into())
    }
}
