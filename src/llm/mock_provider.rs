// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Mock inference engine for testing
//!
//! Provides a scripted implementation of the InferenceEngine trait that can
//! be used in tests without a running model server.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::{ApiError, Result, WoodyError};
use crate::llm::provider::{CompletionRequest, Fragment, FragmentStream, InferenceEngine};

/// A scripted inference engine for tests
#[derive(Clone)]
pub struct MockEngine {
    /// Configured responses
    responses: Arc<Mutex<Vec<MockResponse>>>,
    /// Call counter
    call_count: Arc<AtomicUsize>,
    /// Recorded requests
    recorded_requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

/// A pre-configured response for the mock engine
#[derive(Clone, Debug, Default)]
pub struct MockResponse {
    /// Fragments yielded in order (an `End` is appended if missing)
    pub fragments: Vec<String>,
    /// Sleep before each fragment
    pub delay: Duration,
    /// Fail before any fragment is produced
    pub fail_to_start: bool,
    /// Yield an error after this many fragments
    pub fail_after: Option<usize>,
    /// Wait for a notification before the first fragment
    pub hold: Option<Arc<Notify>>,
}

impl MockResponse {
    pub fn fragments<S: Into<String>>(fragments: impl IntoIterator<Item = S>) -> Self {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn held_by(mut self, gate: Arc<Notify>) -> Self {
        self.hold = Some(gate);
        self
    }

    pub fn failing_after(mut self, count: usize) -> Self {
        self.fail_after = Some(count);
        self
    }

    pub fn failing_to_start() -> Self {
        Self {
            fail_to_start: true,
            ..Default::default()
        }
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Create a new mock engine answering "Mock response"
    pub fn new() -> Self {
        Self::with_response(MockResponse::fragments(["Mock", " response"]))
    }

    /// Create a mock engine that always answers with `response`
    pub fn with_response(response: MockResponse) -> Self {
        Self::with_responses(vec![response])
    }

    /// Queue multiple responses (returned in order, the last one repeats)
    pub fn with_responses(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            call_count: Arc::new(AtomicUsize::new(0)),
            recorded_requests: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Get the number of times stream() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Get all recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        lock(&self.recorded_requests).clone()
    }

    /// Get the last request made
    pub fn last_request(&self) -> Option<CompletionRequest> {
        lock(&self.recorded_requests).last().cloned()
    }

    fn next_response(&self) -> MockResponse {
        let count = self.call_count.fetch_add(1, Ordering::SeqCst);
        let responses = lock(&self.responses);
        if responses.is_empty() {
            MockResponse::default()
        } else {
            responses[count.min(responses.len() - 1)].clone()
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Mock engine lock was poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream(&self, request: CompletionRequest) -> Result<FragmentStream> {
        lock(&self.recorded_requests).push(request);

        let response = self.next_response();
        if response.fail_to_start {
            return Err(WoodyError::Api(ApiError::Network(
                "mock engine refused to start".to_string(),
            )));
        }

        let stream = async_stream::stream! {
            if let Some(gate) = &response.hold {
                gate.notified().await;
            }

            for (index, text) in response.fragments.iter().enumerate() {
                if response.fail_after == Some(index) {
                    yield Err(WoodyError::Api(ApiError::StreamError(
                        "mock stream broke".to_string(),
                    )));
                    break;
                }
                if !response.delay.is_zero() {
                    tokio::time::sleep(response.delay).await;
                }
                yield Ok(Fragment::Content(text.clone()));
            }

            yield Ok(Fragment::End);
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::message::Turn;
    use futures::StreamExt;

    fn request(text: &str) -> CompletionRequest {
        CompletionRequest {
            messages: vec![Turn::user(text)],
            stop: vec![],
            max_tokens: 16,
            temperature: None,
            seed: None,
        }
    }

    #[tokio::test]
    async fn test_mock_engine_streams_fragments() {
        let engine = MockEngine::with_response(MockResponse::fragments(["a", "b"]));
        let items: Vec<Fragment> = engine
            .stream(request("hi"))
            .await
            .unwrap()
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(
            items,
            vec![Fragment::content("a"), Fragment::content("b"), Fragment::End]
        );
        assert_eq!(engine.call_count(), 1);
        assert_eq!(engine.last_request().unwrap().messages[0].content, "hi");
    }

    #[tokio::test]
    async fn test_mock_engine_cycles_responses() {
        let engine = MockEngine::with_responses(vec![
            MockResponse::failing_to_start(),
            MockResponse::fragments(["ok"]),
        ]);
        assert!(engine.stream(request("1")).await.is_err());
        assert!(engine.stream(request("2")).await.is_ok());
        assert!(engine.stream(request("3")).await.is_ok());
        assert_eq!(engine.recorded_requests().len(), 3);
    }

    #[tokio::test]
    async fn test_mock_engine_fails_mid_stream() {
        let engine =
            MockEngine::with_response(MockResponse::fragments(["a", "b"]).failing_after(1));
        let items: Vec<Result<Fragment>> = engine.stream(request("x")).await.unwrap().collect().await;
        assert!(matches!(items[0], Ok(Fragment::Content(_))));
        assert!(items[1].is_err());
    }
}
