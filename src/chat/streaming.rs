// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Streaming response handling
//!
//! Turns the model's fragment stream into chat events: a `messageEnd` +
//! `messageStart` marker pair, rate-limited `messageChange` updates carrying
//! the text so far, and one final `messageEnd` with the complete text.
//!
//! The fragment normalization lives in [`ResponseBuffer`] so it can be tested
//! without any I/O.

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::chat::connection::ChatSender;
use crate::chat::protocol::{OutboundEvent, RoomId};
use crate::chat::session::{Session, StreamingGuard};
use crate::config::{InferenceConfig, StreamingConfig};
use crate::llm::message::Turn;
use crate::llm::provider::{CompletionRequest, Fragment, InferenceEngine};

/// Accumulator for one streamed response
#[derive(Debug)]
pub struct ResponseBuffer {
    /// Text accepted so far
    text: String,
    /// When the last `messageChange` went out
    last_emitted_at: Option<Instant>,
    /// Set once visible content has been accepted
    leading_whitespace_stripped: bool,
    /// Whether the last accepted character was a space
    last_char_was_space: bool,
    /// Minimum gap between two updates
    interval: Duration,
}

impl ResponseBuffer {
    pub fn new(interval: Duration) -> Self {
        Self {
            text: String::new(),
            last_emitted_at: None,
            leading_whitespace_stripped: false,
            // a response never starts with a bare space
            last_char_was_space: true,
            interval,
        }
    }

    /// Accumulated text
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Apply the normalization rules to one fragment. Returns whether it was kept.
    pub fn accept(&mut self, fragment: &str) -> bool {
        if fragment == "\n" && !self.leading_whitespace_stripped {
            return false;
        }
        if fragment == " " && self.last_char_was_space {
            return false;
        }

        let piece = if self.leading_whitespace_stripped {
            fragment
        } else {
            fragment.trim_start()
        };
        if piece.is_empty() {
            return false;
        }

        self.leading_whitespace_stripped = true;
        self.last_char_was_space = piece.ends_with(' ');
        self.text.push_str(piece);
        true
    }

    /// Text for a `messageChange` if the coalescing gate is open at `now`.
    pub fn poll_update(&mut self, now: Instant) -> Option<&str> {
        if self.text.is_empty() {
            return None;
        }
        if let Some(last) = self.last_emitted_at {
            if now.saturating_duration_since(last) < self.interval {
                return None;
            }
        }
        self.last_emitted_at = Some(now);
        Some(&self.text)
    }
}

/// Runs model queries and streams their output into the chat
#[derive(Clone)]
pub struct ResponseStreamer {
    engine: Arc<dyn InferenceEngine>,
    sender: ChatSender,
    session: Session,
    inference: InferenceConfig,
    streaming: StreamingConfig,
}

impl ResponseStreamer {
    pub fn new(
        engine: Arc<dyn InferenceEngine>,
        sender: ChatSender,
        session: Session,
        inference: InferenceConfig,
        streaming: StreamingConfig,
    ) -> Self {
        Self {
            engine,
            sender,
            session,
            inference,
            streaming,
        }
    }

    /// Run `respond` on its own task so the dispatcher keeps reading frames.
    pub fn spawn(
        &self,
        guard: StreamingGuard,
        room_id: RoomId,
        query: String,
        sender_name: String,
    ) -> JoinHandle<()> {
        let streamer = self.clone();
        tokio::spawn(async move {
            streamer.respond(guard, room_id, query, sender_name).await;
        })
    }

    /// Answer one query from start marker to final event.
    ///
    /// The guard is held until this returns, so the single-flight slot is
    /// released on every exit path. A stream that never ends keeps it forever.
    pub async fn respond(
        &self,
        guard: StreamingGuard,
        room_id: RoomId,
        query: String,
        sender_name: String,
    ) {
        let _guard = guard;
        tracing::info!(room = %room_id, sender = %sender_name, query = %query, "Responding");

        let placeholder = self.streaming.placeholder.as_str();
        self.sender
            .send(OutboundEvent::end(room_id.clone(), placeholder));
        self.sender
            .send(OutboundEvent::start(room_id.clone(), placeholder));

        let messages = self.session.conversation().begin_query(&query);
        let request = CompletionRequest::from_config(messages, &self.inference);

        let mut stream = match self.engine.stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(engine = self.engine.name(), error = %e, "Failed to start completion");
                return;
            }
        };

        let mut buffer = ResponseBuffer::new(self.streaming.update_interval());
        let mut updates = 0usize;

        while let Some(item) = stream.next().await {
            match item {
                Ok(Fragment::Content(fragment)) => {
                    if !buffer.accept(&fragment) {
                        continue;
                    }
                    if let Some(text) = buffer.poll_update(Instant::now()) {
                        self.sender
                            .send(OutboundEvent::change(room_id.clone(), text));
                        updates += 1;
                    }
                }
                Ok(Fragment::End) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Completion stream failed, sending partial text");
                    break;
                }
            }
        }

        let text = buffer.into_text();
        if !text.is_empty() {
            self.session.conversation().push(Turn::assistant(text.clone()));
        }

        tracing::debug!(room = %room_id, chars = text.chars().count(), updates, "Response complete");
        self.sender.send(OutboundEvent::end(room_id, text));
    }
}
