// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat session state
//!
//! Encapsulates the state shared by the dispatcher and the streaming task:
//! the conversation and the single-flight flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::chat::conversation::ConversationState;
use crate::config::ConversationConfig;

/// Shared session state. Cloning shares the same underlying state.
#[derive(Clone)]
pub struct Session {
    conversation: Arc<Mutex<ConversationState>>,
    streaming: Arc<AtomicBool>,
}

impl Session {
    pub fn new(config: &ConversationConfig) -> Self {
        Self {
            conversation: Arc::new(Mutex::new(ConversationState::new(config))),
            streaming: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Lock the conversation. Never hold the guard across an await point.
    pub fn conversation(&self) -> MutexGuard<'_, ConversationState> {
        match self.conversation.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("conversation lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Whether a model response is in flight
    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::SeqCst)
    }

    /// Claim the single-flight slot. `None` if a response is already streaming.
    pub fn try_begin_streaming(&self) -> Option<StreamingGuard> {
        self.streaming
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| StreamingGuard {
                flag: Arc::clone(&self.streaming),
            })
    }
}

/// Holds the single-flight slot; releases it when dropped
#[must_use = "the streaming slot is released as soon as the guard is dropped"]
pub struct StreamingGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for StreamingGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}
