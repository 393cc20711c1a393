// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Woody - a chat room bot that answers questions with a local language model.
//!
//! This crate exposes the runtime used by the `woody` binary (`src/main.rs`).
//!
//! Architecture highlights:
//! - `chat`: login, websocket supervision, command dispatch, conversation
//!   state and streamed responses
//! - `llm`: inference engine abstraction, an OpenAI-compatible streaming
//!   engine and a scripted mock
//! - `config`: JSON settings with environment overrides
//! - `cli`: command-line flags

pub mod chat;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;

pub use error::{Result, WoodyError};
