// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Inference engine implementations

pub mod llama_server;
pub mod openai_compat;

pub use llama_server::LlamaServer;
pub use openai_compat::OpenAiCompatEngine;
