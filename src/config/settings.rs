// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management for Woody
//!
//! Handles loading settings from ~/.woody/settings.json. Every field has a
//! default, so an absent or partial file is valid; secrets are expected to
//! come from the environment.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

mod io;
mod validation;

/// Main settings structure, stored in ~/.woody/settings.json
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Chat account used to log in
    #[serde(default)]
    pub account: AccountConfig,

    /// Chat service endpoints and trigger words
    #[serde(default)]
    pub chat: ChatConfig,

    /// Conversation history settings
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Partial-update streaming settings
    #[serde(default)]
    pub streaming: StreamingConfig,

    /// Inference server settings
    #[serde(default)]
    pub inference: InferenceConfig,

    /// Reconnect and queueing settings
    #[serde(default)]
    pub resilience: ResilienceConfig,
}

/// Chat account configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account name (if stored directly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Password (if stored directly, not recommended)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Environment variable name for the account name
    #[serde(default = "default_name_env")]
    pub name_env: String,

    /// Environment variable name for the password
    #[serde(default = "default_password_env")]
    pub password_env: String,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            name: None,
            password: None,
            name_env: default_name_env(),
            password_env: default_password_env(),
        }
    }
}

/// Chat service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the chat site (login endpoint lives under it)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// WebSocket endpoint
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Origin sent with every request
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Send `DNT: 1`
    #[serde(default = "default_true")]
    pub dnt: bool,

    /// Characters stripped from the start of a message before matching triggers
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Command words that address the bot
    #[serde(default = "default_triggers")]
    pub triggers: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            ws_url: default_ws_url(),
            user_agent: default_user_agent(),
            origin: default_origin(),
            dnt: true,
            prefix: default_prefix(),
            triggers: default_triggers(),
        }
    }
}

/// Conversation history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Queries are cut to this many characters
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,

    /// Hard cap on remembered turns
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Turns included in each prompt at startup
    #[serde(default)]
    pub default_history_window: usize,

    /// System prompt at startup and after `system = default`
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_input_chars: default_max_input_chars(),
            max_history: default_max_history(),
            default_history_window: 0,
            default_system_prompt: default_system_prompt(),
        }
    }
}

/// Streaming configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    /// Minimum milliseconds between two `messageChange` events
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,

    /// Text of the `messageStart` marker
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval_ms(),
            placeholder: default_placeholder(),
        }
    }
}

impl StreamingConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}

/// Inference server configuration (OpenAI-compatible, e.g. llama-server)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Base URL of an existing server.
    /// When unset and `model_path` is set, Woody launches llama-server itself.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Environment variable that overrides `base_url`
    #[serde(default = "default_inference_url_env")]
    pub base_url_env: String,

    /// Model name sent with each request
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens generated per response
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Stop tokens
    #[serde(default = "default_stop")]
    pub stop: Vec<String>,

    /// Sampling temperature (server default if unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Sampling seed
    #[serde(default = "default_seed", skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,

    /// Path to the GGUF model file served by a launched llama-server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    /// llama-server executable
    #[serde(default = "default_server_binary")]
    pub server_binary: PathBuf,

    /// Port for a launched llama-server
    #[serde(default = "default_server_port")]
    pub port: u16,

    /// Context size (None = model default)
    #[serde(default = "default_ctx_size", skip_serializing_if = "Option::is_none")]
    pub ctx_size: Option<u32>,

    /// GPU layers to offload (None = server default)
    #[serde(default = "default_gpu_layers", skip_serializing_if = "Option::is_none")]
    pub gpu_layers: Option<i32>,

    /// CPU threads (None = server default)
    #[serde(default = "default_threads", skip_serializing_if = "Option::is_none")]
    pub threads: Option<u32>,

    /// Built-in chat template name
    #[serde(default = "default_chat_template", skip_serializing_if = "Option::is_none")]
    pub chat_template: Option<String>,

    /// Seconds to wait for a launched server to report healthy
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            base_url_env: default_inference_url_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            stop: default_stop(),
            temperature: None,
            seed: default_seed(),
            model_path: None,
            server_binary: default_server_binary(),
            port: default_server_port(),
            ctx_size: default_ctx_size(),
            gpu_layers: default_gpu_layers(),
            threads: default_threads(),
            chat_template: default_chat_template(),
            startup_timeout_secs: default_startup_timeout_secs(),
        }
    }
}

impl InferenceConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }
}

/// Reconnect configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResilienceConfig {
    /// Seconds to wait before re-authenticating after a dropped connection
    #[serde(default = "default_reconnect_delay_secs")]
    pub reconnect_delay_secs: u64,

    /// Inbound frames buffered between the socket and the dispatcher
    #[serde(default = "default_inbound_queue_capacity")]
    pub inbound_queue_capacity: usize,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: default_reconnect_delay_secs(),
            inbound_queue_capacity: default_inbound_queue_capacity(),
        }
    }
}

impl ResilienceConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }
}

fn default_name_env() -> String {
    "WOODY_USERNAME".to_string()
}

fn default_password_env() -> String {
    "WOODY_PASSWORD".to_string()
}

fn default_base_url() -> String {
    "https://deek.chat".to_string()
}

fn default_ws_url() -> String {
    "wss://deek.chat/ws".to_string()
}

fn default_user_agent() -> String {
    "woody".to_string()
}

fn default_origin() -> String {
    "https://deek.chat".to_string()
}

fn default_true() -> bool {
    true
}

fn default_prefix() -> String {
    ",".to_string()
}

fn default_triggers() -> Vec<String> {
    ["ai", "woody", "woody:", "@woody"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_input_chars() -> usize {
    200
}

fn default_max_history() -> usize {
    100
}

fn default_system_prompt() -> String {
    "Your name is woody and you respond to questions. Respond in 280 characters or less."
        .to_string()
}

fn default_update_interval_ms() -> u64 {
    100
}

fn default_placeholder() -> String {
    "Thinking...".to_string()
}

fn default_inference_url_env() -> String {
    "WOODY_INFERENCE_URL".to_string()
}

fn default_model() -> String {
    "local".to_string()
}

fn default_max_tokens() -> u32 {
    360
}

fn default_stop() -> Vec<String> {
    vec!["<|im_end|>".to_string(), "</s>".to_string()]
}

fn default_seed() -> Option<u32> {
    Some(326)
}

fn default_server_binary() -> PathBuf {
    PathBuf::from("llama-server")
}

fn default_server_port() -> u16 {
    8080
}

fn default_ctx_size() -> Option<u32> {
    Some(2048)
}

fn default_gpu_layers() -> Option<i32> {
    Some(33)
}

fn default_threads() -> Option<u32> {
    Some(6)
}

fn default_chat_template() -> Option<String> {
    Some("chatml".to_string())
}

fn default_startup_timeout_secs() -> u64 {
    120
}

fn default_reconnect_delay_secs() -> u64 {
    3
}

fn default_inbound_queue_capacity() -> usize {
    64
}
