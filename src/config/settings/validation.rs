// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use crate::error::{AuthError, Result, WoodyError};

use super::Settings;

impl Settings {
    /// Get the account name, checking env var first.
    pub fn get_account_name(&self) -> Option<String> {
        // Priority: env var > config file.
        non_empty(std::env::var(&self.account.name_env).ok())
            .or_else(|| non_empty(self.account.name.clone()))
    }

    /// Get the account password, checking env var first.
    pub fn get_password(&self) -> Option<String> {
        // Priority: env var > config file.
        non_empty(std::env::var(&self.account.password_env).ok())
            .or_else(|| non_empty(self.account.password.clone()))
    }

    /// Account name and password, or `MissingCredentials`.
    pub fn credentials(&self) -> Result<(String, String)> {
        match (self.get_account_name(), self.get_password()) {
            (Some(name), Some(password)) => Ok((name, password)),
            _ => Err(AuthError::MissingCredentials.into()),
        }
    }

    /// URL of an already running inference server, checking env var first.
    pub fn external_inference_url(&self) -> Option<String> {
        // Priority: env var > config file.
        non_empty(std::env::var(&self.inference.base_url_env).ok())
            .or_else(|| non_empty(self.inference.base_url.clone()))
    }

    /// Get the inference server URL: an external server, else the local port.
    pub fn get_inference_url(&self) -> String {
        self.external_inference_url()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", self.inference.port))
    }

    /// Whether the bot should launch llama-server itself.
    pub fn launches_local_server(&self) -> bool {
        self.inference.model_path.is_some() && self.external_inference_url().is_none()
    }

    /// Reject settings the bot cannot run with.
    pub fn validate(&self) -> Result<()> {
        let conversation = &self.conversation;
        if conversation.max_history == 0 {
            return Err(WoodyError::Config(
                "conversation.max_history must be greater than 0".to_string(),
            ));
        }
        if conversation.default_history_window > conversation.max_history {
            return Err(WoodyError::Config(format!(
                "conversation.default_history_window ({}) exceeds max_history ({})",
                conversation.default_history_window, conversation.max_history
            )));
        }
        if conversation.max_input_chars == 0 {
            return Err(WoodyError::Config(
                "conversation.max_input_chars must be greater than 0".to_string(),
            ));
        }
        if self.chat.triggers.iter().all(|t| t.trim().is_empty()) {
            return Err(WoodyError::Config(
                "chat.triggers must contain at least one word".to_string(),
            ));
        }
        if self.inference.model_path.is_some() && self.inference.port == 0 {
            return Err(WoodyError::Config(
                "inference.port must be set to launch llama-server".to_string(),
            ));
        }
        if self.inference.max_tokens == 0 {
            return Err(WoodyError::Config(
                "inference.max_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
