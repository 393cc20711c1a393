// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for Woody
//!
//! This module defines all error types used throughout the bot.

use thiserror::Error;

/// Main error type for Woody operations
#[derive(Error, Debug)]
pub enum WoodyError {
    /// Inference API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Login exchange errors
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),

    /// WebSocket transport errors
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Inference API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Network connectivity error
    #[error("Network error: {0}")]
    Network(String),

    /// API returned an error
    #[error("API error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Timeout waiting for response
    #[error("Request timed out")]
    Timeout,

    /// Streaming error
    #[error("Streaming error: {0}")]
    StreamError(String),
}

/// Login exchange error types
#[derive(Error, Debug)]
pub enum AuthError {
    /// Account name or password not configured
    #[error("missing account name or password")]
    MissingCredentials,

    /// The login response did not set one of the session cookies
    #[error("login response did not set {0}")]
    MissingToken(&'static str),

    /// The login endpoint answered with an unexpected status
    #[error("login rejected with status {status}")]
    Rejected { status: u16 },
}

/// Result type alias for Woody operations
pub type Result<T> = std::result::Result<T, WoodyError>;

impl From<tokio_tungstenite::tungstenite::Error> for WoodyError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        WoodyError::Transport(err.to_string())
    }
}

impl WoodyError {
    /// Errors that must stop the process instead of being retried.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            WoodyError::Auth(AuthError::MissingCredentials) | WoodyError::Config(_)
        )
    }
}
