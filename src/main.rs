// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Woody - chat room bot backed by a local language model
//!
//! Entry point for the woody binary.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use woody::chat::{join_outcome, run_bot};
use woody::cli::Cli;
use woody::config::Settings;
use woody::error::Result;
use woody::llm::providers::{LlamaServer, OpenAiCompatEngine};

/// How long shutdown waits for the socket to close
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::WARN.into());
    for directive in cli.log_directives() {
        if let Ok(parsed) = directive.parse() {
            env_filter = env_filter.add_directive(parsed);
        }
    }
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };

    if let Err(e) = settings.credentials() {
        tracing::error!(
            error = %e,
            name_env = %settings.account.name_env,
            password_env = %settings.account.password_env,
            "Account name and password are required"
        );
        return Ok(());
    }

    // kept alive until main returns; dropping it stops the server
    let local_server = LlamaServer::from_settings(&settings);
    match &local_server {
        Some(server) => server.start().await?,
        None if settings.external_inference_url().is_none() => {
            tracing::warn!(
                "No inference server or model path configured, assuming one is already listening"
            );
        }
        None => {}
    }

    let engine = Arc::new(OpenAiCompatEngine::from_settings(&settings));
    tracing::info!(url = %settings.get_inference_url(), "Using inference server");

    let shutdown = CancellationToken::new();
    let mut bot = tokio::spawn(run_bot(settings, engine, shutdown.clone()));

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                tracing::error!(error = %e, "Failed to listen for interrupt");
            }
            tracing::info!("Interrupted, shutting down");
            shutdown.cancel();
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut bot).await.is_err() {
                tracing::warn!("Bot did not stop in time");
            }
            Ok(())
        }
        joined = &mut bot => join_outcome(joined),
    }
}
