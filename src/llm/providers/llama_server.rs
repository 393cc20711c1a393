// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! llama-server subprocess manager
//!
//! Launches llama-server on a local GGUF model when no external inference
//! server is configured. The process is killed when the manager is dropped.

use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use crate::config::{InferenceConfig, Settings};
use crate::error::{Result, WoodyError};

const HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Manages a llama-server subprocess
pub struct LlamaServer {
    process: Mutex<Option<Child>>,
    binary_path: PathBuf,
    model_path: PathBuf,
    port: u16,
    ctx_size: Option<u32>,
    gpu_layers: Option<i32>,
    threads: Option<u32>,
    chat_template: Option<String>,
    startup_timeout: Duration,
}

impl LlamaServer {
    pub fn new(config: &InferenceConfig, model_path: PathBuf) -> Self {
        Self {
            process: Mutex::new(None),
            binary_path: config.server_binary.clone(),
            model_path,
            port: config.port,
            ctx_size: config.ctx_size,
            gpu_layers: config.gpu_layers,
            threads: config.threads,
            chat_template: config.chat_template.clone(),
            startup_timeout: config.startup_timeout(),
        }
    }

    /// A manager for the configured model, or `None` when an external server
    /// is configured or no model path is set.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        if !settings.launches_local_server() {
            return None;
        }
        let model_path = settings.inference.model_path.clone()?;
        Some(Self::new(&settings.inference, model_path))
    }

    /// Command-line arguments passed to llama-server
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![
            "--model".to_string(),
            self.model_path.to_string_lossy().into_owned(),
            "--host".to_string(),
            "127.0.0.1".to_string(),
            "--port".to_string(),
            self.port.to_string(),
        ];

        if let Some(ctx) = self.ctx_size {
            args.extend(["--ctx-size".to_string(), ctx.to_string()]);
        }
        if let Some(ngl) = self.gpu_layers {
            args.extend(["--n-gpu-layers".to_string(), ngl.to_string()]);
        }
        if let Some(threads) = self.threads {
            args.extend(["--threads".to_string(), threads.to_string()]);
        }
        if let Some(template) = &self.chat_template {
            args.extend(["--chat-template".to_string(), template.clone()]);
        }

        args
    }

    /// Get the base URL for API calls
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Start the subprocess and wait until it reports healthy.
    pub async fn start(&self) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let child = Command::new(&self.binary_path)
            .args(self.args())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                WoodyError::Config(format!(
                    "Failed to start llama-server at {}: {}",
                    self.binary_path.display(),
                    e
                ))
            })?;

        *self.slot() = Some(child);

        self.wait_for_ready().await?;

        tracing::info!(
            port = self.port,
            model = %self.model_path.display(),
            "llama-server started"
        );
        Ok(())
    }

    /// Poll `/health` until it answers, the process dies, or the timeout passes.
    async fn wait_for_ready(&self) -> Result<()> {
        let client = reqwest::Client::new();
        let url = format!("{}/health", self.base_url());
        let deadline = tokio::time::Instant::now() + self.startup_timeout;

        while tokio::time::Instant::now() < deadline {
            if !self.is_running() {
                return Err(WoodyError::Config(
                    "llama-server process exited unexpectedly during startup".to_string(),
                ));
            }

            if let Ok(resp) = client.get(&url).send().await {
                if resp.status().is_success() {
                    return Ok(());
                }
            }

            tokio::time::sleep(HEALTH_POLL_INTERVAL).await;
        }

        self.shutdown();
        Err(WoodyError::Config(format!(
            "llama-server did not become ready within {} seconds",
            self.startup_timeout.as_secs()
        )))
    }

    /// Check if the server process is still running
    pub fn is_running(&self) -> bool {
        match self.slot().as_mut() {
            Some(child) => matches!(child.try_wait(), Ok(None)),
            None => false,
        }
    }

    /// Kill the server process
    pub fn shutdown(&self) {
        if let Some(mut child) = self.slot().take() {
            let _ = child.kill();
            let _ = child.wait();
            tracing::debug!("llama-server stopped");
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<Child>> {
        match self.process.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Drop for LlamaServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
