// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Bot wiring
//!
//! Builds the shared session, the dispatcher task and the connection
//! supervisor from settings, then runs until shutdown.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;

use crate::chat::auth::Authenticator;
use crate::chat::commands::CommandParser;
use crate::chat::connection::{ChatSender, Supervisor};
use crate::chat::dispatcher::Dispatcher;
use crate::chat::session::Session;
use crate::chat::streaming::ResponseStreamer;
use crate::config::Settings;
use crate::error::{Result, WoodyError};
use crate::llm::provider::InferenceEngine;

/// A configured bot, ready to run
pub struct Bot {
    settings: Settings,
    name: String,
    authenticator: Authenticator,
    engine: Arc<dyn InferenceEngine>,
    session: Session,
}

impl Bot {
    /// Missing credentials fail here, before any network traffic.
    pub fn new(settings: Settings, engine: Arc<dyn InferenceEngine>) -> Result<Self> {
        let (name, password) = settings.credentials()?;
        let authenticator = Authenticator::new(&settings.chat, name.clone(), password)?;
        let session = Session::new(&settings.conversation);

        Ok(Self {
            settings,
            name,
            authenticator,
            engine,
            session,
        })
    }

    /// Handle to the conversation state shared with the dispatcher
    pub fn session(&self) -> Session {
        self.session.clone()
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Connection and login failures are retried by the supervisor and never
    /// surface here.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let Self {
            settings,
            name,
            authenticator,
            engine,
            session,
        } = self;

        let sender = ChatSender::new();
        let (inbound_tx, inbound_rx) =
            mpsc::channel(settings.resilience.inbound_queue_capacity.max(1));

        let streamer = ResponseStreamer::new(
            engine,
            sender.clone(),
            session.clone(),
            settings.inference.clone(),
            settings.streaming.clone(),
        );
        let dispatcher = Dispatcher::new(
            name,
            CommandParser::from_config(&settings.chat),
            session,
            streamer,
            sender.clone(),
        );
        let dispatcher = tokio::spawn(dispatcher.run(inbound_rx));

        tracing::info!(
            url = %settings.chat.ws_url,
            account = authenticator.account_name(),
            "Starting bot"
        );

        let supervisor = Supervisor::new(
            settings.chat.clone(),
            authenticator,
            sender,
            inbound_tx,
            settings.resilience.reconnect_delay(),
            shutdown,
        );
        let result = supervisor.run().await;

        // dropping the supervisor closes the inbound channel
        drop(supervisor);
        if tokio::time::timeout(Duration::from_secs(1), dispatcher)
            .await
            .is_err()
        {
            tracing::warn!("Dispatcher did not stop in time");
        }

        tracing::info!("Bot stopped");
        result
    }
}

/// Run the bot until `shutdown` is cancelled.
pub async fn run_bot(
    settings: Settings,
    engine: Arc<dyn InferenceEngine>,
    shutdown: CancellationToken,
) -> Result<()> {
    Bot::new(settings, engine)?.run(shutdown).await
}

/// Outcome of a joined bot task. A panic is resumed on the caller; a
/// cancelled task is an error.
pub fn join_outcome(joined: std::result::Result<Result<()>, JoinError>) -> Result<()> {
    match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
        Err(e) => Err(WoodyError::Transport(format!("bot task failed: {}", e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AuthError;
    use crate::llm::mock_provider::MockEngine;

    #[tokio::test]
    async fn test_missing_credentials_is_fatal() {
        let mut settings = Settings::default();
        settings.account.name_env = "WOODY_TEST_BOT_UNSET_NAME".to_string();
        settings.account.password_env = "WOODY_TEST_BOT_UNSET_PASSWORD".to_string();

        let err = run_bot(settings, Arc::new(MockEngine::new()), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WoodyError::Auth(AuthError::MissingCredentials)));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_stops_on_shutdown_while_server_unreachable() {
        let mut settings = Settings::default();
        settings.account.name = Some("woody".to_string());
        settings.account.password = Some("pw".to_string());
        settings.account.name_env = "WOODY_TEST_BOT_UNSET_NAME".to_string();
        settings.account.password_env = "WOODY_TEST_BOT_UNSET_PASSWORD".to_string();
        settings.chat.base_url = "http://127.0.0.1:1".to_string();

        let bot = Bot::new(settings, Arc::new(MockEngine::new())).unwrap();
        assert!(!bot.session().is_streaming());

        let shutdown = CancellationToken::new();
        let task = tokio::spawn(bot.run(shutdown.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();

        let result = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("bot should stop promptly")
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_join_outcome_passes_result_through() {
        let ok = tokio::spawn(async { Ok(()) }).await;
        assert!(join_outcome(ok).is_ok());

        let failed = tokio::spawn(async { Err(WoodyError::Config("bad".to_string())) }).await;
        assert!(matches!(join_outcome(failed), Err(WoodyError::Config(_))));
    }

    #[tokio::test]
    async fn test_join_outcome_cancelled_task_is_error() {
        let task = tokio::spawn(async {
            std::future::pending::<()>().await;
            Ok(())
        });
        task.abort();

        let err = join_outcome(task.await).unwrap_err();
        assert!(matches!(err, WoodyError::Transport(_)));
        assert!(err.to_string().contains("bot task failed"));
    }

    #[tokio::test]
    #[should_panic(expected = "dispatcher exploded")]
    async fn test_join_outcome_resumes_panic() {
        let joined = tokio::spawn(async {
            if true {
                panic!("dispatcher exploded");
            }
            Ok(())
        })
        .await;

        let _ = join_outcome(joined);
    }
}
