// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Inbound frame dispatch
//!
//! Runs as one long-lived task reading the inbound channel. Administrative
//! commands are answered inline; queries are handed to the streaming engine
//! on their own task so the next frame is read immediately.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::chat::commands::{ChatCommand, CommandParser, HistoryWindow, SystemPrompt};
use crate::chat::connection::ChatSender;
use crate::chat::protocol::{ChatEvent, EventKind, OutboundEvent, RoomId};
use crate::chat::session::Session;
use crate::chat::streaming::ResponseStreamer;

/// Why a frame produced nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Not valid JSON or missing required fields
    Malformed,
    /// Not a `message` frame
    NotAMessage,
    /// Sent by the bot's own account
    OwnEcho,
    /// Blank text
    Empty,
    /// First word is not a trigger
    NotAddressed,
    /// Addressed to the bot but not a usable command
    InvalidCommand,
    /// A response is already streaming
    Busy,
}

/// Outcome of one frame
#[derive(Debug)]
pub enum Dispatch {
    Dropped(DropReason),
    /// An administrative command was applied
    Handled,
    /// A query was accepted; the handle completes when the final event is sent
    Responding(JoinHandle<()>),
}

impl Dispatch {
    pub fn is_dropped(&self) -> bool {
        matches!(self, Dispatch::Dropped(_))
    }
}

pub struct Dispatcher {
    bot_name: String,
    parser: CommandParser,
    session: Session,
    streamer: ResponseStreamer,
    sender: ChatSender,
}

impl Dispatcher {
    pub fn new(
        bot_name: impl Into<String>,
        parser: CommandParser,
        session: Session,
        streamer: ResponseStreamer,
        sender: ChatSender,
    ) -> Self {
        Self {
            bot_name: bot_name.into(),
            parser,
            session,
            streamer,
            sender,
        }
    }

    /// Consume frames until every inbound sender is gone.
    pub async fn run(self, mut inbound: mpsc::Receiver<String>) {
        while let Some(frame) = inbound.recv().await {
            if let Dispatch::Dropped(reason) = self.handle_frame(&frame) {
                tracing::trace!(?reason, "Frame ignored");
            }
        }
        tracing::debug!("Inbound channel closed, dispatcher stopping");
    }

    /// Route one raw frame.
    pub fn handle_frame(&self, frame: &str) -> Dispatch {
        let event = match ChatEvent::parse(frame) {
            Ok(event) => event,
            Err(e) => {
                tracing::debug!(error = %e, "Dropping malformed frame");
                return Dispatch::Dropped(DropReason::Malformed);
            }
        };

        if event.kind != EventKind::Message {
            return Dispatch::Dropped(DropReason::NotAMessage);
        }
        let Some(room_id) = event.room_id else {
            return Dispatch::Dropped(DropReason::Malformed);
        };
        if event.sender_name == self.bot_name {
            return Dispatch::Dropped(DropReason::OwnEcho);
        }
        if event.text.trim().is_empty() {
            return Dispatch::Dropped(DropReason::Empty);
        }

        let Some(command) = self.parser.parse(&event.text) else {
            return Dispatch::Dropped(DropReason::NotAddressed);
        };

        tracing::debug!(room = %room_id, sender = %event.sender_name, ?command, "Command");
        match command {
            ChatCommand::Query(query) => self.query(room_id, query, event.sender_name),
            ChatCommand::Invalid => Dispatch::Dropped(DropReason::InvalidCommand),
            admin => self.administer(room_id, admin),
        }
    }

    fn query(&self, room_id: RoomId, query: String, sender_name: String) -> Dispatch {
        match self.session.try_begin_streaming() {
            Some(guard) => {
                Dispatch::Responding(self.streamer.spawn(guard, room_id, query, sender_name))
            }
            None => {
                tracing::debug!(room = %room_id, sender = %sender_name, "Busy, dropping query");
                Dispatch::Dropped(DropReason::Busy)
            }
        }
    }

    fn administer(&self, room_id: RoomId, command: ChatCommand) -> Dispatch {
        let reply = {
            let mut conversation = self.session.conversation();
            match command {
                ChatCommand::Help => Some(self.parser.help_text(conversation.max_history())),
                ChatCommand::Clear => {
                    conversation.clear();
                    Some("History cleared.".to_string())
                }
                ChatCommand::ShowHistory => Some(format!(
                    "History is {} of {}.",
                    conversation.history_window(),
                    conversation.max_history()
                )),
                ChatCommand::SetHistory(HistoryWindow::Default) => {
                    conversation.reset_history_window();
                    Some(format!("History set to {}.", conversation.history_window()))
                }
                ChatCommand::SetHistory(HistoryWindow::Size(size)) => conversation
                    .set_history_window(size)
                    .then(|| format!("History set to {}.", size)),
                ChatCommand::ShowSystem => {
                    Some(format!("System prompt: {}", conversation.system_prompt()))
                }
                ChatCommand::SetSystem(SystemPrompt::Default) => {
                    conversation.reset_system_prompt();
                    Some("System prompt reset to default.".to_string())
                }
                ChatCommand::SetSystem(SystemPrompt::Text(text)) => conversation
                    .set_system_prompt(text)
                    .then(|| "System prompt updated.".to_string()),
                ChatCommand::Query(_) | ChatCommand::Invalid => None,
            }
        };

        match reply {
            Some(reply) => {
                self.sender.send(OutboundEvent::message(room_id, reply));
                Dispatch::Handled
            }
            None => Dispatch::Dropped(DropReason::InvalidCommand),
        }
    }
}
