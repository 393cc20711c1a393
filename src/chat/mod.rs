// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat room participation
//!
//! Login, the websocket connection and its reconnect loop, command
//! dispatch, conversation state and streamed model responses.

pub mod auth;
pub mod bot;
pub mod commands;
pub mod connection;
pub mod conversation;
pub mod dispatcher;
pub mod protocol;
pub mod session;
pub mod streaming;

pub use bot::{join_outcome, run_bot, Bot};
pub use commands::{ChatCommand, CommandParser};
pub use connection::{ChatSender, Supervisor};
pub use conversation::ConversationState;
pub use dispatcher::{Dispatch, Dispatcher, DropReason};
pub use protocol::{ChatEvent, OutboundEvent, RoomId};
pub use session::{Session, StreamingGuard};
pub use streaming::{ResponseBuffer, ResponseStreamer};
