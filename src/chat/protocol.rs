// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat wire protocol
//!
//! Inbound frames look like
//! `{"type": "message", "data": {"name": "...", "text": "..."}, "roomId": 1}`.
//! Outbound events carry a plain string in `data`:
//! `{"type": "messageChange", "data": "partial text", "roomId": 1}`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, WoodyError};

/// Chat room identifier, echoed back in whatever JSON form the server used
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoomId {
    Number(i64),
    Text(String),
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomId::Number(n) => write!(f, "{}", n),
            RoomId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RoomId {
    fn from(id: i64) -> Self {
        RoomId::Number(id)
    }
}

impl From<&str> for RoomId {
    fn from(id: &str) -> Self {
        RoomId::Text(id.to_string())
    }
}

/// Kind of an inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A complete chat message
    Message,
    /// End of another participant's streamed message
    MessageEnd,
    /// Anything else (presence, typing, ...)
    Other,
}

impl EventKind {
    fn from_wire(kind: &str) -> Self {
        match kind {
            "message" => EventKind::Message,
            "messageEnd" => EventKind::MessageEnd,
            _ => EventKind::Other,
        }
    }
}

/// A parsed inbound chat frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEvent {
    pub kind: EventKind,
    pub room_id: Option<RoomId>,
    pub sender_name: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(rename = "roomId", default)]
    room_id: Option<RoomId>,
}

#[derive(Debug, Deserialize)]
struct RawMessageData {
    name: String,
    text: String,
}

impl ChatEvent {
    /// Parse one inbound frame.
    ///
    /// `message` frames must carry `data.name`, `data.text` and `roomId`;
    /// other kinds are accepted with whatever fields they have.
    pub fn parse(frame: &str) -> Result<Self> {
        let raw: RawFrame = serde_json::from_str(frame)?;
        let kind = EventKind::from_wire(&raw.kind);

        if kind != EventKind::Message {
            return Ok(Self {
                kind,
                room_id: raw.room_id,
                sender_name: String::new(),
                text: String::new(),
            });
        }

        let data = raw
            .data
            .ok_or_else(|| WoodyError::InvalidInput("message frame without data".to_string()))?;
        let data: RawMessageData = serde_json::from_value(data)?;
        let room_id = raw
            .room_id
            .ok_or_else(|| WoodyError::InvalidInput("message frame without roomId".to_string()))?;

        Ok(Self {
            kind,
            room_id: Some(room_id),
            sender_name: data.name,
            text: data.text,
        })
    }
}

/// Kind of an outbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OutboundKind {
    /// Standalone chat message
    Message,
    /// Opens a streamed message block
    MessageStart,
    /// Replaces the text of the open block
    MessageChange,
    /// Closes the open block with its final text
    MessageEnd,
}

/// An event sent to the chat server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEvent {
    #[serde(rename = "type")]
    pub kind: OutboundKind,
    pub data: String,
    #[serde(rename = "roomId")]
    pub room_id: RoomId,
}

impl OutboundEvent {
    pub fn new(kind: OutboundKind, room_id: RoomId, data: impl Into<String>) -> Self {
        Self {
            kind,
            data: data.into(),
            room_id,
        }
    }

    pub fn message(room_id: RoomId, text: impl Into<String>) -> Self {
        Self::new(OutboundKind::Message, room_id, text)
    }

    pub fn start(room_id: RoomId, text: impl Into<String>) -> Self {
        Self::new(OutboundKind::MessageStart, room_id, text)
    }

    pub fn change(room_id: RoomId, text: impl Into<String>) -> Self {
        Self::new(OutboundKind::MessageChange, room_id, text)
    }

    pub fn end(room_id: RoomId, text: impl Into<String>) -> Self {
        Self::new(OutboundKind::MessageEnd, room_id, text)
    }

    /// Serialize to the JSON text sent over the socket
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
