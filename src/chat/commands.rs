// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Command parsing for chat messages
//!
//! A message addresses the bot when, after stripping the prefix characters,
//! its first word is one of the configured triggers. The rest of the message
//! is either an administrative command or a question for the model.

use crate::config::ChatConfig;

/// New value for the history window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    Default,
    Size(usize),
}

/// New value for the system prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemPrompt {
    Default,
    Text(String),
}

/// What a message addressed to the bot asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// List the sub-commands
    Help,
    /// Forget the conversation history
    Clear,
    /// Report the history window
    ShowHistory,
    /// Change the history window
    SetHistory(HistoryWindow),
    /// Report the system prompt
    ShowSystem,
    /// Change the system prompt
    SetSystem(SystemPrompt),
    /// Ask the model
    Query(String),
    /// Malformed command, ignored without reply
    Invalid,
}

/// Splits chat text into trigger, command and argument
#[derive(Debug, Clone)]
pub struct CommandParser {
    prefix: String,
    triggers: Vec<String>,
}

impl CommandParser {
    pub fn new<S: Into<String>>(prefix: impl Into<String>, triggers: impl IntoIterator<Item = S>) -> Self {
        Self {
            prefix: prefix.into(),
            triggers: triggers
                .into_iter()
                .map(Into::into)
                .filter(|t: &String| !t.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &ChatConfig) -> Self {
        Self::new(config.prefix.clone(), config.triggers.iter().cloned())
    }

    pub fn is_trigger(&self, word: &str) -> bool {
        self.triggers.iter().any(|t| t == word)
    }

    /// Parse a chat message. `None` means the message is ordinary chat traffic.
    pub fn parse(&self, text: &str) -> Option<ChatCommand> {
        let text = text.trim();
        let text = if self.prefix.is_empty() {
            text
        } else {
            text.trim_start_matches(self.prefix.as_str())
        };

        let (command, argument) = match text.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (text, ""),
        };

        if !self.is_trigger(command) {
            return None;
        }

        Some(classify(argument))
    }

    /// Help text listing the sub-commands
    pub fn help_text(&self, max_history: usize) -> String {
        let trigger = self
            .triggers
            .first()
            .map(|t| format!("{}{}", self.prefix, t))
            .unwrap_or_default();
        format!(
            "{t} <question> | {t} help | {t} clear | {t} history | {t} history = <0-{max}|default> | {t} system | {t} system = <text|default>",
            t = trigger,
            max = max_history
        )
    }
}

/// Classify the argument that follows a trigger word.
pub fn classify(argument: &str) -> ChatCommand {
    match argument {
        "" => return ChatCommand::Invalid,
        "help" => return ChatCommand::Help,
        "clear" => return ChatCommand::Clear,
        "history" => return ChatCommand::ShowHistory,
        "system" => return ChatCommand::ShowSystem,
        _ => {}
    }

    if let Some(value) = assignment(argument, "history") {
        return match value {
            "default" => ChatCommand::SetHistory(HistoryWindow::Default),
            _ => match value.parse::<usize>() {
                Ok(size) => ChatCommand::SetHistory(HistoryWindow::Size(size)),
                Err(_) => ChatCommand::Invalid,
            },
        };
    }

    if let Some(value) = assignment(argument, "system") {
        return match value {
            "" => ChatCommand::Invalid,
            "default" => ChatCommand::SetSystem(SystemPrompt::Default),
            text => ChatCommand::SetSystem(SystemPrompt::Text(text.to_string())),
        };
    }

    ChatCommand::Query(argument.to_string())
}

/// Match `<key> = <value>` (spaces optional) and return the trimmed value.
fn assignment<'a>(argument: &'a str, key: &str) -> Option<&'a str> {
    argument
        .strip_prefix(key)?
        .trim_start()
        .strip_prefix('=')
        .map(str::trim)
}
