// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation state
//!
//! Rolling history of user/assistant turns plus the mutable system prompt and
//! history window. The turn list never grows past `max_history`; the oldest
//! turn is evicted first.

use std::collections::VecDeque;

use crate::config::ConversationConfig;
use crate::llm::message::Turn;

/// Process-wide conversation state
#[derive(Debug, Clone)]
pub struct ConversationState {
    system_prompt: String,
    default_system_prompt: String,
    history_window: usize,
    default_history_window: usize,
    max_history: usize,
    max_input_chars: usize,
    turns: VecDeque<Turn>,
}

impl ConversationState {
    pub fn new(config: &ConversationConfig) -> Self {
        let max_history = config.max_history;
        Self {
            system_prompt: config.default_system_prompt.clone(),
            default_system_prompt: config.default_system_prompt.clone(),
            history_window: config.default_history_window.min(max_history),
            default_history_window: config.default_history_window.min(max_history),
            max_history,
            max_input_chars: config.max_input_chars,
            turns: VecDeque::with_capacity(max_history),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Replace the system prompt. Blank prompts are refused.
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) -> bool {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return false;
        }
        self.system_prompt = prompt;
        true
    }

    pub fn reset_system_prompt(&mut self) {
        self.system_prompt = self.default_system_prompt.clone();
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Set the history window. Values above `max_history` are refused.
    pub fn set_history_window(&mut self, window: usize) -> bool {
        if window > self.max_history {
            return false;
        }
        self.history_window = window;
        true
    }

    pub fn reset_history_window(&mut self) {
        self.history_window = self.default_history_window;
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Append a turn, evicting from the front past `max_history`.
    pub fn push(&mut self, turn: Turn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_history {
            self.turns.pop_front();
        }
    }

    /// Build the prompt for `query` and record the user turn.
    ///
    /// The prompt is the system turn, the last `history_window` turns, then
    /// the query cut to `max_input_chars` characters. The user turn is
    /// appended to the history before any response exists.
    pub fn begin_query(&mut self, query: &str) -> Vec<Turn> {
        let user_turn = Turn::user(truncate_chars(query, self.max_input_chars));

        let window = self.history_window.min(self.turns.len());
        let mut prompt = Vec::with_capacity(window + 2);
        prompt.push(Turn::system(self.system_prompt.clone()));
        prompt.extend(self.turns.iter().skip(self.turns.len() - window).cloned());
        prompt.push(user_turn.clone());

        self.push(user_turn);
        prompt
    }
}

/// Cut `text` to at most `max` characters (not bytes).
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn state(max_history: usize, window: usize) -> ConversationState {
        ConversationState::new(&ConversationConfig {
            max_history,
            default_history_window: window,
            ..Default::default()
        })
    }

    #[test]
    fn test_new_uses_defaults() {
        let state = ConversationState::new(&ConversationConfig::default());
        assert_eq!(state.history_window(), 0);
        assert_eq!(state.max_history(), 100);
        assert!(state.system_prompt().starts_with("Your name is woody"));
        assert!(state.is_empty());
    }

    #[test]
    fn test_prompt_includes_window_of_recent_turns() {
        let mut state = state(100, 2);
        state.push(Turn::user("A"));
        state.push(Turn::assistant("B"));
        state.push(Turn::user("C"));

        let prompt = state.begin_query("new");
        let contents: Vec<&str> = prompt.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(prompt[0], Turn::system(state.system_prompt()));
        assert_eq!(contents[1..], ["B", "C", "new"]);
        // user turn recorded immediately
        assert_eq!(state.len(), 4);
        assert_eq!(state.turns().last(), Some(&Turn::user("new")));
    }

    #[test]
    fn test_prompt_with_zero_window_has_no_history() {
        let mut state = state(100, 0);
        state.push(Turn::user("old"));
        let prompt = state.begin_query("what time is it");
        assert_eq!(prompt.len(), 2);
        assert_eq!(prompt[1], Turn::user("what time is it"));
    }

    #[test]
    fn test_window_larger_than_history() {
        let mut state = state(100, 10);
        state.push(Turn::user("only"));
        let prompt = state.begin_query("q");
        assert_eq!(prompt.len(), 3);
    }

    #[test]
    fn test_query_truncated_to_max_input_chars() {
        let mut state = state(100, 0);
        let long = "é".repeat(250);
        let prompt = state.begin_query(&long);
        assert_eq!(prompt[1].content.chars().count(), 200);
    }

    #[test]
    fn test_eviction_is_fifo() {
        let mut state = state(3, 0);
        for i in 0..4 {
            state.push(Turn::user(i.to_string()));
        }
        let contents: Vec<&str> = state.turns().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, ["1", "2", "3"]);
    }

    #[test]
    fn test_history_window_bounds() {
        let mut state = state(100, 0);
        assert!(state.set_history_window(100));
        assert_eq!(state.history_window(), 100);
        assert!(!state.set_history_window(101));
        assert_eq!(state.history_window(), 100);
        state.reset_history_window();
        assert_eq!(state.history_window(), 0);
    }

    #[test]
    fn test_system_prompt_updates() {
        let mut state = state(100, 0);
        assert!(!state.set_system_prompt("   "));
        assert!(state.set_system_prompt("You are a pirate."));
        assert_eq!(state.system_prompt(), "You are a pirate.");
        state.reset_system_prompt();
        assert!(state.system_prompt().starts_with("Your name is woody"));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("hi", 3), "hi");
        assert_eq!(truncate_chars("", 3), "");
    }

    proptest! {
        #[test]
        fn prop_turns_never_exceed_max_history(max in 1usize..20, pushes in 0usize..60) {
            let mut state = state(max, 0);
            for i in 0..pushes {
                state.push(Turn::user(i.to_string()));
                prop_assert!(state.len() <= max);
            }
            if pushes > max {
                let first = state.turns().next().unwrap().content.clone();
                prop_assert_eq!(first, (pushes - max).to_string());
            }
        }

        #[test]
        fn prop_max_history_plus_one_drops_oldest(max in 1usize..50) {
            let mut state = state(max, 0);
            for i in 0..=max {
                state.push(Turn::user(i.to_string()));
            }
            prop_assert_eq!(state.len(), max);
            prop_assert_eq!(&state.turns().next().unwrap().content, "1");
        }
    }
}
