// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use tempfile::TempDir;
use woody::config::Settings;
use woody::error::WoodyError;

#[test]
fn test_settings_default_values() {
    let settings = Settings::default();

    assert_eq!(settings.chat.prefix, ",");
    assert_eq!(settings.chat.triggers, ["ai", "woody", "woody:", "@woody"]);
    assert_eq!(settings.conversation.max_input_chars, 200);
    assert_eq!(settings.conversation.max_history, 100);
    assert_eq!(settings.conversation.default_history_window, 0);
    assert_eq!(settings.inference.max_tokens, 360);
    assert_eq!(settings.inference.stop, ["<|im_end|>", "</s>"]);
    assert_eq!(settings.inference.seed, Some(326));
    assert_eq!(settings.streaming.update_interval_ms, 100);
    assert_eq!(settings.streaming.placeholder, "Thinking...");
    assert_eq!(settings.resilience.reconnect_delay_secs, 3);
}

#[test]
fn test_settings_default_system_prompt() {
    let settings = Settings::default();
    assert_eq!(
        settings.conversation.default_system_prompt,
        "Your name is woody and you respond to questions. Respond in 280 characters or less."
    );
}

#[test]
fn test_partial_file_keeps_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"chat": {"prefix": "!"}, "conversation": {"max_history": 10}}"#,
    )
    .unwrap();

    let settings = Settings::load_from(&path).unwrap();
    assert_eq!(settings.chat.prefix, "!");
    assert_eq!(settings.chat.triggers.len(), 4);
    assert_eq!(settings.conversation.max_history, 10);
    assert_eq!(settings.inference.max_tokens, 360);
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"conversation": {"max_history": 5, "default_history_window": 6}}"#,
    )
    .unwrap();

    let err = Settings::load_from(&path).unwrap_err();
    assert!(matches!(err, WoodyError::Config(_)));
    assert!(err.is_fatal());
}

#[test]
fn test_written_settings_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");

    let mut settings = Settings::default();
    settings.account.name = Some("woody".to_string());
    settings.chat.triggers = vec!["bot".to_string()];
    std::fs::write(&path, serde_json::to_string(&settings).unwrap()).unwrap();

    let loaded = Settings::load_from(&path).unwrap();
    assert_eq!(loaded.account.name.as_deref(), Some("woody"));
    assert_eq!(loaded.chat.triggers, ["bot"]);
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let settings = Settings::load_from(&dir.path().join("absent.json")).unwrap();
    assert_eq!(settings.conversation.max_history, 100);
}
