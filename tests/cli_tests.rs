// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use clap::Parser;
use std::path::PathBuf;
use woody::cli::Cli;

#[test]
fn test_parse_no_arguments() {
    let cli = Cli::try_parse_from(["woody"]).expect("Valid command parsing");
    assert!(cli.config.is_none());
    assert_eq!(cli.verbose, 0);
}

#[test]
fn test_parse_config_and_verbose() {
    let cli = Cli::try_parse_from(["woody", "--config", "bot.json", "-vv"])
        .expect("Valid command parsing");
    assert_eq!(cli.config, Some(PathBuf::from("bot.json")));
    assert_eq!(cli.verbose, 2);
}

#[test]
fn test_parse_long_verbose() {
    let cli = Cli::try_parse_from(["woody", "--verbose"]).expect("Valid command parsing");
    assert_eq!(cli.verbose, 1);
}

#[test]
fn test_subcommands_are_rejected() {
    assert!(Cli::try_parse_from(["woody", "chat"]).is_err());
}
