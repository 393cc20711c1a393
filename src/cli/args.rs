// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! CLI argument definitions using Clap
//!
//! Behaviour is configured through the settings file and environment; the
//! command line only picks the file and the log level.

use clap::Parser;
use std::path::PathBuf;

/// Woody - chat room bot backed by a local language model
#[derive(Parser, Debug)]
#[command(name = "woody")]
#[command(version, about = "Chat room bot backed by a local language model")]
pub struct Cli {
    /// Settings file path (defaults to ~/.woody/settings.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Log filter directives for the chosen verbosity
    pub fn log_directives(&self) -> &'static [&'static str] {
        match self.verbose {
            0 => &["woody=info"],
            1 => &["woody=debug"],
            _ => &["woody=trace", "tokio_tungstenite=debug"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["woody"]);
        assert!(cli.config.is_none());
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.log_directives(), ["woody=info"]);
    }

    #[test]
    fn test_cli_verbose_single() {
        let cli = Cli::parse_from(["woody", "-v"]);
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.log_directives(), ["woody=debug"]);
    }

    #[test]
    fn test_cli_verbose_multiple() {
        let cli = Cli::parse_from(["woody", "-vvv"]);
        assert_eq!(cli.verbose, 3);
        assert!(cli.log_directives().contains(&"woody=trace"));
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::parse_from(["woody", "--config", "/etc/woody.json"]);
        assert_eq!(cli.config, Some(PathBuf::from("/etc/woody.json")));
    }

    #[test]
    fn test_cli_rejects_unknown_flag() {
        assert!(Cli::try_parse_from(["woody", "--model", "x"]).is_err());
    }
}
