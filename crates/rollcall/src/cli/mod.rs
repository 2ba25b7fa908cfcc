//! Command-line interface for the `rollcall` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    CategoryArg, CheckInCommand, ConfigCommand, DecodeCommand, EventCommand, IdentityArgs,
    RecordsCommand, ScanCommand,
};

/// rollcall - Live event check-in
///
/// Check people into events from a QR handshake and watch the attendance
/// ledger update as check-ins arrive.
#[derive(Debug, Parser)]
#[command(name = "rollcall")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Decode an event QR payload
    Decode(DecodeCommand),

    /// Read QR payloads from stdin until an event is found, then check in
    Scan(ScanCommand),

    /// Submit a check-in
    #[command(name = "checkin")]
    CheckIn(CheckInCommand),

    /// List members
    Members,

    /// Show ledger statistics and records, newest first
    Records(RecordsCommand),

    /// Follow the ledger live until interrupted
    Watch,

    /// Issue an event and print its QR payload
    Event(EventCommand),

    /// Print the CSV export URL
    ExportUrl,

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;
    use clap::CommandFactory;

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "rollcall");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        let cli = Cli::try_parse_from(["rollcall", "-vv", "members"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Trace);

        let cli = Cli::try_parse_from(["rollcall", "-q", "members"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Quiet);

        let cli = Cli::try_parse_from(["rollcall", "members"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Normal);
    }

    #[test]
    fn test_parse_decode() {
        let cli = Cli::try_parse_from(["rollcall", "decode", r#"{"eventName":"G"}"#]).unwrap();
        let Command::Decode(cmd) = cli.command else {
            panic!("expected decode");
        };
        assert_eq!(cmd.payload, r#"{"eventName":"G"}"#);
    }

    #[test]
    fn test_parse_checkin() {
        let cli = Cli::try_parse_from([
            "rollcall",
            "checkin",
            "--name",
            "Alice Smith",
            "--category",
            "guest",
            "--event",
            "{}",
        ])
        .unwrap();
        let Command::CheckIn(cmd) = cli.command else {
            panic!("expected checkin");
        };
        assert_eq!(cmd.who.name, "Alice Smith");
        assert_eq!(cmd.who.category, CategoryArg::Guest);
        assert_eq!(cmd.event.as_deref(), Some("{}"));
    }

    #[test]
    fn test_category_defaults_to_member() {
        let cli = Cli::try_parse_from(["rollcall", "scan", "-n", "Bob"]).unwrap();
        let Command::Scan(cmd) = cli.command else {
            panic!("expected scan");
        };
        assert_eq!(cmd.who.category, CategoryArg::Member);
    }

    #[test]
    fn test_unknown_category_is_rejected() {
        let result = Cli::try_parse_from(["rollcall", "checkin", "-n", "Bob", "-t", "vip"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_event() {
        let cli =
            Cli::try_parse_from(["rollcall", "event", "--name", "Gala", "--date", "2024-05-01"])
                .unwrap();
        let Command::Event(cmd) = cli.command else {
            panic!("expected event");
        };
        assert_eq!(cmd.name, "Gala");
        assert_eq!(cmd.date.as_deref(), Some("2024-05-01"));
    }

    #[test]
    fn test_parse_simple_commands() {
        let cli = Cli::try_parse_from(["rollcall", "watch"]).unwrap();
        assert!(matches!(cli.command, Command::Watch));

        let cli = Cli::try_parse_from(["rollcall", "export-url"]).unwrap();
        assert!(matches!(cli.command, Command::ExportUrl));

        let cli = Cli::try_parse_from(["rollcall", "records", "--json"]).unwrap();
        assert!(matches!(cli.command, Command::Records(RecordsCommand { json: true })));
    }

    #[test]
    fn test_parse_with_config() {
        let cli =
            Cli::try_parse_from(["rollcall", "-c", "/custom/config.toml", "config", "path"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Path)));
    }
}
