//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::record::{Category, Identity};

/// Who is checking in.
#[derive(Debug, Args)]
pub struct IdentityArgs {
    /// Name as it should appear in the ledger
    #[arg(short, long)]
    pub name: String,

    /// Guest or member
    #[arg(short = 't', long = "category", value_enum, default_value = "member")]
    pub category: CategoryArg,
}

impl IdentityArgs {
    /// The identity these flags describe.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity::new(self.name.clone(), self.category.into())
    }
}

/// `decode` arguments.
#[derive(Debug, Args)]
pub struct DecodeCommand {
    /// Raw QR payload text
    pub payload: String,
}

/// `scan` arguments.
#[derive(Debug, Args)]
pub struct ScanCommand {
    /// Who is checking in
    #[command(flatten)]
    pub who: IdentityArgs,
}

/// `checkin` arguments.
#[derive(Debug, Args)]
pub struct CheckInCommand {
    /// Who is checking in
    #[command(flatten)]
    pub who: IdentityArgs,

    /// QR payload of the event being checked into
    #[arg(short, long, value_name = "PAYLOAD")]
    pub event: Option<String>,
}

/// `records` arguments.
#[derive(Debug, Args)]
pub struct RecordsCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// `event` arguments.
#[derive(Debug, Args)]
pub struct EventCommand {
    /// Event name
    #[arg(short, long)]
    pub name: String,

    /// Event date (defaults to today, YYYY-MM-DD)
    #[arg(short, long)]
    pub date: Option<String>,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Category argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CategoryArg {
    /// Not on the member list
    Guest,
    /// On the member list
    Member,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Guest => Self::Guest,
            CategoryArg::Member => Self::Member,
        }
    }
}
