use clap::{Parser, Subcommand};

use crate::config::Backend;

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "keystash",
    about = "Read, write, and delete named secrets through a pluggable store",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Storage backend; overrides config and KEYSTASH_BACKEND.
    #[arg(long, global = true, value_enum)]
    pub backend: Option<Backend>,
    /// Namespace prefix for remote secret identifiers (e.g. app/prod).
    #[arg(long, global = true)]
    pub prefix: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print a secret's payload. Missing secrets print nothing.
    Get {
        name: String,
        /// Print the payload base64-encoded instead of as text.
        #[arg(long)]
        base64: bool,
    },
    /// Create or overwrite a secret. With the memory backend the value is gone
    /// once the command exits; use `--backend aws` to persist.
    Put {
        name: String,
        value: String,
        /// Treat VALUE as base64 and store the decoded bytes.
        #[arg(long)]
        base64: bool,
    },
    /// Delete a secret (succeeds if it does not exist).
    Delete { name: String },
    /// Write, read back, and delete a probe secret.
    Health,
    /// Print version and exit.
    Version,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}
