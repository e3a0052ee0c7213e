//! CLI struct definitions for the pricescout command-line interface.
//!
//! All clap-derived types live here. Dispatch lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::core::logging::{LogFormat, LogLevel};

#[derive(Parser, Debug)]
#[clap(
    name = "pricescout",
    version = env!("CARGO_PKG_VERSION"),
    about = "Collect product prices from configured stores and publish them as a JSON snapshot to a git repository."
)]
pub(crate) struct Cli {
    /// TOML configuration file (pacing, timeouts, commit identity, publish target).
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log verbosity; RUST_LOG takes precedence when set.
    #[clap(long, value_enum, global = true, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,
    /// Log line format (written to stderr).
    #[clap(long, value_enum, global = true, default_value_t = LogFormat::Plaintext)]
    pub log_format: LogFormat,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Collect prices and publish the snapshot; prints the file URL on success
    Run(RunCli),
    /// Collect prices and print them as JSON without publishing
    Collect(InputCli),
}

#[derive(clap::Args, Debug, Clone)]
pub(crate) struct InputCli {
    /// JSON describing the location being priced (informational).
    #[clap(long, alias = "location_json", default_value = "{}")]
    pub location_json: String,
    /// JSON array of stores: [{"name", "endpoint", "strategy_id"}, ...].
    #[clap(long, alias = "stores_config_json")]
    pub stores_json: String,
    /// JSON array of product names to search for.
    #[clap(long, alias = "products_json")]
    pub products_json: String,
}

#[derive(clap::Args, Debug, Clone)]
pub(crate) struct RunCli {
    #[clap(flatten)]
    pub input: InputCli,
    /// HTTPS URL of the repository receiving snapshots.
    #[clap(long, alias = "github_repo_url")]
    pub repo_url: String,
    /// Access token for the push; falls back to GITHUB_PAT_ENV, then GH_PAT.
    #[clap(long, alias = "github_pat")]
    pub token: Option<String>,
    /// Branch to commit to (created when missing).
    #[clap(long, alias = "github_branch")]
    pub branch: Option<String>,
    /// Directory inside the repository for snapshot files.
    #[clap(long, alias = "github_file_path_prefix")]
    pub path_prefix: Option<String>,
    /// Commit author name.
    #[clap(long, alias = "git_user_name")]
    pub git_user_name: Option<String>,
    /// Commit author email.
    #[clap(long, alias = "git_user_email")]
    pub git_user_email: Option<String>,
    /// Parent directory for temporary clones.
    #[clap(long)]
    pub workspace_root: Option<PathBuf>,
}
