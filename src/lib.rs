//! pricescout: periodic price collection with versioned publication.
//!
//! A run has two sequential stages:
//!
//! 1. **Collection** ([`core::collect::Collector`]): every configured store is
//!    dispatched to the scrape strategy registered for its type
//!    ([`registry::StrategyRegistry`], [`plugins`]). Stores are scraped one at a
//!    time with respectful pauses; one store failing never aborts the run.
//! 2. **Publication** ([`core::publish::Publisher`]): the aggregated
//!    observations become a [`core::snapshot::Snapshot`], written as
//!    `<prefix>/pricing_data_<stamp>.json` into a throwaway clone
//!    ([`core::workspace`]) and pushed. A non-fast-forward rejection is
//!    retried once after a rebase; identical content is a successful no-op.
//!
//! # Exit contract
//!
//! `pricescout run` prints the public file URL and exits 0, or prints
//! [`FAILURE_SENTINEL`] and exits 1. Missing credentials and malformed input
//! exit 1 before any network activity.
//!
//! # Crate Structure
//!
//! - [`core`]: records, boundaries (HTTP, HTML, git), orchestration, publishing
//! - [`plugins`]: per-store scrape strategies
//! - [`registry`]: strategy lookup by store-type identifier

pub mod core;
pub mod plugins;
pub mod registry;

mod cli;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use cli::{Cli, Command, InputCli, RunCli};
use core::collect::Collector;
use core::config::{self, Config};
use core::error::{Result, ScoutError};
use core::http::UreqFetcher;
use core::model::{CollectionInput, PriceObservation};
use core::pacing::ThreadSleeper;
use core::publish::{PublishTarget, Publisher};
use core::remote::RemoteRepo;
use core::snapshot::Snapshot;
use core::vcs::GitCli;
use core::workspace::WorkspaceManager;
use registry::StrategyRegistry;

/// Printed on stdout when a run does not publish anything.
pub const FAILURE_SENTINEL: &str = "SCRAPING_TASK_FAILED_GITHUB";

/// Entry point for the `pricescout` binary.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = core::logging::init(cli.log_level, cli.log_format) {
        eprintln!("failed to initialize logging: {e}");
    }

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Command::Run(args) => run_and_publish(config, args),
        Command::Collect(args) => collect_only(&config, &args),
    }
}

fn run_and_publish(config: Config, args: RunCli) -> ExitCode {
    let prepared = match prepare(config, &args) {
        Ok(prepared) => prepared,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match execute(prepared) {
        Some(url) => {
            println!("{url}");
            ExitCode::SUCCESS
        }
        None => {
            println!("{FAILURE_SENTINEL}");
            ExitCode::FAILURE
        }
    }
}

/// Everything a run needs, validated before any network activity.
struct PreparedRun {
    config: Config,
    input: CollectionInput,
    target: PublishTarget,
    token: core::remote::Secret,
}

fn prepare(mut config: Config, args: &RunCli) -> Result<PreparedRun> {
    if let Some(branch) = &args.branch {
        config.publish.branch = branch.clone();
    }
    if let Some(prefix) = &args.path_prefix {
        config.publish.path_prefix = prefix.clone();
    }
    if let Some(name) = &args.git_user_name {
        config.git.user_name = name.clone();
    }
    if let Some(email) = &args.git_user_email {
        config.git.user_email = email.clone();
    }
    if let Some(root) = &args.workspace_root {
        config.git.workspace_root = Some(root.clone());
    }

    let token = config::resolve_token(args.token.as_deref(), |var| std::env::var(var).ok())?;
    let input = parse_input(&args.input)?;

    let remote = RemoteRepo::parse(&args.repo_url)?;
    if !remote.is_https() {
        return Err(ScoutError::ValidationError(
            "repository URL must start with https://".to_string(),
        ));
    }
    core::snapshot::validate_prefix(&config.publish.path_prefix)?;
    if config.publish.branch.trim().is_empty() {
        return Err(ScoutError::ValidationError("branch must not be empty".to_string()));
    }

    let target = PublishTarget {
        remote,
        branch: config.publish.branch.clone(),
        path_prefix: config.publish.path_prefix.clone(),
    };
    Ok(PreparedRun {
        config,
        input,
        target,
        token,
    })
}

fn execute(run: PreparedRun) -> Option<String> {
    let observations = collect(&run.config, &run.input);
    if observations.is_empty() {
        error!("no pricing data scraped; nothing to publish");
        return None;
    }

    let snapshot = Snapshot::now(observations);
    let git = GitCli::new(run.config.git_timeout()).with_secret(run.token.clone());
    let workspaces = WorkspaceManager::new(&git, run.config.workspace_root(), run.config.identity());
    let publisher = Publisher::new(&git, workspaces, run.target, Some(run.token));

    match publisher.publish(snapshot) {
        Ok(report) => Some(report.url),
        Err(failure) => {
            error!(state = %failure.state, "failed to publish pricing data");
            None
        }
    }
}

fn collect_only(config: &Config, args: &InputCli) -> ExitCode {
    let input = match parse_input(args) {
        Ok(input) => input,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let observations = collect(config, &input);
    match Snapshot::now(observations).to_canonical_json() {
        Ok(bytes) => {
            println!("{}", String::from_utf8_lossy(&bytes));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn parse_input(args: &InputCli) -> Result<CollectionInput> {
    CollectionInput::from_json(&args.location_json, &args.stores_json, &args.products_json)
}

fn collect(config: &Config, input: &CollectionInput) -> Vec<PriceObservation> {
    info!(
        location = %input.location,
        stores = input.stores.len(),
        products = ?input.products,
        "starting collection"
    );
    let registry = StrategyRegistry::with_builtins();
    let fetcher = UreqFetcher::new(&config.http.user_agent, config.http_timeout());
    let sleeper = ThreadSleeper;
    Collector::new(&registry, &fetcher, &sleeper, config.pacing()).run(&input.stores, &input.products)
}
