//! Command-line interface for opensea-dl.
//!
//! Provides commands for downloading a whole collection, downloading what
//! an owner holds, and inspecting how files are named and configured.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Client;

use crate::adapters::OpenSeaClient;
use crate::config::{self, ResolvedConfig};
use crate::core::{
    addressed_name, ConcurrencyLimiter, Coordinator, PageFetcher, ResolvedTarget, TargetResolver,
};
use crate::domain::RunReport;

/// opensea-dl - download every image of an OpenSea collection
#[derive(Parser, Debug)]
#[command(name = "opensea-dl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Download root (overrides the config file)
    #[arg(short, long, global = true, env = "OPENSEA_DL_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Pages fetched at once
    #[arg(short, long, global = true, env = "OPENSEA_DL_WORKERS")]
    pub workers: Option<usize>,

    /// Print the run report as JSON
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download every asset of a collection
    Collection {
        /// Collection name or slug (spaces are removed, case is ignored)
        #[arg(required = true, num_args = 1..)]
        name: Vec<String>,
    },

    /// Download the assets an owner holds, one directory per collection
    Owner {
        /// Owner wallet address
        wallet: String,
    },

    /// Print the filename an asset URL is saved under
    Address {
        /// Asset source URL
        url: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let config = self.resolved_config()?;

        match self.command {
            Commands::Collection { ref name } => {
                let name = name.join(" ");
                let resolver = build_resolver(&config)?;
                let target = resolver.resolve_collection(&name).await?;
                let report = run_target(&config, target).await?;
                print_report(&report, self.json, "collection")
            }
            Commands::Owner { ref wallet } => {
                let resolver = build_resolver(&config)?;
                let target = resolver.resolve_owner(wallet).await?;
                let report = run_target(&config, target).await?;
                print_report(&report, self.json, "collections of")
            }
            Commands::Address { ref url } => {
                println!("{}", addressed_name(url));
                Ok(())
            }
            Commands::Config => {
                show_config(&config);
                Ok(())
            }
        }
    }

    /// Global config with this invocation's flags applied
    fn resolved_config(&self) -> Result<ResolvedConfig> {
        let mut config = config::config()?.clone();

        if let Some(ref output) = self.output {
            config.output = output.clone();
        }
        if let Some(workers) = self.workers {
            config.fetch.workers = workers;
        }

        config.fetch.validate()?;
        Ok(config)
    }
}

/// Shared HTTP client with the configured deadline on every call
fn build_http_client(config: &ResolvedConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.fetch.request_timeout())
        .user_agent(concat!("opensea-dl/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

fn build_resolver(config: &ResolvedConfig) -> Result<TargetResolver> {
    let catalog = OpenSeaClient::new(&config.api_base, build_http_client(config)?)?;
    Ok(TargetResolver::new(Arc::new(catalog), config.output.clone())
        .with_page_size(config.fetch.page_size))
}

/// Fetch and persist every page of a resolved target
async fn run_target(config: &ResolvedConfig, target: ResolvedTarget) -> Result<RunReport> {
    if target.tasks.is_empty() {
        eprintln!("Nothing to download for {}", target.label);
    }

    let fetcher = PageFetcher::new(build_http_client(config)?)
        .with_max_retry_after(config.fetch.max_retry_after());
    let coordinator = Coordinator::new(fetcher, ConcurrencyLimiter::new(config.fetch.workers));

    Ok(coordinator.run(&target.label, target.tasks).await)
}

fn print_report(report: &RunReport, json: bool, kind: &str) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(report).context("Failed to serialize run report")?
        );
        return Ok(());
    }

    println!(
        "{:.2?} taken to download {} {}",
        report.elapsed, kind, report.target
    );
    println!(
        "Pages: {} ok, {} empty, {} failed (of {})",
        report.tasks_succeeded - report.empty_pages,
        report.empty_pages,
        report.tasks_failed(),
        report.tasks_total
    );
    println!(
        "Assets: {} downloaded, {} skipped",
        report.assets_persisted, report.assets_skipped
    );

    if !report.failures.is_empty() {
        println!("\nFailed pages:");
        for failure in &report.failures {
            println!("  {}: {}", failure.page_url, failure.reason);
        }
    }

    Ok(())
}

fn show_config(config: &ResolvedConfig) {
    println!("opensea-dl Configuration");
    println!("========================");
    println!();

    match &config.config_file {
        Some(path) => println!("Config file: {}", path.display()),
        None => println!("Config file: (none, using defaults)"),
    }
    println!();

    println!("Output:            {}", config.output.display());
    println!("API base:          {}", config.api_base);
    println!("Workers:           {}", config.fetch.workers);
    println!("Page size:         {}", config.fetch.page_size);
    println!("Request timeout:   {}s", config.fetch.request_timeout_seconds);
    println!("Max Retry-After:   {}s", config.fetch.max_retry_after_seconds);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_name_words() {
        let cli = Cli::try_parse_from(["opensea-dl", "collection", "Cool", "Cats", "-w", "3"]).unwrap();
        assert_eq!(cli.workers, Some(3));
        match cli.command {
            Commands::Collection { name } => assert_eq!(name.join(" "), "Cool Cats"),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_owner_with_global_flags() {
        let cli = Cli::try_parse_from(["opensea-dl", "--json", "owner", "0xabc", "--output", "/tmp/out"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.output, Some(PathBuf::from("/tmp/out")));
        assert!(matches!(cli.command, Commands::Owner { ref wallet } if wallet == "0xabc"));
    }

    #[test]
    fn test_workers_and_output_from_environment() {
        std::env::set_var("OPENSEA_DL_WORKERS", "4");
        std::env::set_var("OPENSEA_DL_OUTPUT", "/tmp/from-env");

        let from_env = Cli::try_parse_from(["opensea-dl", "owner", "0xabc"]);
        let overridden = Cli::try_parse_from(["opensea-dl", "owner", "0xabc", "-w", "2"]);

        std::env::remove_var("OPENSEA_DL_WORKERS");
        std::env::remove_var("OPENSEA_DL_OUTPUT");

        let from_env = from_env.unwrap();
        assert_eq!(from_env.workers, Some(4));
        assert_eq!(from_env.output, Some(PathBuf::from("/tmp/from-env")));

        // Flags still win over the environment
        assert_eq!(overridden.unwrap().workers, Some(2));
    }

    #[test]
    fn test_collection_requires_name() {
        assert!(Cli::try_parse_from(["opensea-dl", "collection"]).is_err());
    }
}
