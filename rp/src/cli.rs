//! CLI command definitions and subcommands

use clap::{Args, Parser, Subcommand};
use eyre::{Context, Result};
use std::path::PathBuf;

use crate::executor::HttpRequest;
use crate::pool::{Backoff, PoolConfig};

/// rp - fetch URLs through a concurrency-limited retrying pool
#[derive(Parser, Debug)]
#[command(name = "rp")]
#[command(author, version, about = "Concurrency-limited retrying request pool", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch URLs through the pool
    Fetch(FetchArgs),

    /// Print the effective configuration
    Config,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// URLs to GET
    pub urls: Vec<String>,

    /// YAML file with a list of requests (method, url, headers, body)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Max concurrent requests (0 = unbounded)
    #[arg(short, long)]
    pub size: Option<usize>,

    /// Retries after the first try
    #[arg(short, long)]
    pub tries: Option<u32>,

    /// Max symmetric random perturbation of retry delays
    #[arg(long)]
    pub jitter_ms: Option<u64>,

    /// Constant delay before each retry
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Also retry HTTP 429 and 5xx responses
    #[arg(long)]
    pub retry_status: bool,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub format: OutputFormat,
}

impl FetchArgs {
    /// Apply command-line overrides on top of file configuration
    pub fn apply(&self, pool: &mut PoolConfig) {
        if let Some(size) = self.size {
            pool.size = size;
        }
        if let Some(tries) = self.tries {
            pool.tries = tries;
        }
        if let Some(jitter_ms) = self.jitter_ms {
            pool.jitter_ms = jitter_ms;
        }
        if let Some(ms) = self.interval_ms {
            pool.interval = Backoff::Constant { ms };
        }
    }

    /// Requests from the request file followed by the positional URLs
    pub fn requests(&self) -> Result<Vec<HttpRequest>> {
        let mut requests = Vec::new();
        if let Some(path) = &self.file {
            let content =
                std::fs::read_to_string(path).context(format!("Failed to read request file {}", path.display()))?;
            let parsed: Vec<HttpRequest> = serde_yaml::from_str(&content).context("Failed to parse request file")?;
            requests.extend(parsed);
        }
        requests.extend(self.urls.iter().map(HttpRequest::get));
        Ok(requests)
    }
}

/// Output format for fetch results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown output format '{}'. Supported: text, json", other)),
        }
    }
}
