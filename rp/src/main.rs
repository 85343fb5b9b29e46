//! rp - fetch URLs through a concurrency-limited retrying pool

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info};

use retrypool::cli::{Cli, Command, FetchArgs, OutputFormat};
use retrypool::config::Config;
use retrypool::executor::{HttpExecutor, HttpOutcome, HttpRequest, StatusClassifier};
use retrypool::{Pool, PoolError};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("retrypool")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("rp.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(cli.log_level.as_deref(), config.log_level.as_deref()).context("Failed to setup logging")?;

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::Fetch(args) => cmd_fetch(config, args).await,
        Command::Config => {
            print!("{}", config.to_yaml()?);
            Ok(())
        }
    }
}

async fn cmd_fetch(mut config: Config, args: FetchArgs) -> Result<()> {
    args.apply(&mut config.pool);
    let requests = args.requests()?;
    if requests.is_empty() {
        eyre::bail!("No requests given: pass URLs or --file");
    }

    let executor = HttpExecutor::from_config(&config.http).context("Failed to build HTTP client")?;
    let pool: Pool<HttpRequest, HttpExecutor> = if args.retry_status {
        Pool::with_classifier(config.pool.clone(), executor, StatusClassifier::new())
    } else {
        Pool::new(config.pool.clone(), executor)
    }
    .context("Failed to create pool")?;

    info!(count = requests.len(), "Fetching");
    let (handle, task) = pool.spawn();

    let calls = requests.into_iter().map(|request| {
        let handle = handle.clone();
        async move {
            let result = handle.call(request.clone()).await;
            (request, result)
        }
    });
    let results = futures::future::join_all(calls).await;

    drop(handle);
    let stats = task.await.context("Pool task failed")?;
    info!(?stats, "Fetch complete");

    let mut failures = 0;
    for (request, result) in &results {
        if !report(request, result, args.format)? {
            failures += 1;
        }
    }

    if failures > 0 {
        eyre::bail!("{} of {} requests failed", failures, results.len());
    }
    Ok(())
}

/// Print one result line; returns whether the request succeeded
fn report(request: &HttpRequest, result: &Result<HttpOutcome, PoolError>, format: OutputFormat) -> Result<bool> {
    let (response, errors) = match result {
        Ok(Ok(response)) => (Some(response), Vec::new()),
        Ok(Err(e)) => (None, vec![e.to_string()]),
        Err(PoolError::Exhausted(e)) => (None, e.errors.clone()),
        Err(e) => (None, vec![e.to_string()]),
    };

    match format {
        OutputFormat::Json => {
            let line = serde_json::json!({
                "method": request.method,
                "url": request.url,
                "ok": response.is_some(),
                "status": response.map(|r| r.status),
                "bytes": response.map(|r| r.body.len()),
                "errors": errors,
            });
            println!("{}", serde_json::to_string(&line).context("Failed to encode result")?);
        }
        OutputFormat::Text => match (response, result) {
            (Some(response), _) => {
                let status = response.status.to_string();
                let status = if response.is_success() { status.cyan() } else { status.yellow() };
                println!(
                    "{} {} {} {}",
                    "✓".green(),
                    status,
                    request.url,
                    format!("({} bytes)", response.body.len()).dimmed()
                );
            }
            (None, Err(PoolError::Exhausted(e))) => {
                println!("{} {} {}", "✗".red(), request.url, format!("[{} tries]", e.tries()).dimmed());
                if let Some(last) = e.last_error() {
                    println!("    {}", last.yellow());
                }
            }
            (None, _) => {
                println!("{} {}", "✗".red(), request.url);
                for error in &errors {
                    println!("    {}", error.yellow());
                }
            }
        },
    }
    Ok(response.is_some())
}
