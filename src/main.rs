#![recursion_limit = "256"]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use acquire::cli::{CLIOption, LogLevel};
use acquire::config::{self, Item};
use acquire::credentials::CredentialProvider;
use acquire::orchestrator::{Orchestrator, RunOptions};
use acquire::{progress, utils};
use clap::Parser;
use log::{error, info};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let option = CLIOption::parse();

    env_logger::Builder::new().filter_level(option.log_level.level_filter()).init();

    if option.log_level <= LogLevel::INFO {
        utils::print_version();
    }

    let config_paths = resolve_config_paths(&option)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received interrupt, finishing in-flight work...");
                cancel.cancel();
            }
        });
    }

    let mut failed_sources = Vec::new();

    for config_path in config_paths {
        let source_name = config_path.file_stem().and_then(|s| s.to_str()).unwrap_or("unknown").to_string();
        info!("Processing config: {source_name}");

        match run_source(&option, &config_path, &cancel).await {
            Ok(report) if report.is_success() => {}
            Ok(report) => {
                error!("Source '{source_name}' finished with {} failure(s)", report.failures.len());
                for failure in &report.failures {
                    error!("  {failure}");
                }
                failed_sources.push(source_name);
            }
            Err(e) => {
                error!("Failed to process config {source_name}: {e}");
                failed_sources.push(source_name);
            }
        }
    }

    if !failed_sources.is_empty() {
        error!("Failed to download {} config(s): {}", failed_sources.len(), failed_sources.join(", "));
        std::process::exit(1);
    }

    Ok(())
}

fn resolve_config_paths(option: &CLIOption) -> anyhow::Result<Vec<PathBuf>> {
    if option.all {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&option.config_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("yaml"))
            .collect();
        paths.sort();
        if paths.is_empty() {
            anyhow::bail!("No YAML config files found in {}", option.config_dir.display());
        }
        Ok(paths)
    } else if let Some(source) = &option.source {
        let path = option.config_dir.join(format!("{source}.yaml"));
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }
        Ok(vec![path])
    } else {
        anyhow::bail!("Either specify a source name or use --all to download all configs.")
    }
}

async fn run_source(
    option: &CLIOption,
    config_path: &std::path::Path,
    cancel: &CancellationToken,
) -> anyhow::Result<acquire::orchestrator::RunReport> {
    let source_config = config::load(config_path, Some(&option.output_dir)).await?;

    let api_key = option.api_key.clone().or_else(|| std::env::var("GOOGLE_API_KEY").ok());
    let service_account_file = option
        .service_account_file
        .clone()
        .or_else(|| std::env::var("GOOGLE_SERVICE_ACCOUNT_FILE").ok().map(PathBuf::from))
        .or_else(|| std::env::var("GOOGLE_APPLICATION_CREDENTIALS").ok().map(PathBuf::from));
    let credentials_file = if option.credentials_file != PathBuf::from("credentials.json") {
        option.credentials_file.clone()
    } else {
        std::env::var("GOOGLE_CREDENTIALS_FILE")
            .ok()
            .map(PathBuf::from)
            .unwrap_or_else(|| option.credentials_file.clone())
    };
    let token_file_override = std::env::var("GOOGLE_DRIVE_TOKEN_FILE").ok().map(PathBuf::from);

    let needs_drive = source_config.items.iter().any(|item| matches!(item, Item::GdriveFolder { .. }));

    let credentials = if needs_drive {
        Some(
            CredentialProvider::resolve(
                service_account_file.as_deref(),
                Some(credentials_file.as_path()),
                token_file_override.as_deref(),
                api_key.as_deref(),
            )
            .await?,
        )
    } else {
        None
    };

    let http_client = reqwest::Client::builder().timeout(Duration::from_secs(60)).build()?;
    let reporter = Arc::from(progress::reporter(option.use_progress()));

    let orchestrator = Orchestrator::new(http_client, credentials, reporter, cancel.clone());

    let run_options = RunOptions {
        overwrite: option.overwrite,
        manifest_only: option.manifest_only,
        verify_only: option.verify_only,
        skip_verify: option.skip_verify,
        max_http_workers: option.max_http_workers.max(1),
        max_drive_workers: option.max_drive_workers.max(1),
    };

    Ok(orchestrator.download_all(&source_config, &run_options).await?)
}
