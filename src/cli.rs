use std::path::PathBuf;
use std::str::FromStr;

use crate::enum_str;
use clap::{Parser, ValueEnum};
use log::LevelFilter;

enum_str! {
    #[derive(ValueEnum, Debug, Clone, PartialOrd, PartialEq)]
    pub enum LogLevel {
        ERROR = 3,
        #[value(alias = "WARNING")]
        WARN = 2,
        INFO = 1,
        DEBUG = 0,
    }
}

impl LogLevel {
    pub fn level_filter(&self) -> LevelFilter {
        LevelFilter::from_str(self.name()).unwrap()
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Download datasets defined in YAML configs.", long_about = None)]
pub struct CLIOption {
    /// Source name (config file name without .yaml). Omit to use --all.
    #[arg(value_name = "SOURCE")]
    pub source: Option<String>,

    /// Download all configs in the config directory.
    #[arg(long)]
    pub all: bool,

    /// Directory containing {source}.yaml configs.
    #[arg(long, value_name = "DIR", default_value = "downloads/configs")]
    pub config_dir: PathBuf,

    /// Root directory for downloaded datasets.
    #[arg(long, value_name = "DIR", default_value = "downloads/datasets")]
    pub output_dir: PathBuf,

    /// Overwrite existing files instead of skipping them.
    #[arg(long)]
    pub overwrite: bool,

    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Path to a Google service account JSON key file.
    #[arg(long, value_name = "FILE")]
    pub service_account_file: Option<PathBuf>,

    /// Path to an OAuth2 installed-app client-secrets JSON file.
    #[arg(long, value_name = "FILE", default_value = "credentials.json")]
    pub credentials_file: PathBuf,

    /// Google API key. Not supported for Drive media downloads; OAuth2 or a
    /// service account is required for those.
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Maximum concurrent Google Drive downloads.
    #[arg(long, default_value_t = 4)]
    pub max_drive_workers: usize,

    /// Maximum concurrent HTTP downloads.
    #[arg(long, default_value_t = 8)]
    pub max_http_workers: usize,

    /// Enumerate Google Drive files and write manifests without downloading.
    #[arg(long)]
    pub manifest_only: bool,

    /// Skip downloads and verify local files against manifests.
    #[arg(long)]
    pub verify_only: bool,

    /// Skip checksum/size verification after downloads.
    #[arg(long)]
    pub skip_verify: bool,

    /// Show progress bars.
    #[arg(long, default_value_t = true, overrides_with = "no_progress")]
    pub progress: bool,

    /// Disable progress bars.
    #[arg(long)]
    pub no_progress: bool,
}

impl CLIOption {
    pub fn use_progress(&self) -> bool {
        self.progress && !self.no_progress
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_accepts_warning_alias() {
        let opt = CLIOption::parse_from(["acquire", "demo", "--log-level", "WARNING"]);
        assert_eq!(opt.log_level, LogLevel::WARN);
        assert_eq!(opt.log_level.level_filter(), LevelFilter::Warn);
    }

    #[test]
    fn log_level_still_accepts_warn() {
        let opt = CLIOption::parse_from(["acquire", "demo", "--log-level", "warn"]);
        assert_eq!(opt.log_level, LogLevel::WARN);
    }
}
