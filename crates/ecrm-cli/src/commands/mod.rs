//! CLI commands and argument parsing.

pub mod delete;
pub mod scan;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ecrm_aws::AwsPlatform;
use ecrm_core::Config;
use ecrm_registry::DeleteMode;
use tracing::info;

use crate::prompt::StdinConfirm;
use crate::report::{OutputFormat, WriterSink};
use crate::runner::{RunOptions, Runner};

/// ecrm - Expired container image collector for ECR
#[derive(Parser)]
#[command(name = "ecrm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Path to the config file
    #[arg(long, global = true, env = "ECRM_CONFIG", default_value = "ecrm.yaml")]
    pub config: PathBuf,

    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// AWS region, overriding the SDK's resolution
    #[arg(long, global = true, env = "AWS_REGION")]
    pub region: Option<String>,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Report expired images without deleting them
    Scan(scan::ScanArgs),

    /// Delete expired images
    Delete(delete::DeleteArgs),

    /// Print version information
    Version,
}

/// Repository filter and report format.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Only process this repository
    #[arg(long)]
    pub repository: Option<String>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
}

/// Loads config and AWS clients, then runs one pass in `mode`.
pub(crate) async fn execute(global: &GlobalArgs, target: &TargetArgs, mode: DeleteMode) -> Result<()> {
    let config = Config::load(&global.config)
        .with_context(|| format!("Failed to load config {}", global.config.display()))?;
    let platform = AwsPlatform::load(global.region.clone())
        .await
        .context("Failed to load AWS config")?;
    info!(region = %platform.region, config = %global.config.display(), "Starting ecrm");

    let runner = Runner::new(
        Arc::new(platform.registry),
        Arc::new(platform.clusters),
        Arc::new(platform.functions),
        Arc::new(StdinConfirm),
    );
    let options = RunOptions {
        repository: target.repository.clone(),
        mode,
    };
    let mut sink = WriterSink::new(std::io::stdout(), target.format, !global.no_color);

    let report = runner.run(&config, &options, &mut sink).await?;
    info!(
        repositories = report.summaries.len(),
        expired = report.expired_images(),
        deleted = report.deleted_images(),
        "Run finished"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan_defaults() {
        let cli = Cli::try_parse_from(["ecrm", "scan"]).unwrap();
        assert_eq!(cli.global.log_level, "info");
        assert!(!cli.global.no_color);
        match cli.command {
            Commands::Scan(args) => {
                assert_eq!(args.target.repository, None);
                assert_eq!(args.target.format, OutputFormat::Table);
            }
            _ => panic!("expected scan"),
        }
    }

    #[test]
    fn test_parse_delete_flags() {
        let cli = Cli::try_parse_from([
            "ecrm",
            "--config",
            "custom.yaml",
            "delete",
            "--repository",
            "prod/api",
            "--format",
            "json",
            "--force",
            "--no-color",
        ])
        .unwrap();
        assert_eq!(cli.global.config, PathBuf::from("custom.yaml"));
        assert!(cli.global.no_color);
        match cli.command {
            Commands::Delete(args) => {
                assert!(args.force);
                assert_eq!(args.target.repository.as_deref(), Some("prod/api"));
                assert_eq!(args.target.format, OutputFormat::Json);
                assert_eq!(args.mode(), DeleteMode::Delete { force: true });
            }
            _ => panic!("expected delete"),
        }
    }

    #[test]
    fn test_parse_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["ecrm", "scan", "--format", "yaml"]).is_err());
    }

    fn global(config: PathBuf) -> GlobalArgs {
        GlobalArgs {
            config,
            log_level: "info".to_string(),
            no_color: true,
            region: Some("us-east-1".to_string()),
        }
    }

    fn target() -> TargetArgs {
        TargetArgs {
            repository: None,
            format: OutputFormat::Table,
        }
    }

    #[tokio::test]
    async fn test_missing_config_fails_before_aws() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecrm.yaml");

        let err = execute(&global(path), &target(), DeleteMode::DryRun)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to load config"));
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecrm.yaml");
        std::fs::write(&path, "repositories:\n  - name: app\n    keep_count: 3\n").unwrap();

        let err = execute(&global(path), &target(), DeleteMode::Delete { force: true })
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("expires is required"));
    }
}
