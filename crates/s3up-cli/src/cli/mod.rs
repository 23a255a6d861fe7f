//! CLI for s3up.

mod commands;
mod control_socket;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand};
use s3up_core::config;
use std::path::PathBuf;

use commands::{run_cancel, run_scan, run_show_config, run_upload, UploadOptions};

/// Top-level CLI for s3up.
#[derive(Debug, Parser)]
#[command(name = "s3up")]
#[command(about = "s3up: upload local folders to S3 with bounded concurrency", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Upload folders; each folder is one job, started in the order given.
    Upload {
        /// Local folders to upload.
        #[arg(required = true, value_name = "FOLDER")]
        folders: Vec<PathBuf>,

        /// Key prefix inside the bucket (e.g. "2024/shoots").
        #[arg(long, default_value = "")]
        prefix: String,

        /// Destination bucket (overrides `bucket` in config.toml).
        #[arg(long, env = "AWS_BUCKET")]
        bucket: Option<String>,

        /// Upload up to N folders at once (default from config, 5).
        #[arg(long, value_name = "N")]
        jobs: Option<usize>,

        /// Append the folder name to every file name before uploading.
        #[arg(long)]
        tag_filenames: bool,
    },

    /// Cancel an upload in a running `s3up upload`.
    Cancel {
        /// Folder of the job to cancel.
        #[arg(required_unless_present = "all", conflicts_with = "all")]
        folder: Option<PathBuf>,

        /// Cancel every queued and running upload.
        #[arg(long)]
        all: bool,
    },

    /// Show file count and size of folders without uploading.
    Scan {
        #[arg(required = true, value_name = "FOLDER")]
        folders: Vec<PathBuf>,
    },

    /// Print the config file location and the effective configuration.
    Config,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Upload {
                folders,
                prefix,
                bucket,
                jobs,
                tag_filenames,
            } => {
                let opts = UploadOptions {
                    folders,
                    prefix,
                    bucket,
                    jobs,
                    tag_filenames,
                };
                run_upload(&cfg, opts).await?;
            }
            CliCommand::Cancel { folder, all } => run_cancel(folder.as_deref(), all).await?,
            CliCommand::Scan { folders } => run_scan(&folders).await?,
            CliCommand::Config => run_show_config(&cfg)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
