//! CLI for Replica, the yt-dlp download runner.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use replica_core::config::{self, ReplicaConfig};
use std::path::PathBuf;

use commands::{run_completions, run_config_set, run_config_show, run_download};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "replica", version)]
#[command(about = "Replica: download video and audio through yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download one or more links, one after another.
    Download(DownloadArgs),

    /// Show or change saved settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
pub struct DownloadArgs {
    /// Links separated by commas (several arguments are joined).
    #[arg(required = true, num_args = 1..)]
    pub links: Vec<String>,

    /// Output format: mp4 (video) or mp3 (audio).
    #[arg(long, default_value = "mp4")]
    pub format: String,

    /// Video quality: high or low. Ignored for mp3.
    #[arg(long, default_value = "high")]
    pub quality: String,

    /// Directory to save into (default: saved setting).
    #[arg(long, value_name = "DIR")]
    pub save_dir: Option<PathBuf>,

    /// Do not verify TLS certificates for this run.
    #[arg(long, conflicts_with = "check_cert")]
    pub skip_cert_check: bool,

    /// Verify TLS certificates for this run.
    #[arg(long)]
    pub check_cert: bool,

    /// Do not print the tool's output, only progress and the summary.
    #[arg(long, conflicts_with = "show_output")]
    pub quiet: bool,

    /// Print the tool's output even if disabled in settings.
    #[arg(long)]
    pub show_output: bool,

    /// Downloader executable (default: saved setting, normally yt-dlp).
    #[arg(long, value_name = "PATH")]
    pub tool: Option<String>,
}

impl DownloadArgs {
    /// Saved settings with this invocation's flags applied on top.
    pub fn effective_settings(&self, saved: &ReplicaConfig) -> ReplicaConfig {
        let mut cfg = saved.clone();
        if let Some(dir) = &self.save_dir {
            cfg.save_dir = dir.clone();
        }
        if self.skip_cert_check {
            cfg.skip_cert_check = true;
        } else if self.check_cert {
            cfg.skip_cert_check = false;
        }
        if self.quiet {
            cfg.show_output = false;
        } else if self.show_output {
            cfg.show_output = true;
        }
        if let Some(tool) = &self.tool {
            cfg.tool_path = tool.clone();
        }
        cfg
    }
}

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the settings file location and its values.
    Show,

    /// Change one or more settings and save them.
    Set {
        /// Default directory for downloads.
        #[arg(long, value_name = "DIR")]
        save_dir: Option<PathBuf>,
        /// Skip TLS certificate verification (true/false).
        #[arg(long, value_name = "BOOL")]
        skip_cert_check: Option<bool>,
        /// Print the tool's output while downloading (true/false).
        #[arg(long, value_name = "BOOL")]
        show_output: Option<bool>,
        /// Downloader executable.
        #[arg(long, value_name = "PATH")]
        tool: Option<String>,
    },
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Download(args) => {
                let (_, cfg) = load_config()?;
                run_download(&cfg, &args).await?;
            }
            CliCommand::Config { action } => {
                let (cfg_path, cfg) = load_config()?;
                match action {
                    ConfigAction::Show => run_config_show(&cfg_path, &cfg),
                    ConfigAction::Set {
                        save_dir,
                        skip_cert_check,
                        show_output,
                        tool,
                    } => run_config_set(
                        &cfg_path,
                        cfg,
                        save_dir,
                        skip_cert_check,
                        show_output,
                        tool,
                    )?,
                }
            }
            CliCommand::Completions { shell } => run_completions(shell),
        }

        Ok(())
    }
}

fn load_config() -> Result<(PathBuf, ReplicaConfig)> {
    let cfg_path = config::config_path()?;
    let cfg = config::load_or_init_at(&cfg_path)?;
    tracing::debug!("loaded config: {:?}", cfg);
    Ok((cfg_path, cfg))
}

#[cfg(test)]
mod tests;
