use anyhow::{bail, Context, Result};
use archive_core::config::{ArchiveConfig, DEFAULT_PAGE_SIZE, DEFAULT_WORK_DIR};
use archive_core::utils::normalize_token;
use clap::Parser;
use discord_adapter::DEFAULT_API_BASE;
use media_adapter::FetcherConfig;
use std::path::PathBuf;
use std::time::Duration;

pub const TOKEN_VAR: &str = "DISCORD_TOKEN";

/// Archives every text channel of a Discord server into a single PDF
#[derive(Parser, Debug)]
#[command(name = "discord-archiver", version)]
#[command(about = "Archives the text channels of a Discord server into a PDF document")]
pub struct Cli {
    /// Server (guild) to archive; prompted for when omitted
    #[arg(short = 's', long = "server-id")]
    pub server_id: Option<String>,

    /// Scratch directory for downloaded media, removed after the run
    #[arg(long = "work-dir", default_value = DEFAULT_WORK_DIR)]
    pub work_dir: PathBuf,

    /// Directory the PDF is written to
    #[arg(short = 'o', long = "output-dir", default_value = ".")]
    pub output_dir: PathBuf,

    /// Messages requested per history page (1..=100)
    #[arg(long = "page-size", default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Pause between consecutive history requests
    #[arg(long = "page-delay-ms", default_value_t = 1000)]
    pub page_delay_ms: u64,

    /// Per-download timeout for media
    #[arg(long = "media-timeout-secs", default_value_t = 30)]
    pub media_timeout_secs: u64,

    #[arg(long = "api-base", default_value = DEFAULT_API_BASE)]
    pub api_base: String,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn archive_config(&self) -> ArchiveConfig {
        ArchiveConfig {
            page_size: self.page_size,
            page_delay: Duration::from_millis(self.page_delay_ms),
            work_dir: self.work_dir.clone(),
            output_dir: self.output_dir.clone(),
        }
    }

    pub fn fetcher_config(&self) -> FetcherConfig {
        FetcherConfig {
            timeout: Duration::from_secs(self.media_timeout_secs),
            ..Default::default()
        }
    }
}

/// Reads the credential from the environment after `.env` has been loaded
pub fn token_from_env() -> Result<String> {
    let raw = std::env::var(TOKEN_VAR)
        .with_context(|| format!("{TOKEN_VAR} is not set (export it or add it to .env)"))?;
    parse_token(&raw)
}

fn parse_token(raw: &str) -> Result<String> {
    let token = normalize_token(raw);
    if token.is_empty() {
        bail!("{TOKEN_VAR} is empty");
    }
    Ok(token)
}

/// Uses the flag when given, otherwise asks on the terminal
pub fn resolve_server_id(flag: Option<String>) -> Result<String> {
    let server_id = match flag {
        Some(id) => id,
        None => dialoguer::Input::<String>::new()
            .with_prompt("Server ID to archive")
            .interact_text()
            .context("failed to read server id")?,
    };
    let server_id = server_id.trim().to_string();
    if server_id.is_empty() {
        bail!("server id must not be empty");
    }
    Ok(server_id)
}
