mod settings;

use anyhow::{Context, Result};
use archive_core::{RunSummary, ServerArchiver};
use clap::Parser;
use discord_adapter::DiscordRestPlatform;
use media_adapter::HttpMediaFetcher;
use pdf_adapter::PdfRenderer;
use settings::Cli;

fn main() {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // checked before anything touches the network
    let token = settings::token_from_env()?;
    let server_id = settings::resolve_server_id(cli.server_id.clone())?;

    let platform = DiscordRestPlatform::new(&token, &cli.api_base).context("failed to build API client")?;
    let fetcher = HttpMediaFetcher::new(&cli.fetcher_config()).context("failed to build media client")?;

    let archiver = ServerArchiver::new(
        Box::new(platform),
        Box::new(fetcher),
        Box::new(PdfRenderer),
        cli.archive_config(),
    );

    archiver.login()?;
    let summary = archiver
        .run(&server_id)
        .with_context(|| format!("archiving server {server_id} failed"))?;

    print_summary(&summary, cli.json)
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    match &summary.output_path {
        Some(path) => println!("Archive written to {}", path.display()),
        None => println!("No messages found in {}; nothing written", summary.server_name),
    }
    println!(
        "Channels: {} archived, {} empty, {} abandoned ({} total)",
        summary.channels_archived.len(),
        summary.channels_empty.len(),
        summary.channels_abandoned.len(),
        summary.channels_seen
    );
    for abandoned in &summary.channels_abandoned {
        println!("  abandoned #{}: {}", abandoned.name, abandoned.reason);
    }
    println!("Messages: {}", summary.records_archived);
    if !summary.media_failures.is_empty() || summary.render_placeholders > 0 {
        println!(
            "Media: {} failed downloads, {} images not embedded",
            summary.media_failures.len(),
            summary.render_placeholders
        );
    }
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
