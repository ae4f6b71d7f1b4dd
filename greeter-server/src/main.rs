use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

mod config;
mod context;
mod server;

#[derive(Parser, Debug, Clone)]
#[command(name = "greeter")]
#[command(author, version, about = "Greeter - plays a member's own voicelines when they join or leave voice")]
pub struct Args {
    /// Discord bot token. Falls back to GREETER_DISCORD_TOKEN.
    #[arg(long)]
    discord_token: Option<String>,

    /// Where documents and blobs are kept. Defaults to the platform data dir.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Base URL the blob directory is served from; signed links start with it.
    #[arg(long, default_value = "http://localhost:8080/blobs")]
    public_base_url: String,

    /// Lifetime of signed track links, in seconds.
    #[arg(long, default_value = "900")]
    url_ttl_secs: u64,

    /// ffmpeg binary used to transcode tracks before streaming.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,

    /// Player command run once per track; may use {file}, {guild} and {channel}.
    #[arg(long, default_value = "greeter-voice-play --guild {guild} --channel {channel} {file}")]
    player_command: String,

    /// How long a paginated message stays interactive, in seconds.
    #[arg(long, default_value = "120")]
    pagination_ttl_secs: u64,

    /// Keep every document and blob in memory; nothing survives a restart.
    #[arg(long, default_value = "false")]
    ephemeral: bool,
}

fn init_tracing() {
    let filter = EnvFilter::from_default_env().add_directive("greeter=info".parse().unwrap_or_default());
    let sub = fmt().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(sub) {
        eprintln!("Failed to set global subscriber: {e}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();
    let args = Args::parse();
    info!("Greeter starting. ephemeral={}", args.ephemeral);

    if let Err(e) = server::run_server(args).await {
        error!("Server error: {:?}", e);
        return Err(e);
    }
    info!("Main finished. Goodbye!");
    Ok(())
}
