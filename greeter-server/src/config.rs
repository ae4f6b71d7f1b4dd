//! greeter-server/src/config.rs
//!
//! Resolved runtime settings: command line first, then environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::Args;

pub const TOKEN_ENV: &str = "GREETER_DISCORD_TOKEN";

#[derive(Debug, Clone)]
pub struct GreeterConfig {
    pub discord_token: String,
    pub data_dir: PathBuf,
    pub public_base_url: String,
    pub url_ttl: Duration,
    pub ffmpeg: PathBuf,
    pub player_command: String,
    pub pagination_ttl: Duration,
    pub ephemeral: bool,
}

impl GreeterConfig {
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        let discord_token = match &args.discord_token {
            Some(token) => token.clone(),
            None => std::env::var(TOKEN_ENV).with_context(|| format!("{TOKEN_ENV} is not set"))?,
        };
        if discord_token.trim().is_empty() {
            bail!("Discord token is empty");
        }

        let data_dir = match &args.data_dir {
            Some(dir) => dir.clone(),
            None => dirs::data_dir()
                .context("no platform data directory; pass --data-dir")?
                .join("greeter"),
        };

        Ok(Self {
            discord_token,
            data_dir,
            public_base_url: args.public_base_url.clone(),
            url_ttl: Duration::from_secs(args.url_ttl_secs),
            ffmpeg: args.ffmpeg.clone(),
            player_command: args.player_command.clone(),
            pagination_ttl: Duration::from_secs(args.pagination_ttl_secs),
            ephemeral: args.ephemeral,
        })
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join("documents")
    }

    pub fn blobs_dir(&self) -> PathBuf {
        self.data_dir.join("blobs")
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.data_dir.join("scratch")
    }
}
