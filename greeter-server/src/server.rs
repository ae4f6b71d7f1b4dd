//! greeter-server/src/server.rs
//!
//! Connects to Discord, starts the dispatcher and feeds it voice events until Ctrl-C.

use std::time::Duration;

use anyhow::Context;
use tracing::{debug, error, info, warn};

use greeter_core::platforms::discord::DiscordPlatform;
use greeter_core::tasks::pagination_expiry::spawn_pagination_expiry_task;

use crate::config::GreeterConfig;
use crate::context::ServerContext;
use crate::Args;

const PAGINATION_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

pub async fn run_server(args: Args) -> anyhow::Result<()> {
    let config = GreeterConfig::from_args(&args)?;

    let mut platform = DiscordPlatform::new(config.discord_token.clone());
    platform.connect().await.context("connecting to the Discord gateway")?;

    let mut ctx = ServerContext::new(&config, &platform).await?;
    let dispatcher = ctx
        .dispatcher
        .take()
        .context("dispatcher already started")?;
    let dispatcher_task = dispatcher.spawn(ctx.worker.clone());
    let expiry_task = spawn_pagination_expiry_task(ctx.pagination.clone(), PAGINATION_SWEEP_INTERVAL);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            res = &mut ctrl_c => {
                if let Err(e) = res {
                    error!("Failed to listen for Ctrl-C: {:?}", e);
                }
                info!("Ctrl-C detected; shutting down...");
                break;
            }
            next = platform.next_voice_event() => {
                let Some(event) = next else {
                    warn!("Voice event stream closed; shutting down...");
                    break;
                };
                // Per-guild ordering is kept by the registry, not by this loop.
                let greeter = ctx.greeter.clone();
                tokio::spawn(async move {
                    let outcome = greeter
                        .on_voice_state(event.guild_id, event.user_id, event.before, event.after, event.is_bot)
                        .await;
                    debug!("Voice event for user {} in guild {} => {:?}", event.user_id, event.guild_id, outcome);
                });
            }
        }
    }

    ctx.dispatcher_handle.shutdown();
    if let Err(e) = dispatcher_task.await {
        error!("Dispatcher task ended abnormally: {:?}", e);
    }
    expiry_task.abort();

    let released = ctx.registry.drain().await;
    info!("Leaving {} voice channel(s)", released.len());
    for guild in released {
        if let Err(e) = guild.connection.disconnect().await {
            warn!("Disconnect from guild {} failed: {:?}", guild.connection.guild_id(), e);
        }
    }
    if let Err(e) = platform.disconnect().await {
        error!("Error disconnecting from Discord: {:?}", e);
    }

    info!("Server shutdown complete.");
    Ok(())
}
