//! greeter-server/src/context.rs
//!
//! Builds every long-lived component once and hands them out by `Arc`.

use std::sync::Arc;

use tracing::info;

use greeter_common::traits::{BlobStore, DocumentStore};
use greeter_core::audio::{CommandSink, FfmpegEncoder};
use greeter_core::pagination::PaginationEngine;
use greeter_core::platforms::discord::{DiscordChannelGate, DiscordPlatform, GatewayVoiceConnector};
use greeter_core::playback::{Dispatcher, DispatcherHandle, GuildRegistry, PlaybackWorker};
use greeter_core::services::{BlacklistService, GreeterService, TrackService, VoiceStateService};
use greeter_core::staging::TempDirStaging;
use greeter_core::stores::{LocalBlobStore, LocalDocumentStore, MemoryBlobStore, MemoryDocumentStore};
use greeter_core::Error;

use crate::config::GreeterConfig;

pub struct ServerContext {
    pub registry: Arc<GuildRegistry>,
    pub pagination: Arc<PaginationEngine>,
    pub greeter: Arc<GreeterService>,
    pub worker: Arc<PlaybackWorker>,
    pub dispatcher: Option<Dispatcher>,
    pub dispatcher_handle: DispatcherHandle,
}

impl ServerContext {
    /// Connect `platform` first if the bot is to join voice: the connector copies its shard senders.
    pub async fn new(config: &GreeterConfig, platform: &DiscordPlatform) -> Result<Self, Error> {
        let (documents, blobs): (Arc<dyn DocumentStore>, Arc<dyn BlobStore>) = if config.ephemeral {
            info!("Ephemeral mode: documents and blobs live in memory");
            (Arc::new(MemoryDocumentStore::new()), Arc::new(MemoryBlobStore::new()))
        } else {
            info!("Storing documents and blobs under {}", config.data_dir.display());
            (
                Arc::new(LocalDocumentStore::open(config.documents_dir()).await?),
                Arc::new(LocalBlobStore::open(config.blobs_dir(), config.public_base_url.clone(), config.url_ttl).await?),
            )
        };

        let staging = Arc::new(TempDirStaging::in_dir(&config.scratch_dir())?);
        let registry = Arc::new(GuildRegistry::new());
        let pagination = Arc::new(PaginationEngine::new(config.pagination_ttl));
        let (dispatcher, dispatcher_handle) = Dispatcher::new();

        let tracks = Arc::new(TrackService::new(
            documents.clone(),
            blobs,
            staging.clone(),
            config.url_ttl,
        ));
        let blacklist = Arc::new(BlacklistService::new(documents));

        let worker = Arc::new(PlaybackWorker::new(
            registry.clone(),
            Arc::new(FfmpegEncoder::new(config.ffmpeg.clone())),
            Arc::new(CommandSink::from_template(&config.player_command)?),
            staging.clone(),
            dispatcher_handle.clone(),
        ));

        let voice = Arc::new(VoiceStateService::new(
            registry.clone(),
            dispatcher_handle.clone(),
            tracks.clone(),
            blacklist.clone(),
            staging,
            Arc::new(DiscordChannelGate::new(platform.cache())),
            Arc::new(GatewayVoiceConnector::new(platform.shard_senders())),
        ));

        let greeter = Arc::new(GreeterService::new(voice, tracks, blacklist, pagination.clone()));

        Ok(Self {
            registry,
            pagination,
            greeter,
            worker,
            dispatcher: Some(dispatcher),
            dispatcher_handle,
        })
    }
}
