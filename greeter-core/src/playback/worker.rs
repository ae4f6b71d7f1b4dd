// File: src/playback/worker.rs

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, warn};

use greeter_common::error::Error;
use greeter_common::models::GuildId;
use greeter_common::traits::{AudioEncoder, EncodedAudio, FileStaging, StreamCompletion, VoiceConnection, VoiceSink};

use super::dispatcher::DispatcherHandle;
use super::registry::{DequeuedTrack, GuildRegistry};

/// How one drain cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Nothing was queued; the signal lost a race with another worker or a teardown.
    Idle,
    /// The track streamed to end of stream.
    Completed { continued: bool },
    /// Encoding or streaming failed and the track was discarded.
    Dropped { continued: bool },
}

/// Plays exactly one queued track per [`run`](Self::run) call.
pub struct PlaybackWorker {
    registry: Arc<GuildRegistry>,
    encoder: Arc<dyn AudioEncoder>,
    sink: Arc<dyn VoiceSink>,
    staging: Arc<dyn FileStaging>,
    dispatcher: DispatcherHandle,
}

impl PlaybackWorker {
    pub fn new(
        registry: Arc<GuildRegistry>,
        encoder: Arc<dyn AudioEncoder>,
        sink: Arc<dyn VoiceSink>,
        staging: Arc<dyn FileStaging>,
        dispatcher: DispatcherHandle,
    ) -> Self {
        Self {
            registry,
            encoder,
            sink,
            staging,
            dispatcher,
        }
    }

    pub async fn run(&self, guild_id: GuildId) -> WorkerOutcome {
        let Some(DequeuedTrack { path, connection, epoch }) = self.registry.dequeue(guild_id).await else {
            debug!("Ready signal for guild {} found an empty queue", guild_id);
            return WorkerOutcome::Idle;
        };

        let played = self.play(&path, connection).await;

        if let Err(e) = self.staging.delete(&path).await {
            warn!("Could not delete staged file {}: {:?}", path.display(), e);
        }

        let continued = self.registry.mark_idle_or_continue(guild_id, epoch).await;
        if continued {
            if let Err(e) = self.dispatcher.signal(guild_id) {
                error!("Guild {} has queued tracks but cannot be re-signalled: {}", guild_id, e);
            }
        }

        match played {
            Ok(()) => WorkerOutcome::Completed { continued },
            Err(e) => {
                error!("Dropping track {} in guild {}: {}", path.display(), guild_id, e);
                WorkerOutcome::Dropped { continued }
            }
        }
    }

    async fn play(&self, source: &Path, connection: Arc<dyn VoiceConnection>) -> Result<(), Error> {
        let encoded = self.encoder.encode(source).await?;
        let scratch = (encoded.temporary && encoded.path != source).then(|| encoded.path.clone());

        let streamed = self.stream(connection, encoded).await;

        if let Some(scratch) = scratch {
            if let Err(e) = self.staging.delete(&scratch).await {
                warn!("Could not delete encoder output {}: {:?}", scratch.display(), e);
            }
        }
        streamed
    }

    async fn stream(&self, connection: Arc<dyn VoiceConnection>, audio: EncodedAudio) -> Result<(), Error> {
        let completion = self.sink.stream(connection, audio).await?;
        match completion.await {
            Ok(StreamCompletion::EndOfStream) => Ok(()),
            Ok(StreamCompletion::Failed(reason)) => Err(Error::Stream(reason)),
            Err(_) => Err(Error::Stream("stream ended without a completion".into())),
        }
    }
}
