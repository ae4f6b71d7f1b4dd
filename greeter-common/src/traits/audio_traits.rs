use std::fmt::Debug;
use std::path::PathBuf;
use std::sync::Arc;
use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::Error;
use crate::models::ids::{ChannelId, GuildId};

/// Encoder output ready to be streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudio {
    pub path: PathBuf,
    /// True when `path` is a scratch file the encoder created and the caller must remove.
    pub temporary: bool,
}

impl EncodedAudio {
    /// The source file is streamed as-is.
    pub fn passthrough(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
        }
    }
}

/// Final signal of a voice stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamCompletion {
    /// The whole track was sent. The only successful completion.
    EndOfStream,
    Failed(String),
}

/// Resolves once the stream ends. A dropped sender counts as a failure.
pub type CompletionReceiver = oneshot::Receiver<StreamCompletion>;

#[async_trait]
pub trait AudioEncoder: Send + Sync {
    async fn encode(&self, source: &std::path::Path) -> Result<EncodedAudio, Error>;
}

/// A live voice connection in one guild.
#[async_trait]
pub trait VoiceConnection: Send + Sync + Debug {
    fn guild_id(&self) -> GuildId;
    fn channel_id(&self) -> ChannelId;
    async fn disconnect(&self) -> Result<(), Error>;
}

#[async_trait]
pub trait VoiceConnector: Send + Sync {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<Arc<dyn VoiceConnection>, Error>;
}

#[async_trait]
pub trait VoiceSink: Send + Sync {
    /// Starts streaming and returns immediately; completion arrives on the receiver.
    async fn stream(
        &self,
        connection: Arc<dyn VoiceConnection>,
        audio: EncodedAudio,
    ) -> Result<CompletionReceiver, Error>;
}

/// Read access to channel permissions and occupancy, as seen by the bot.
#[async_trait]
pub trait ChannelGate: Send + Sync {
    /// Whether the bot may both connect to and speak in `channel_id`.
    async fn can_connect_and_speak(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<bool, Error>;

    /// Non-bot users currently in `channel_id`.
    async fn human_count(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<usize, Error>;
}
