use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use twilight_gateway::MessageSender;
use twilight_model::gateway::payload::outgoing::UpdateVoiceState;
use twilight_model::id::marker::ChannelMarker;
use twilight_model::id::Id;

use greeter_common::error::Error;
use greeter_common::models::{ChannelId, GuildId};
use greeter_common::traits::{VoiceConnection, VoiceConnector};

use super::{channel_marker, guild_marker};

/// Shard index Discord routes a guild's gateway traffic through.
pub fn shard_for(guild_id: GuildId, shard_count: usize) -> usize {
    if shard_count == 0 {
        return 0;
    }
    ((guild_id.get() >> 22) % shard_count as u64) as usize
}

/// Moves the bot in and out of voice channels with gateway voice-state updates.
#[derive(Clone)]
pub struct GatewayVoiceConnector {
    senders: Arc<Vec<MessageSender>>,
}

impl GatewayVoiceConnector {
    pub fn new(senders: Vec<MessageSender>) -> Self {
        Self {
            senders: Arc::new(senders),
        }
    }

    fn sender_for(&self, guild_id: GuildId) -> Result<MessageSender, Error> {
        self.senders
            .get(shard_for(guild_id, self.senders.len()))
            .cloned()
            .ok_or_else(|| Error::Connect("no gateway shard is connected".into()))
    }
}

#[async_trait]
impl VoiceConnector for GatewayVoiceConnector {
    async fn join(&self, guild_id: GuildId, channel_id: ChannelId) -> Result<Arc<dyn VoiceConnection>, Error> {
        let sender = self.sender_for(guild_id)?;
        let update = UpdateVoiceState::new(guild_marker(guild_id)?, Some(channel_marker(channel_id)?), true, false);
        sender
            .command(&update)
            .map_err(|e| Error::Connect(format!("voice join for guild {guild_id}: {e}")))?;
        debug!("Requested voice join {} in guild {}", channel_id, guild_id);

        Ok(Arc::new(GatewayVoiceConnection {
            guild_id,
            channel_id,
            sender,
        }))
    }
}

pub struct GatewayVoiceConnection {
    guild_id: GuildId,
    channel_id: ChannelId,
    sender: MessageSender,
}

impl fmt::Debug for GatewayVoiceConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayVoiceConnection")
            .field("guild_id", &self.guild_id)
            .field("channel_id", &self.channel_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VoiceConnection for GatewayVoiceConnection {
    fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    async fn disconnect(&self) -> Result<(), Error> {
        let update = UpdateVoiceState::new(guild_marker(self.guild_id)?, None::<Id<ChannelMarker>>, false, false);
        self.sender
            .command(&update)
            .map_err(|e| Error::Platform(format!("voice leave for guild {}: {}", self.guild_id, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_routing_uses_timestamp_bits() {
        let guild = GuildId(41771983423143937);
        assert_eq!(shard_for(guild, 1), 0);
        assert_eq!(shard_for(guild, 2), ((41771983423143937u64 >> 22) % 2) as usize);
        assert_eq!(shard_for(guild, 0), 0);
    }

    #[tokio::test]
    async fn join_without_shards_fails_to_connect() {
        let connector = GatewayVoiceConnector::new(Vec::new());
        let err = connector.join(GuildId(1), ChannelId(2)).await.unwrap_err();
        assert!(matches!(err, Error::Connect(_)));
    }
}
