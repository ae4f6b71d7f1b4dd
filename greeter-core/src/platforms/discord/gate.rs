use std::sync::Arc;

use async_trait::async_trait;
use twilight_cache_inmemory::InMemoryCache;
use twilight_model::guild::Permissions;

use greeter_common::error::Error;
use greeter_common::models::{ChannelId, GuildId};
use greeter_common::traits::ChannelGate;

use super::channel_marker;

/// Answers permission and occupancy questions from the gateway cache.
pub struct DiscordChannelGate {
    cache: Arc<InMemoryCache>,
}

impl DiscordChannelGate {
    pub fn new(cache: Arc<InMemoryCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl ChannelGate for DiscordChannelGate {
    async fn can_connect_and_speak(&self, _guild_id: GuildId, channel_id: ChannelId) -> Result<bool, Error> {
        let me = self
            .cache
            .current_user()
            .map(|u| u.id)
            .ok_or_else(|| Error::Platform("gateway not ready, bot user unknown".into()))?;
        let permissions = self
            .cache
            .permissions()
            .in_channel(me, channel_marker(channel_id)?)
            .map_err(|e| Error::Platform(format!("permission lookup for channel {channel_id}: {e}")))?;
        Ok(permissions.contains(Permissions::CONNECT | Permissions::SPEAK))
    }

    async fn human_count(&self, _guild_id: GuildId, channel_id: ChannelId) -> Result<usize, Error> {
        let channel = channel_marker(channel_id)?;
        let Some(states) = self.cache.voice_channel_states(channel) else {
            return Ok(0);
        };
        let humans = states
            .filter(|state| {
                !self
                    .cache
                    .user(state.user_id())
                    .map(|u| u.bot)
                    .unwrap_or(false)
            })
            .count();
        Ok(humans)
    }
}
