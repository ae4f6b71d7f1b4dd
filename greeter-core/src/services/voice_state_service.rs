// File: src/services/voice_state_service.rs

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use greeter_common::error::Error;
use greeter_common::models::{ChannelId, GuildId, TrackCategory, UserId, VoiceTransition};
use greeter_common::traits::{ChannelGate, FileStaging, VoiceConnector};

use crate::playback::{DispatcherHandle, GuildRegistry, ReleasedGuild};
use crate::services::blacklist_service::BlacklistService;
use crate::services::track_service::TrackService;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Moves, mute toggles and bots.
    Ignored,
    Blacklisted,
    /// The user has no track of the needed category.
    NoTrack,
    PermissionDenied,
    /// An outro for a channel nobody is left in, with the bot not yet connected.
    EmptyChannel,
    /// Something failed on the way; already logged.
    Failed,
}

/// What a voice event led to. Nothing here is ever shown to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceOutcome {
    Queued { signalled: bool },
    Skipped(SkipReason),
    /// The last listener left and the bot disconnected.
    Released,
}

/// Turns join/leave events into queued greetings.
pub struct VoiceStateService {
    registry: Arc<GuildRegistry>,
    dispatcher: DispatcherHandle,
    tracks: Arc<TrackService>,
    blacklist: Arc<BlacklistService>,
    staging: Arc<dyn FileStaging>,
    gate: Arc<dyn ChannelGate>,
    connector: Arc<dyn VoiceConnector>,
}

impl VoiceStateService {
    pub fn new(
        registry: Arc<GuildRegistry>,
        dispatcher: DispatcherHandle,
        tracks: Arc<TrackService>,
        blacklist: Arc<BlacklistService>,
        staging: Arc<dyn FileStaging>,
        gate: Arc<dyn ChannelGate>,
        connector: Arc<dyn VoiceConnector>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            tracks,
            blacklist,
            staging,
            gate,
            connector,
        }
    }

    /// Entry point for raw voice-state updates.
    pub async fn on_voice_state(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        before: Option<ChannelId>,
        after: Option<ChannelId>,
        is_bot: bool,
    ) -> VoiceOutcome {
        match VoiceTransition::classify(before, after, is_bot) {
            VoiceTransition::Joined(channel) => self.on_voice_join(guild_id, channel, user_id).await,
            VoiceTransition::Left(channel) => self.on_voice_leave(guild_id, channel, user_id).await,
            VoiceTransition::Ignored => VoiceOutcome::Skipped(SkipReason::Ignored),
        }
    }

    pub async fn on_voice_join(&self, guild_id: GuildId, channel_id: ChannelId, user_id: UserId) -> VoiceOutcome {
        debug!("User {} joined {} in guild {}", user_id, channel_id, guild_id);
        self.greet(guild_id, channel_id, user_id, TrackCategory::Intro).await
    }

    pub async fn on_voice_leave(&self, guild_id: GuildId, channel_id: ChannelId, user_id: UserId) -> VoiceOutcome {
        debug!("User {} left {} in guild {}", user_id, channel_id, guild_id);

        if self.registry.channel_of(guild_id).await == Some(channel_id) {
            match self
                .registry
                .release_if_abandoned(guild_id, channel_id, self.gate.as_ref())
                .await
            {
                Ok(Some(released)) => {
                    self.discard_pending(released).await;
                    return VoiceOutcome::Released;
                }
                Ok(None) => {}
                Err(e) => warn!("Occupancy check for guild {} failed: {}", guild_id, e),
            }
        }

        self.greet(guild_id, channel_id, user_id, TrackCategory::Outro).await
    }

    async fn greet(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        user_id: UserId,
        category: TrackCategory,
    ) -> VoiceOutcome {
        match self.blacklist.is_blacklisted(user_id).await {
            Ok(true) => {
                debug!("User {} is blacklisted, no {}", user_id, category);
                return VoiceOutcome::Skipped(SkipReason::Blacklisted);
            }
            Ok(false) => {}
            Err(e) => warn!("Blacklist lookup for user {} failed, greeting anyway: {}", user_id, e),
        }

        let track = match self.tracks.random_track(user_id, category).await {
            Ok(track) => track,
            Err(e) if e.is_not_found() => return VoiceOutcome::Skipped(SkipReason::NoTrack),
            Err(e) => {
                error!("Could not pick a {} for user {}: {}", category, user_id, e);
                return VoiceOutcome::Skipped(SkipReason::Failed);
            }
        };

        if category == TrackCategory::Outro && self.left_behind_empty(guild_id, channel_id).await {
            debug!("Nobody left in {} for the outro of user {}", channel_id, user_id);
            return VoiceOutcome::Skipped(SkipReason::EmptyChannel);
        }

        match self.queue_track(guild_id, channel_id, &track).await {
            Ok(signalled) => {
                info!("Queued {} {} for user {} in guild {}", category, track, user_id, guild_id);
                VoiceOutcome::Queued { signalled }
            }
            Err(Error::PermissionDenied(msg)) => {
                warn!("{}", msg);
                VoiceOutcome::Skipped(SkipReason::PermissionDenied)
            }
            Err(e) => {
                error!("Could not queue {} for user {} in guild {}: {}", category, user_id, guild_id, e);
                VoiceOutcome::Skipped(SkipReason::Failed)
            }
        }
    }

    /// True when joining `channel_id` would mean connecting to an empty room.
    /// A guild that already has a connection keeps its queue regardless.
    async fn left_behind_empty(&self, guild_id: GuildId, channel_id: ChannelId) -> bool {
        if self.registry.contains(guild_id).await {
            return false;
        }
        match self.gate.human_count(guild_id, channel_id).await {
            Ok(count) => count == 0,
            Err(e) => {
                warn!("Occupancy check for channel {} in guild {} failed: {}", channel_id, guild_id, e);
                false
            }
        }
    }

    async fn queue_track(&self, guild_id: GuildId, channel_id: ChannelId, track: &str) -> Result<bool, Error> {
        if !self.registry.contains(guild_id).await
            && !self.gate.can_connect_and_speak(guild_id, channel_id).await?
        {
            return Err(Error::PermissionDenied(format!(
                "missing connect/speak permission for channel {channel_id} in guild {guild_id}"
            )));
        }
        self.registry
            .get_or_create(guild_id, channel_id, self.connector.as_ref())
            .await?;

        let data = self.tracks.download(track).await?;
        let staged = self.staging.stage(data).await?;

        match self.registry.enqueue(guild_id, staged.clone()).await {
            Ok(signal) => {
                if signal {
                    self.dispatcher.signal(guild_id)?;
                }
                Ok(signal)
            }
            Err(e) => {
                // Torn down while we were downloading.
                if let Err(del) = self.staging.delete(&staged).await {
                    warn!("Could not delete staged {}: {:?}", staged.display(), del);
                }
                Err(e)
            }
        }
    }

    async fn discard_pending(&self, released: ReleasedGuild) {
        for path in released.pending {
            if let Err(e) = self.staging.delete(&path).await {
                warn!("Could not delete queued file {}: {:?}", path.display(), e);
            }
        }
    }
}
