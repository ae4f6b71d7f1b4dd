// File: src/playback/registry.rs

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use greeter_common::error::Error;
use greeter_common::models::{ChannelId, GuildId, PlaybackStatus};
use greeter_common::traits::{ChannelGate, VoiceConnection, VoiceConnector};

use super::queue::PlaybackQueue;

struct GuildEntry {
    /// Distinguishes this entry from earlier ones for the same guild.
    epoch: u64,
    connection: Arc<dyn VoiceConnection>,
    queue: PlaybackQueue,
}

/// A track handed to a worker, tied to the entry it was taken from.
#[derive(Debug, Clone)]
pub struct DequeuedTrack {
    pub path: PathBuf,
    pub connection: Arc<dyn VoiceConnection>,
    pub epoch: u64,
}

/// What is left of a guild after it was taken out of the registry.
#[derive(Debug)]
pub struct ReleasedGuild {
    pub connection: Arc<dyn VoiceConnection>,
    /// Staged files that were queued but never played. The caller deletes them.
    pub pending: Vec<PathBuf>,
}

/// Guild id -> voice connection + playback queue.
///
/// Every mutation takes the exclusive lock; lookups take the shared one.
/// No guard is ever held across a download or an encode.
#[derive(Default)]
pub struct GuildRegistry {
    guilds: RwLock<HashMap<GuildId, GuildEntry>>,
    next_epoch: AtomicU64,
}

impl GuildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the guild's connection, joining `channel_id` first if the guild has no entry.
    ///
    /// The join runs under the exclusive lock so two concurrent events for a fresh
    /// guild produce exactly one connection.
    pub async fn get_or_create(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        connector: &dyn VoiceConnector,
    ) -> Result<Arc<dyn VoiceConnection>, Error> {
        {
            let guilds = self.guilds.read().await;
            if let Some(entry) = guilds.get(&guild_id) {
                return Ok(entry.connection.clone());
            }
        }

        let mut guilds = self.guilds.write().await;
        if let Some(entry) = guilds.get(&guild_id) {
            return Ok(entry.connection.clone());
        }

        let connection = connector
            .join(guild_id, channel_id)
            .await
            .map_err(|e| match e {
                Error::Connect(_) => e,
                other => Error::Connect(format!("joining {channel_id} in guild {guild_id}: {other}")),
            })?;

        info!("Joined voice channel {} in guild {}", channel_id, guild_id);
        guilds.insert(
            guild_id,
            GuildEntry {
                epoch: self.next_epoch.fetch_add(1, Ordering::Relaxed),
                connection: connection.clone(),
                queue: PlaybackQueue::new(),
            },
        );
        Ok(connection)
    }

    /// Appends a staged file. `Ok(true)` means the caller must send a ready signal.
    pub async fn enqueue(&self, guild_id: GuildId, path: PathBuf) -> Result<bool, Error> {
        let mut guilds = self.guilds.write().await;
        let entry = guilds
            .get_mut(&guild_id)
            .ok_or_else(|| Error::NotFound(format!("guild {guild_id} has no playback entry")))?;
        let should_signal = entry.queue.push(path);
        debug!(
            "Enqueued track for guild {} (queued={}, signal={})",
            guild_id,
            entry.queue.len(),
            should_signal
        );
        Ok(should_signal)
    }

    /// Pops the next staged file and marks the guild Playing.
    pub async fn dequeue(&self, guild_id: GuildId) -> Option<DequeuedTrack> {
        let mut guilds = self.guilds.write().await;
        let entry = guilds.get_mut(&guild_id)?;
        let path = entry.queue.pop()?;
        Some(DequeuedTrack {
            path,
            connection: entry.connection.clone(),
            epoch: entry.epoch,
        })
    }

    /// Ends a track taken from entry `epoch`. `true` means more work is queued and
    /// the caller must re-signal.
    ///
    /// If the guild vanished or was torn down and re-created meanwhile, the track
    /// belonged to a dead entry: nothing is touched and `false` is returned.
    pub async fn mark_idle_or_continue(&self, guild_id: GuildId, epoch: u64) -> bool {
        let mut guilds = self.guilds.write().await;
        match guilds.get_mut(&guild_id) {
            Some(entry) if entry.epoch == epoch => entry.queue.finish_track(),
            Some(_) => {
                debug!("Stale track end for guild {} (epoch {}) ignored", guild_id, epoch);
                false
            }
            None => false,
        }
    }

    /// Takes the guild out of the registry. The connection is not closed here.
    pub async fn remove(&self, guild_id: GuildId) -> Option<ReleasedGuild> {
        let mut guilds = self.guilds.write().await;
        let mut entry = guilds.remove(&guild_id)?;
        Some(ReleasedGuild {
            connection: entry.connection,
            pending: entry.queue.drain(),
        })
    }

    /// Tears the guild down if the bot sits in `channel_id` and no human is left there.
    ///
    /// The occupancy check, the removal and the disconnect happen inside one
    /// exclusive lock window, so a join racing with the last leave either sees the
    /// old entry or none at all.
    pub async fn release_if_abandoned(
        &self,
        guild_id: GuildId,
        channel_id: ChannelId,
        gate: &dyn ChannelGate,
    ) -> Result<Option<ReleasedGuild>, Error> {
        let mut guilds = self.guilds.write().await;

        let Some(entry) = guilds.get(&guild_id) else {
            return Ok(None);
        };
        if entry.connection.channel_id() != channel_id {
            return Ok(None);
        }
        if gate.human_count(guild_id, channel_id).await? > 0 {
            return Ok(None);
        }

        let Some(mut entry) = guilds.remove(&guild_id) else {
            return Ok(None);
        };
        if let Err(e) = entry.connection.disconnect().await {
            warn!("Disconnect from guild {} failed: {:?}", guild_id, e);
        }
        info!("Left voice channel {} in guild {} (no listeners)", channel_id, guild_id);

        Ok(Some(ReleasedGuild {
            connection: entry.connection,
            pending: entry.queue.drain(),
        }))
    }

    pub async fn contains(&self, guild_id: GuildId) -> bool {
        self.guilds.read().await.contains_key(&guild_id)
    }

    pub async fn status(&self, guild_id: GuildId) -> Option<PlaybackStatus> {
        self.guilds.read().await.get(&guild_id).map(|e| e.queue.status())
    }

    pub async fn queued_len(&self, guild_id: GuildId) -> usize {
        self.guilds
            .read()
            .await
            .get(&guild_id)
            .map(|e| e.queue.len())
            .unwrap_or(0)
    }

    /// Voice channel the bot currently occupies in `guild_id`.
    pub async fn channel_of(&self, guild_id: GuildId) -> Option<ChannelId> {
        self.guilds
            .read()
            .await
            .get(&guild_id)
            .map(|e| e.connection.channel_id())
    }

    pub async fn guild_count(&self) -> usize {
        self.guilds.read().await.len()
    }

    /// Empties the registry, e.g. on shutdown. Connections are not closed here.
    pub async fn drain(&self) -> Vec<ReleasedGuild> {
        let mut guilds = self.guilds.write().await;
        guilds
            .drain()
            .map(|(_, mut entry)| ReleasedGuild {
                pending: entry.queue.drain(),
                connection: entry.connection,
            })
            .collect()
    }
}
