use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use twilight_cache_inmemory::{InMemoryCache, ResourceType};
use twilight_gateway::{
    self as gateway, CloseFrame, Config, Event, EventTypeFlags, Intents, MessageSender, Shard, StreamExt,
};
use twilight_http::client::ClientBuilder;
use twilight_http::Client as HttpClient;
use twilight_model::gateway::payload::incoming::Ready as ReadyPayload;
use twilight_model::voice::VoiceState;

use greeter_common::error::Error;
use greeter_common::models::{ChannelId, GuildId, UserId};

use super::{from_channel, from_guild, from_user};

/// One voice-state change as the greeter sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscordVoiceEvent {
    pub guild_id: GuildId,
    pub user_id: UserId,
    pub before: Option<ChannelId>,
    pub after: Option<ChannelId>,
    pub is_bot: bool,
}

/// Reads the previous channel from the cache; must run before `cache.update`.
fn voice_event(cache: &InMemoryCache, state: &VoiceState) -> Option<DiscordVoiceEvent> {
    let guild = state.guild_id?;
    let before = cache
        .voice_state(state.user_id, guild)
        .map(|cached| from_channel(cached.channel_id()));
    let is_bot = state
        .member
        .as_ref()
        .map(|m| m.user.bot)
        .or_else(|| cache.user(state.user_id).map(|u| u.bot))
        .unwrap_or(false);

    Some(DiscordVoiceEvent {
        guild_id: from_guild(guild),
        user_id: from_user(state.user_id),
        before,
        after: state.channel_id.map(from_channel),
        is_bot,
    })
}

/// Pumps one shard: keeps the cache current and forwards voice-state changes to `tx`.
async fn shard_runner(mut shard: Shard, tx: UnboundedSender<DiscordVoiceEvent>, cache: Arc<InMemoryCache>) {
    let shard_id = shard.id().number();
    info!("Voice shard {shard_id} running");

    let wanted = EventTypeFlags::READY
        | EventTypeFlags::GUILD_CREATE
        | EventTypeFlags::GUILD_UPDATE
        | EventTypeFlags::GUILD_DELETE
        | EventTypeFlags::CHANNEL_CREATE
        | EventTypeFlags::CHANNEL_UPDATE
        | EventTypeFlags::CHANNEL_DELETE
        | EventTypeFlags::ROLE_CREATE
        | EventTypeFlags::ROLE_UPDATE
        | EventTypeFlags::ROLE_DELETE
        | EventTypeFlags::MEMBER_ADD
        | EventTypeFlags::MEMBER_UPDATE
        | EventTypeFlags::MEMBER_REMOVE
        | EventTypeFlags::VOICE_STATE_UPDATE;

    while let Some(item) = shard.next_event(wanted).await {
        let event = match item {
            Ok(event) => event,
            Err(err) => {
                error!("Voice shard {shard_id} failed to receive: {err:?}");
                continue;
            }
        };

        let voice = match &event {
            Event::VoiceStateUpdate(update) => voice_event(&cache, &update.0),
            _ => None,
        };
        cache.update(&event);

        match &event {
            Event::Ready(ready) => {
                let data: &ReadyPayload = ready.as_ref();
                info!(
                    "Shard {shard_id} => READY as {} (ID={}), {} guild(s)",
                    data.user.name,
                    data.user.id,
                    data.guilds.len()
                );
            }
            Event::VoiceStateUpdate(_) => {
                if let Some(voice) = voice {
                    debug!(
                        "Voice state: user {} in guild {} {:?} -> {:?}",
                        voice.user_id, voice.guild_id, voice.before, voice.after
                    );
                    if tx.send(voice).is_err() {
                        warn!("Shard {shard_id} => voice event receiver is gone");
                    }
                }
            }
            _ => trace!("Shard {shard_id} => cached {:?}", event.kind()),
        }
    }

    warn!("Voice shard {shard_id} stopped");
}

/// Gateway connection plus the cache every other Discord component reads from.
pub struct DiscordPlatform {
    token: String,
    rx: Mutex<Option<UnboundedReceiver<DiscordVoiceEvent>>>,
    shard_tasks: Vec<JoinHandle<()>>,
    shard_senders: Vec<MessageSender>,
    http: Option<Arc<HttpClient>>,
    cache: Arc<InMemoryCache>,
}

impl DiscordPlatform {
    pub fn new(token: String) -> Self {
        let cache = InMemoryCache::builder()
            .resource_types(
                ResourceType::GUILD
                    | ResourceType::CHANNEL
                    | ResourceType::ROLE
                    | ResourceType::MEMBER
                    | ResourceType::USER
                    | ResourceType::USER_CURRENT
                    | ResourceType::VOICE_STATE,
            )
            .build();
        Self {
            token,
            rx: Mutex::new(None),
            shard_tasks: Vec::new(),
            shard_senders: Vec::new(),
            http: None,
            cache: Arc::new(cache),
        }
    }

    pub fn cache(&self) -> Arc<InMemoryCache> {
        self.cache.clone()
    }

    pub fn http(&self) -> Option<Arc<HttpClient>> {
        self.http.clone()
    }

    /// One sender per shard, in shard order. Empty until [`connect`](Self::connect).
    pub fn shard_senders(&self) -> Vec<MessageSender> {
        self.shard_senders.clone()
    }

    pub fn is_connected(&self) -> bool {
        !self.shard_tasks.is_empty()
    }

    pub async fn connect(&mut self) -> Result<(), Error> {
        if self.is_connected() {
            debug!("Gateway already connected");
            return Ok(());
        }
        if self.token.is_empty() {
            return Err(Error::Config("Discord token is empty".into()));
        }

        let (tx, rx) = unbounded_channel::<DiscordVoiceEvent>();
        {
            let mut guard = self.rx.lock().await;
            *guard = Some(rx);
        }

        let http_client = Arc::new(
            ClientBuilder::new()
                .token(self.token.clone())
                .timeout(Duration::from_secs(30))
                .build(),
        );
        self.http = Some(http_client.clone());

        let config = Config::new(
            self.token.clone(),
            Intents::GUILDS | Intents::GUILD_VOICE_STATES | Intents::GUILD_MEMBERS,
        );
        let shards = gateway::create_recommended(&http_client, config, |_, b| b.build())
            .await
            .map_err(|e| Error::Platform(format!("starting gateway shards: {e}")))?;

        for shard in shards {
            self.shard_senders.push(shard.sender());
            let handle = tokio::spawn(shard_runner(shard, tx.clone(), self.cache.clone()));
            self.shard_tasks.push(handle);
        }
        info!("Gateway connected with {} shard(s)", self.shard_tasks.len());
        Ok(())
    }

    pub async fn disconnect(&mut self) -> Result<(), Error> {
        for sender in &self.shard_senders {
            let _ = sender.close(CloseFrame::NORMAL);
        }
        for task in &mut self.shard_tasks {
            let _ = task.await;
        }
        self.shard_senders.clear();
        self.shard_tasks.clear();

        let mut guard = self.rx.lock().await;
        *guard = None;
        Ok(())
    }

    /// Next voice-state change from any shard; `None` once disconnected.
    pub async fn next_voice_event(&self) -> Option<DiscordVoiceEvent> {
        let mut guard = self.rx.lock().await;
        match guard.as_mut() {
            Some(r) => r.recv().await,
            None => None,
        }
    }
}
