//! src/platforms/discord/mod.rs
//!
//! Discord adapter on twilight: gateway shards feed voice-state events in,
//! the in-memory cache answers permission and occupancy questions, and voice
//! joins/leaves go out as gateway commands.

pub mod runtime;
pub mod gate;
pub mod voice;

use twilight_model::id::marker::{ChannelMarker, GuildMarker, UserMarker};
use twilight_model::id::Id;

use greeter_common::error::Error;
use greeter_common::models::{ChannelId, GuildId, UserId};

pub use gate::DiscordChannelGate;
pub use runtime::{DiscordPlatform, DiscordVoiceEvent};
pub use voice::{GatewayVoiceConnection, GatewayVoiceConnector};

pub(crate) fn guild_marker(id: GuildId) -> Result<Id<GuildMarker>, Error> {
    Id::new_checked(id.get()).ok_or_else(|| Error::Platform("guild id 0 is not a snowflake".into()))
}

pub(crate) fn channel_marker(id: ChannelId) -> Result<Id<ChannelMarker>, Error> {
    Id::new_checked(id.get()).ok_or_else(|| Error::Platform("channel id 0 is not a snowflake".into()))
}

pub(crate) fn from_guild(id: Id<GuildMarker>) -> GuildId {
    GuildId(id.get())
}

pub(crate) fn from_channel(id: Id<ChannelMarker>) -> ChannelId {
    ChannelId(id.get())
}

pub(crate) fn from_user(id: Id<UserMarker>) -> UserId {
    UserId(id.get())
}
