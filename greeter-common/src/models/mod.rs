// File: greeter-common/src/models/mod.rs
pub mod ids;
pub mod track;
pub mod voice;
pub mod blacklist;
pub mod pagination;

pub use ids::{ChannelId, GuildId, MessageId, UserId};
pub use track::{FileKind, TrackCategory, TrackLink, TrackRecord, UploadedFile};
pub use voice::{PlaybackStatus, VoiceTransition};
pub use blacklist::BlacklistEntry;
pub use pagination::{NavButtons, Page, PageAction, PageField, RenderedPage, SelectMenuView, SelectOption};
