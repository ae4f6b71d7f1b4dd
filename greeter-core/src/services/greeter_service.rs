// File: src/services/greeter_service.rs

use std::sync::Arc;

use tracing::{debug, info};

use greeter_common::error::Error;
use greeter_common::models::{
    ChannelId, GuildId, MessageId, Page, PageAction, RenderedPage, SelectMenuView, TrackCategory, UploadedFile,
    UserId,
};

use crate::pagination::pages;
use crate::pagination::{PaginationEngine, PaginationState, Selectable};
use crate::services::blacklist_service::BlacklistService;
use crate::services::track_service::TrackService;
use crate::services::voice_state_service::{VoiceOutcome, VoiceStateService};

/// Result of a finished delete menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub deleted: usize,
    pub page: Page,
}

/// What the command layer talks to.
pub struct GreeterService {
    voice: Arc<VoiceStateService>,
    tracks: Arc<TrackService>,
    blacklist: Arc<BlacklistService>,
    pagination: Arc<PaginationEngine>,
}

impl GreeterService {
    pub fn new(
        voice: Arc<VoiceStateService>,
        tracks: Arc<TrackService>,
        blacklist: Arc<BlacklistService>,
        pagination: Arc<PaginationEngine>,
    ) -> Self {
        Self {
            voice,
            tracks,
            blacklist,
            pagination,
        }
    }

    /// Raw voice-state update from the gateway.
    pub async fn on_voice_state(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        before: Option<ChannelId>,
        after: Option<ChannelId>,
        is_bot: bool,
    ) -> VoiceOutcome {
        self.voice.on_voice_state(guild_id, user_id, before, after, is_bot).await
    }

    pub async fn on_voice_join(&self, guild_id: GuildId, channel_id: ChannelId, user_id: UserId) -> VoiceOutcome {
        self.voice.on_voice_join(guild_id, channel_id, user_id).await
    }

    pub async fn on_voice_leave(&self, guild_id: GuildId, channel_id: ChannelId, user_id: UserId) -> VoiceOutcome {
        self.voice.on_voice_leave(guild_id, channel_id, user_id).await
    }

    /// Stores an attachment as tracks of `owner`. Returns one signed URL per track.
    pub async fn enqueue_upload(
        &self,
        guild_id: GuildId,
        uploader: UserId,
        owner: UserId,
        category: TrackCategory,
        file: &UploadedFile,
    ) -> Result<Vec<String>, Error> {
        debug!("Upload of {} in guild {} by {} for {}", file.filename, guild_id, uploader, owner);
        self.tracks.upload(uploader, owner, category, file).await
    }

    pub fn upload_result(
        &self,
        owner_name: &str,
        uploader_name: &str,
        category: TrackCategory,
        urls: &[String],
    ) -> Result<PaginationState, Error> {
        PaginationState::new(pages::upload_result_pages(owner_name, uploader_name, category, urls))
    }

    /// Listing of signed links. A member without tracks gets a single notice page.
    pub async fn list_tracks(
        &self,
        owner: UserId,
        owner_name: &str,
        category: TrackCategory,
    ) -> Result<PaginationState, Error> {
        let links = match self.tracks.list_links(owner, category).await {
            Ok(links) => links,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        PaginationState::new(pages::track_listing_pages(owner_name, category, &links))
    }

    /// Delete menu over every track of `owner`, first window `[0, min(4, n))`.
    pub async fn open_delete_menu(
        &self,
        owner: UserId,
        owner_name: &str,
        category: TrackCategory,
    ) -> Result<PaginationState, Error> {
        let names = match self.tracks.track_names(owner, category).await {
            Ok(names) => names,
            Err(e) if e.is_not_found() => Vec::new(),
            Err(e) => return Err(e),
        };
        if names.is_empty() {
            return PaginationState::new(vec![pages::no_tracks_page(owner_name, category)]);
        }

        let options = pages::delete_menu_options(owner_name, &names);
        let menu_pages = pages::delete_menu_pages(owner_name, category, &options);
        PaginationState::with_selectable(
            menu_pages,
            Selectable {
                custom_id: SelectMenuView::custom_id_for(owner, category),
                options,
            },
        )
    }

    /// Tracks `state` under `message_id` with the default TTL.
    /// Returns false for states that have nothing to page through.
    pub fn publish(&self, message_id: MessageId, state: PaginationState) -> bool {
        if !state.is_interactive() {
            return false;
        }
        self.pagination.register(message_id, state);
        true
    }

    pub fn on_page_action(&self, message_id: MessageId, action: PageAction) -> Result<RenderedPage, Error> {
        self.pagination.advance(message_id, action)
    }

    pub fn evict(&self, message_id: MessageId) -> bool {
        self.pagination.evict(message_id)
    }

    pub async fn delete_tracks(
        &self,
        owner: UserId,
        owner_name: &str,
        deleter_name: &str,
        category: TrackCategory,
        selected: &[String],
    ) -> Result<DeleteConfirmation, Error> {
        let deleted = self.tracks.delete_tracks(owner, category, selected).await?;
        info!("{} deleted {} {} track(s) of {}", deleter_name, deleted, category, owner);
        Ok(DeleteConfirmation {
            deleted,
            page: pages::delete_confirmation_page(deleted, owner_name, deleter_name),
        })
    }

    pub async fn blacklist(&self, user: UserId) -> Result<Page, Error> {
        Ok(pages::blacklist_page(self.blacklist.add(user).await?))
    }

    pub async fn whitelist(&self, user: UserId) -> Result<Page, Error> {
        Ok(pages::whitelist_page(self.blacklist.remove(user).await?))
    }

    pub fn help() -> Page {
        pages::help_page()
    }

    /// The page a command shows when it fails.
    pub fn error_page(error: &Error) -> Page {
        match error {
            Error::UnknownMessage(_) => pages::no_longer_available_page(),
            Error::Unsupported(_) => pages::unsupported_upload_page(),
            _ => pages::unexpected_error_page(),
        }
    }
}
