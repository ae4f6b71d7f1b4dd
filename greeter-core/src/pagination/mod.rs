//! src/pagination/mod.rs
//!
//! Per-message paging state for listings, upload results and delete menus.
//! States are keyed by the id of the message that displays them and expire
//! after a TTL, matching the lifetime of the message itself.

pub mod window;
pub mod pages;

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use greeter_common::error::Error;
use greeter_common::models::{MessageId, NavButtons, Page, PageAction, RenderedPage, SelectMenuView, SelectOption};

pub use window::{SelectWindow, TRACKS_PER_PAGE};

/// Messages disappear after two minutes, and their state with them.
pub const DEFAULT_PAGINATION_TTL: Duration = Duration::from_secs(120);

/// Items a delete menu lets the user pick from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selectable {
    pub custom_id: String,
    pub options: Vec<SelectOption>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    pages: Vec<Page>,
    current_page: usize,
    selectable: Option<Selectable>,
    window: SelectWindow,
}

impl PaginationState {
    /// Fails with `NotFound` for an empty page list; there is nothing to show.
    pub fn new(pages: Vec<Page>) -> Result<Self, Error> {
        if pages.is_empty() {
            return Err(Error::NotFound("no pages to paginate".into()));
        }
        Ok(Self {
            pages,
            current_page: 0,
            selectable: None,
            window: SelectWindow::default(),
        })
    }

    /// A delete menu: pages plus selectable items, starting at `[0, min(4, n))`.
    pub fn with_selectable(pages: Vec<Page>, selectable: Selectable) -> Result<Self, Error> {
        let mut state = Self::new(pages)?;
        state.window = SelectWindow::first(selectable.options.len());
        state.selectable = Some(selectable);
        Ok(state)
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn selectable(&self) -> Option<&Selectable> {
        self.selectable.as_ref()
    }

    pub fn window(&self) -> SelectWindow {
        self.window
    }

    /// Single pages without a select menu never need follow-up interactions.
    pub fn is_interactive(&self) -> bool {
        self.pages.len() > 1 || self.selectable.is_some()
    }

    fn items_on(&self, page: usize) -> usize {
        self.pages.get(page).map(Page::item_count).unwrap_or(0)
    }

    /// Moves to the page `action` points at and slides the select window with it.
    pub fn apply(&mut self, action: PageAction) {
        let len = self.pages.len();
        let last = len - 1;
        let previous = self.current_page;
        let target = match action {
            PageAction::First => 0,
            PageAction::Last => last,
            PageAction::Prev => (previous + len - 1) % len,
            PageAction::Next => (previous + 1) % len,
        };
        self.current_page = target;

        let Some(selectable) = &self.selectable else {
            return;
        };
        let total = selectable.options.len();
        self.window = if target == 0 {
            SelectWindow::first(total)
        } else if target == last {
            SelectWindow::last(total, self.items_on(last))
        } else {
            match action {
                PageAction::Next => self.window.next(total, self.items_on(target)),
                PageAction::Prev => self.window.prev(total, self.items_on(target), self.items_on(previous)),
                PageAction::First | PageAction::Last => self.window,
            }
        };
    }

    pub fn render(&self) -> RenderedPage {
        let select = self.selectable.as_ref().map(|s| {
            let options: Vec<SelectOption> = s
                .options
                .get(self.window.range())
                .map(<[SelectOption]>::to_vec)
                .unwrap_or_default();
            SelectMenuView {
                custom_id: s.custom_id.clone(),
                max_values: options.len(),
                options,
            }
        });
        RenderedPage {
            page: self.pages[self.current_page].clone(),
            page_index: self.current_page,
            page_count: self.pages.len(),
            buttons: NavButtons::for_position(self.current_page, self.pages.len()),
            select,
        }
    }
}

struct TrackedState {
    state: PaginationState,
    expires_at: Instant,
}

/// Message id -> pagination state. Independent of the guild registry lock.
pub struct PaginationEngine {
    states: DashMap<MessageId, TrackedState>,
    default_ttl: Duration,
}

impl Default for PaginationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_PAGINATION_TTL)
    }
}

impl PaginationEngine {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            states: DashMap::new(),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn register(&self, message_id: MessageId, state: PaginationState) {
        self.register_with_ttl(message_id, state, self.default_ttl);
    }

    pub fn register_with_ttl(&self, message_id: MessageId, state: PaginationState, ttl: Duration) {
        debug!("Tracking pagination for message {} ({} pages)", message_id, state.page_count());
        self.states.insert(
            message_id,
            TrackedState {
                state,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    /// Applies a button press and returns what the message should now show.
    pub fn advance(&self, message_id: MessageId, action: PageAction) -> Result<RenderedPage, Error> {
        let now = Instant::now();
        {
            if let Some(mut tracked) = self.states.get_mut(&message_id) {
                if tracked.expires_at > now {
                    tracked.state.apply(action);
                    return Ok(tracked.state.render());
                }
            }
        }
        // Expired entries are dropped on sight.
        self.states.remove_if(&message_id, |_, t| t.expires_at <= now);
        Err(Error::UnknownMessage(format!("no pagination state for message {message_id}")))
    }

    /// The page currently shown, without moving.
    pub fn current(&self, message_id: MessageId) -> Result<RenderedPage, Error> {
        let now = Instant::now();
        match self.states.get(&message_id) {
            Some(tracked) if tracked.expires_at > now => Ok(tracked.state.render()),
            _ => Err(Error::UnknownMessage(format!("no pagination state for message {message_id}"))),
        }
    }

    pub fn evict(&self, message_id: MessageId) -> bool {
        self.states.remove(&message_id).is_some()
    }

    /// Drops every expired state and returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.states.len();
        self.states.retain(|_, t| t.expires_at > now);
        before.saturating_sub(self.states.len())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(title: &str, items: usize) -> Page {
        (0..items).fold(Page::new(title, 0x2ECC71), |p, i| p.field(format!("#{i}"), "x"))
    }

    fn options(n: usize) -> Vec<SelectOption> {
        (0..n)
            .map(|i| SelectOption {
                label: format!("Voiceline {}", i + 1),
                value: format!("track-{i}"),
            })
            .collect()
    }

    fn delete_menu(total: usize, sizes: &[usize]) -> PaginationState {
        let pages = sizes.iter().enumerate().map(|(i, n)| page(&format!("P{i}"), *n)).collect();
        PaginationState::with_selectable(
            pages,
            Selectable {
                custom_id: "7|welcomeIntros".into(),
                options: options(total),
            },
        )
        .unwrap()
    }

    fn values(rendered: &RenderedPage) -> Vec<String> {
        rendered
            .select
            .as_ref()
            .map(|s| s.options.iter().map(|o| o.value.clone()).collect())
            .unwrap_or_default()
    }

    #[test]
    fn navigation_wraps_around() {
        let mut state = PaginationState::new(vec![page("P0", 1), page("P1", 1), page("P2", 1)]).unwrap();
        state.apply(PageAction::Prev);
        assert_eq!(state.current_page(), 2);
        state.apply(PageAction::Next);
        assert_eq!(state.current_page(), 0);
        state.apply(PageAction::Last);
        assert_eq!(state.current_page(), 2);
        state.apply(PageAction::First);
        assert_eq!(state.current_page(), 0);
    }

    #[test]
    fn buttons_track_the_current_page() {
        let mut state = PaginationState::new(vec![page("P0", 1), page("P1", 1), page("P2", 1)]).unwrap();
        let r = state.render();
        assert!(r.buttons.first_disabled && r.buttons.prev_disabled && !r.buttons.next_disabled);
        state.apply(PageAction::Next);
        let r = state.render();
        assert_eq!(r.buttons, NavButtons::default());
        state.apply(PageAction::Next);
        let r = state.render();
        assert!(r.buttons.next_disabled && r.buttons.last_disabled && !r.buttons.prev_disabled);
    }

    #[test]
    fn empty_page_list_is_rejected() {
        assert!(PaginationState::new(Vec::new()).unwrap_err().is_not_found());
    }

    #[test]
    fn window_slides_with_pages() {
        let mut state = delete_menu(10, &[4, 4, 2]);
        assert_eq!(state.window().range(), 0..4);
        assert_eq!(state.render().select.unwrap().max_values, 4);

        state.apply(PageAction::Next);
        assert_eq!(state.window().range(), 4..8);
        state.apply(PageAction::Next);
        assert_eq!(state.window().range(), 8..10);
        assert_eq!(values(&state.render()), vec!["track-8", "track-9"]);
        state.apply(PageAction::Prev);
        assert_eq!(state.window().range(), 4..8);
        state.apply(PageAction::Last);
        assert_eq!(state.window().range(), 8..10);
        state.apply(PageAction::First);
        assert_eq!(state.window().range(), 0..4);
    }

    #[test]
    fn wrapping_lands_on_edge_windows() {
        let mut state = delete_menu(10, &[4, 4, 2]);
        state.apply(PageAction::Prev);
        assert_eq!(state.current_page(), 2);
        assert_eq!(state.window().range(), 8..10);
        state.apply(PageAction::Next);
        assert_eq!(state.current_page(), 0);
        assert_eq!(state.window().range(), 0..4);
    }

    #[test]
    fn window_never_leaves_bounds() {
        let sizes = [4, 4, 4, 3];
        let total = 15;
        let mut state = delete_menu(total, &sizes);
        let script = [
            PageAction::Next,
            PageAction::Next,
            PageAction::Prev,
            PageAction::Last,
            PageAction::Prev,
            PageAction::Prev,
            PageAction::Next,
            PageAction::Next,
            PageAction::Next,
            PageAction::Prev,
        ];
        for action in script {
            state.apply(action);
            let w = state.window();
            assert!(w.start <= w.end && w.end <= total, "{action}: {w:?}");
            assert!(w.len() <= TRACKS_PER_PAGE);
            assert_eq!(w.len(), sizes[state.current_page()], "{action} landed on {}", state.current_page());
        }
    }

    #[tokio::test]
    async fn unknown_and_evicted_messages() {
        let engine = PaginationEngine::default();
        let err = engine.advance(MessageId(1), PageAction::Next).unwrap_err();
        assert!(matches!(err, Error::UnknownMessage(_)));

        engine.register(MessageId(1), PaginationState::new(vec![page("A", 1), page("B", 1)]).unwrap());
        let rendered = engine.advance(MessageId(1), PageAction::Next).unwrap();
        assert_eq!(rendered.page.title, "B");
        assert_eq!(rendered.page_count, 2);

        assert!(engine.evict(MessageId(1)));
        assert!(engine.advance(MessageId(1), PageAction::Next).is_err());
        assert!(!engine.evict(MessageId(1)));
    }

    #[tokio::test(start_paused = true)]
    async fn states_expire_after_ttl() {
        let engine = PaginationEngine::new(Duration::from_secs(120));
        engine.register(MessageId(5), PaginationState::new(vec![page("A", 1), page("B", 1)]).unwrap());
        engine.register_with_ttl(
            MessageId(6),
            PaginationState::new(vec![page("A", 1), page("B", 1)]).unwrap(),
            Duration::from_secs(600),
        );

        tokio::time::advance(Duration::from_secs(121)).await;
        assert!(matches!(
            engine.advance(MessageId(5), PageAction::Next),
            Err(Error::UnknownMessage(_))
        ));
        assert!(engine.current(MessageId(6)).is_ok());
        assert_eq!(engine.len(), 1);

        tokio::time::advance(Duration::from_secs(600)).await;
        assert_eq!(engine.sweep_expired(), 1);
        assert!(engine.is_empty());
    }
}
