// File: greeter-common/src/models/pagination.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::models::ids::UserId;
use crate::models::track::TrackCategory;

/// Navigation buttons attached to a paginated message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageAction {
    First,
    Prev,
    Next,
    Last,
}

impl PageAction {
    /// Button order as rendered left to right.
    pub const ALL: [PageAction; 4] = [PageAction::First, PageAction::Prev, PageAction::Next, PageAction::Last];

    pub fn custom_id(&self) -> &'static str {
        match self {
            PageAction::First => "first",
            PageAction::Prev => "prev",
            PageAction::Next => "next",
            PageAction::Last => "last",
        }
    }
}

impl fmt::Display for PageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.custom_id())
    }
}

impl FromStr for PageAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(PageAction::First),
            "prev" => Ok(PageAction::Prev),
            "next" => Ok(PageAction::Next),
            "last" => Ok(PageAction::Last),
            other => Err(Error::Parse(format!("not a page action: '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageField {
    pub name: String,
    pub value: String,
}

/// One renderable page (an embed, on Discord).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub title: String,
    pub description: Option<String>,
    pub color: u32,
    pub fields: Vec<PageField>,
    pub footer: Option<String>,
}

impl Page {
    pub fn new(title: impl Into<String>, color: u32) -> Self {
        Self {
            title: title.into(),
            description: None,
            color,
            fields: Vec::new(),
            footer: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(PageField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Number of selectable entries this page shows.
    pub fn item_count(&self) -> usize {
        self.fields.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NavButtons {
    pub first_disabled: bool,
    pub prev_disabled: bool,
    pub next_disabled: bool,
    pub last_disabled: bool,
}

impl NavButtons {
    pub fn for_position(current: usize, page_count: usize) -> Self {
        let at_start = current == 0;
        let at_end = current + 1 >= page_count;
        Self {
            first_disabled: at_start,
            prev_disabled: at_start,
            next_disabled: at_end,
            last_disabled: at_end,
        }
    }

    pub fn is_disabled(&self, action: PageAction) -> bool {
        match action {
            PageAction::First => self.first_disabled,
            PageAction::Prev => self.prev_disabled,
            PageAction::Next => self.next_disabled,
            PageAction::Last => self.last_disabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub label: String,
    pub value: String,
}

/// The multi-select control of a delete menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectMenuView {
    pub custom_id: String,
    pub options: Vec<SelectOption>,
    pub max_values: usize,
}

impl SelectMenuView {
    pub fn custom_id_for(owner: UserId, category: TrackCategory) -> String {
        format!("{}|{}", owner, category.collection())
    }

    pub fn parse_custom_id(custom_id: &str) -> Option<(UserId, TrackCategory)> {
        let (owner, collection) = custom_id.split_once('|')?;
        let owner = owner.parse().ok()?;
        let category = TrackCategory::from_collection(collection)?;
        Some((owner, category))
    }
}

/// What the command layer needs to redraw a paginated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub page: Page,
    pub page_index: usize,
    pub page_count: usize,
    pub buttons: NavButtons,
    pub select: Option<SelectMenuView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_round_trip_through_custom_id() {
        for action in PageAction::ALL {
            assert_eq!(action.custom_id().parse::<PageAction>().unwrap(), action);
        }
        assert!("123|welcomeIntros".parse::<PageAction>().is_err());
    }

    #[test]
    fn buttons_follow_position() {
        let first = NavButtons::for_position(0, 3);
        assert!(first.first_disabled && first.prev_disabled);
        assert!(!first.next_disabled && !first.last_disabled);

        let last = NavButtons::for_position(2, 3);
        assert!(!last.prev_disabled);
        assert!(last.next_disabled && last.last_disabled);

        let only = NavButtons::for_position(0, 1);
        assert!(PageAction::ALL.iter().all(|a| only.is_disabled(*a)));
    }

    #[test]
    fn select_custom_id_parses_back() {
        let id = SelectMenuView::custom_id_for(UserId(99), TrackCategory::Outro);
        assert_eq!(id, "99|byeOutros");
        assert_eq!(SelectMenuView::parse_custom_id(&id), Some((UserId(99), TrackCategory::Outro)));
        assert_eq!(SelectMenuView::parse_custom_id("next"), None);
    }
}
