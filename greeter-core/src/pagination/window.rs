// File: src/pagination/window.rs
//
// Sliding window of selectable items shown alongside a delete menu page.

use std::ops::Range;

/// Entries per listing page, and the widest select window.
pub const TRACKS_PER_PAGE: usize = 4;

/// `[start, end)` over the selectable items. `end` is the window bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectWindow {
    pub start: usize,
    pub end: usize,
}

impl SelectWindow {
    /// Window for page 0.
    pub fn first(total: usize) -> Self {
        Self {
            start: 0,
            end: TRACKS_PER_PAGE.min(total),
        }
    }

    /// Window for the last page, which shows `last_items` entries.
    pub fn last(total: usize, last_items: usize) -> Self {
        Self {
            start: total.saturating_sub(last_items),
            end: total,
        }
    }

    /// One step forward onto a page showing `items` entries.
    pub fn next(self, total: usize, items: usize) -> Self {
        let start = self.end.min(total);
        Self {
            start,
            end: start.saturating_add(items).min(total),
        }
    }

    /// One step back onto a page showing `items` entries, leaving a page that showed `left_items`.
    pub fn prev(self, total: usize, items: usize, left_items: usize) -> Self {
        let end = self.end.min(total).saturating_sub(left_items);
        Self {
            start: end.saturating_sub(items),
            end,
        }
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
