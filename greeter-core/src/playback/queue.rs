// File: src/playback/queue.rs

use std::collections::VecDeque;
use std::path::PathBuf;

use greeter_common::models::PlaybackStatus;

/// Pending staged files of one guild plus its Playing/NotPlaying flag.
///
/// Not synchronized on its own; the registry lock guards every access.
#[derive(Debug, Default)]
pub struct PlaybackQueue {
    pending: VecDeque<PathBuf>,
    status: PlaybackStatus,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a staged file. Returns true iff the queue was idle and empty,
    /// meaning nobody has been asked to drain it yet.
    pub fn push(&mut self, path: PathBuf) -> bool {
        let should_signal = self.pending.is_empty() && self.status == PlaybackStatus::NotPlaying;
        self.pending.push_back(path);
        should_signal
    }

    /// Takes the next file and marks the queue Playing.
    pub fn pop(&mut self) -> Option<PathBuf> {
        let next = self.pending.pop_front()?;
        self.status = PlaybackStatus::Playing;
        Some(next)
    }

    /// Called after a track ends. Stays Playing and returns true while work remains.
    pub fn finish_track(&mut self) -> bool {
        if self.pending.is_empty() {
            self.status = PlaybackStatus::NotPlaying;
            false
        } else {
            true
        }
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Empties the queue, handing back the files that will never be played.
    pub fn drain(&mut self) -> Vec<PathBuf> {
        self.status = PlaybackStatus::NotPlaying;
        self.pending.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_push_on_idle_queue_signals() {
        let mut q = PlaybackQueue::new();
        assert!(q.push("a".into()));
        // Already has pending work, the earlier signal covers it.
        assert!(!q.push("b".into()));
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn push_while_playing_does_not_signal() {
        let mut q = PlaybackQueue::new();
        q.push("a".into());
        assert_eq!(q.pop(), Some(PathBuf::from("a")));
        assert_eq!(q.status(), PlaybackStatus::Playing);
        assert!(!q.push("b".into()));
    }

    #[test]
    fn finish_track_continues_then_goes_idle() {
        let mut q = PlaybackQueue::new();
        q.push("a".into());
        q.push("b".into());
        q.pop();
        assert!(q.finish_track());
        assert_eq!(q.status(), PlaybackStatus::Playing);
        q.pop();
        assert!(!q.finish_track());
        assert_eq!(q.status(), PlaybackStatus::NotPlaying);
        assert!(q.pop().is_none());
    }

    #[test]
    fn drain_resets_status() {
        let mut q = PlaybackQueue::new();
        q.push("a".into());
        q.push("b".into());
        q.pop();
        assert_eq!(q.drain(), vec![PathBuf::from("b")]);
        assert_eq!(q.status(), PlaybackStatus::NotPlaying);
        assert!(q.is_empty());
    }
}
