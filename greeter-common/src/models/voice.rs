// File: greeter-common/src/models/voice.rs

use serde::{Deserialize, Serialize};

use crate::models::ids::ChannelId;

/// Whether a guild currently has a worker streaming audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackStatus {
    #[default]
    NotPlaying,
    Playing,
}

/// What a single voice-state update means for greetings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTransition {
    Joined(ChannelId),
    Left(ChannelId),
    /// Channel moves, mute/deafen toggles and bot users.
    Ignored,
}

impl VoiceTransition {
    pub fn classify(before: Option<ChannelId>, after: Option<ChannelId>, is_bot: bool) -> Self {
        if is_bot {
            return VoiceTransition::Ignored;
        }
        match (before, after) {
            (None, Some(channel)) => VoiceTransition::Joined(channel),
            (Some(channel), None) => VoiceTransition::Left(channel),
            _ => VoiceTransition::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_join_and_leave() {
        let a = ChannelId(1);
        let b = ChannelId(2);
        assert_eq!(VoiceTransition::classify(None, Some(a), false), VoiceTransition::Joined(a));
        assert_eq!(VoiceTransition::classify(Some(a), None, false), VoiceTransition::Left(a));
        assert_eq!(VoiceTransition::classify(Some(a), Some(b), false), VoiceTransition::Ignored);
        assert_eq!(VoiceTransition::classify(Some(a), Some(a), false), VoiceTransition::Ignored);
        assert_eq!(VoiceTransition::classify(None, Some(a), true), VoiceTransition::Ignored);
    }
}
