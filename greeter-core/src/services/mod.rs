pub mod track_service;
pub mod blacklist_service;
pub mod voice_state_service;
pub mod greeter_service;

pub use track_service::TrackService;
pub use blacklist_service::BlacklistService;
pub use voice_state_service::{SkipReason, VoiceOutcome, VoiceStateService};
pub use greeter_service::{DeleteConfirmation, GreeterService};
