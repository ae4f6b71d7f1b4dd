// src/lib.rs

pub mod playback;
pub mod pagination;
pub mod services;
pub mod staging;
pub mod stores;
pub mod audio;
pub mod platforms;
pub mod tasks;

pub use greeter_common::error::Error;
pub use playback::{Dispatcher, DispatcherHandle, GuildRegistry, PlaybackWorker};
pub use pagination::{PaginationEngine, PaginationState};
