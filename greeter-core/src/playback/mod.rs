//! src/playback/mod.rs
//!
//! Guild playback scheduler: per-guild FIFO queues held by the [`GuildRegistry`],
//! one global [`Dispatcher`] loop, and one [`PlaybackWorker`] task per ready signal.

pub mod queue;
pub mod registry;
pub mod dispatcher;
pub mod worker;

pub use queue::PlaybackQueue;
pub use registry::{DequeuedTrack, GuildRegistry, ReleasedGuild};
pub use dispatcher::{Dispatcher, DispatcherHandle, ReadySignal};
pub use worker::{PlaybackWorker, WorkerOutcome};
