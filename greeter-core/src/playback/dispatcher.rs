// File: src/playback/dispatcher.rs

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use greeter_common::error::Error;
use greeter_common::models::GuildId;

use super::worker::{PlaybackWorker, WorkerOutcome};

/// Names a guild whose queue has work and no worker streaming it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadySignal {
    pub guild_id: GuildId,
}

/// Sending side of the dispatcher intake. Cheap to clone, never blocks.
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::UnboundedSender<ReadySignal>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl DispatcherHandle {
    pub fn signal(&self, guild_id: GuildId) -> Result<(), Error> {
        self.tx
            .send(ReadySignal { guild_id })
            .map_err(|_| Error::Dispatch(format!("dispatcher stopped, dropping signal for guild {guild_id}")))
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_tx.borrow()
    }
}

/// The single intake loop: one worker task per ready signal.
pub struct Dispatcher {
    rx: mpsc::UnboundedReceiver<ReadySignal>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Dispatcher {
    pub fn new() -> (Self, DispatcherHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = DispatcherHandle {
            tx,
            shutdown_tx: Arc::new(shutdown_tx),
        };
        (Self { rx, shutdown_rx }, handle)
    }

    pub fn spawn(self, worker: Arc<PlaybackWorker>) -> JoinHandle<()> {
        tokio::spawn(self.run(worker))
    }

    /// Runs until shutdown is requested or every handle is gone.
    pub async fn run(mut self, worker: Arc<PlaybackWorker>) {
        info!("Playback dispatcher started");
        loop {
            tokio::select! {
                changed = self.shutdown_rx.changed() => {
                    if changed.is_err() || *self.shutdown_rx.borrow() {
                        info!("Playback dispatcher received shutdown");
                        break;
                    }
                }
                maybe_signal = self.rx.recv() => {
                    let Some(signal) = maybe_signal else {
                        debug!("Dispatcher intake closed");
                        break;
                    };
                    let worker = worker.clone();
                    tokio::spawn(async move {
                        let guild_id = signal.guild_id;
                        match worker.run(guild_id).await {
                            WorkerOutcome::Dropped { continued } => {
                                warn!("Guild {} dropped a track (continued={})", guild_id, continued);
                            }
                            outcome => debug!("Guild {} worker finished: {:?}", guild_id, outcome),
                        }
                    });
                }
            }
        }
        info!("Playback dispatcher stopped");
    }
}
