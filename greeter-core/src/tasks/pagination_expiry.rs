// greeter-core/src/tasks/pagination_expiry.rs

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

use crate::pagination::PaginationEngine;

/// Spawns a background task that periodically drops expired pagination states.
pub fn spawn_pagination_expiry_task(engine: Arc<PaginationEngine>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            let removed = engine.sweep_expired();
            if removed > 0 {
                debug!("Expired {} pagination state(s), {} left", removed, engine.len());
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::PaginationState;
    use greeter_common::models::{MessageId, Page};

    #[tokio::test(start_paused = true)]
    async fn sweeper_drops_expired_states() {
        let engine = Arc::new(PaginationEngine::new(Duration::from_secs(120)));
        let pages = vec![Page::new("A", 0), Page::new("B", 0)];
        engine.register(MessageId(1), PaginationState::new(pages).unwrap());

        let task = spawn_pagination_expiry_task(engine.clone(), Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(100)).await;
        assert_eq!(engine.len(), 1);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(engine.is_empty());
        task.abort();
    }
}
