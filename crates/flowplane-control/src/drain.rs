//! Purging queued data from a connection before it is deleted.

use std::sync::Arc;
use std::time::Duration;

use flowplane_client::{Method, Transport};
use flowplane_core::ComponentId;
use serde::Deserialize;
use tokio::time::sleep;

use crate::error::Result;
use crate::store::EntityStore;

/// Result of a drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The control plane reported the purge finished.
    Completed {
        /// Number of status polls performed.
        attempts: u32,
    },
    /// The attempt budget ran out before the purge finished.
    Incomplete {
        /// Number of status polls performed.
        attempts: u32,
    },
}

impl DrainOutcome {
    /// Whether the purge finished.
    #[must_use]
    pub const fn is_complete(self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// Status of a purge request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropRequest {
    /// Request id.
    pub id: ComponentId,
    /// Whether the purge finished.
    #[serde(default)]
    pub finished: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DropRequestEntity {
    drop_request: DropRequest,
}

/// Issues a purge request for a connection queue and waits for it.
#[derive(Debug)]
pub struct QueueDrainer<T> {
    store: Arc<EntityStore<T>>,
    interval: Duration,
    max_attempts: u32,
}

impl<T: Transport> QueueDrainer<T> {
    /// Create a drainer polling every `interval`, at most `max_attempts` times.
    #[must_use]
    pub const fn new(store: Arc<EntityStore<T>>, interval: Duration, max_attempts: u32) -> Self {
        Self {
            store,
            interval,
            max_attempts,
        }
    }

    /// Purge the queue of `connection_id`.
    ///
    /// The purge request is deleted afterwards whether or not it finished.
    /// Failed status polls count against the attempt budget. An exhausted
    /// budget is reported as [`DrainOutcome::Incomplete`], not as an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the purge request cannot be created or deleted.
    pub async fn drain(&self, connection_id: &ComponentId) -> Result<DrainOutcome> {
        let base = format!("/flowfile-queues/{connection_id}/drop-requests");

        let created: DropRequestEntity = self.store.send_json(Method::POST, &base, None).await?;
        let request_path = format!("{base}/{}", created.drop_request.id);
        tracing::debug!(connection_id = %connection_id, request_id = %created.drop_request.id, "Drop request created");

        let mut finished = created.drop_request.finished;
        let mut attempts = 0;
        while !finished && attempts < self.max_attempts {
            attempts += 1;
            match self
                .store
                .send_json::<DropRequestEntity>(Method::GET, &request_path, None)
                .await
            {
                Ok(status) => finished = status.drop_request.finished,
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, attempt = attempts, error = %e, "Drop request poll failed");
                }
            }
            if !finished && attempts < self.max_attempts {
                sleep(self.interval).await;
            }
        }

        self.store.send(Method::DELETE, &request_path, None).await?;

        if finished {
            tracing::info!(connection_id = %connection_id, attempts, "Connection queue drained");
            Ok(DrainOutcome::Completed { attempts })
        } else {
            tracing::warn!(connection_id = %connection_id, attempts, "Connection queue not drained in time");
            Ok(DrainOutcome::Incomplete { attempts })
        }
    }
}
