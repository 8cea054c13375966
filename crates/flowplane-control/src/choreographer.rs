//! Multi-component sequences for changing and removing connections.
//!
//! The control plane only accepts structural changes to a connection while
//! both of its endpoints are stopped, and only deletes a connection whose
//! queue is empty. The choreographer orders the required steps:
//!
//! ```text
//! update:  lock ─▶ refresh ─▶ stop src ─▶ stop dst ─▶ PUT ─▶ start src ─▶ start dst
//! delete:  lock ─▶ refresh ─▶ stop src ─▶ stop dst ─▶ drain ─▶ refresh ─▶ DELETE
//!                                                        └──────▶ start src ─▶ start dst
//! ```
//!
//! A failure while stopping aborts before anything is mutated. Restarts are
//! best-effort: a failure is logged and the sequence's own result stands.

use std::sync::Arc;

use flowplane_client::Transport;
use flowplane_core::{ComponentId, ResourceKind};

use crate::config::ControlConfig;
use crate::drain::{DrainOutcome, QueueDrainer};
use crate::endpoint::{Endpoint, EndpointHandle};
use crate::entity::Entity;
use crate::error::{ControlError, Result};
use crate::lock::CrossResourceLock;
use crate::poller::ConvergencePoller;
use crate::store::EntityStore;
use crate::types::{Connection, ConnectionSpec};

/// How a connection deletion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRemoval {
    /// The connection was deleted by this call.
    Deleted,
    /// The connection did not exist when the sequence started.
    AlreadyGone,
}

/// Runs connection update and delete sequences under the cross-resource lock.
pub struct Choreographer<T> {
    store: Arc<EntityStore<T>>,
    poller: ConvergencePoller<T>,
    drainer: QueueDrainer<T>,
    lock: Arc<dyn CrossResourceLock>,
    proceed_on_incomplete_drain: bool,
}

impl<T: Transport> Choreographer<T> {
    /// Create a choreographer.
    #[must_use]
    pub fn new(
        store: Arc<EntityStore<T>>,
        lock: Arc<dyn CrossResourceLock>,
        config: &ControlConfig,
    ) -> Self {
        Self {
            poller: ConvergencePoller::new(Arc::clone(&store), config.poll_settings()),
            drainer: QueueDrainer::new(
                Arc::clone(&store),
                config.drain_interval(),
                config.drain_max_attempts,
            ),
            store,
            lock,
            proceed_on_incomplete_drain: config.proceed_on_incomplete_drain,
        }
    }

    /// Apply `spec` to the live connection.
    ///
    /// Returns `None` if the connection no longer exists.
    ///
    /// # Errors
    ///
    /// Returns the first error from stopping an endpoint (nothing is mutated
    /// in that case) or the error from the update itself. Endpoints are
    /// restarted in both cases where the update was attempted.
    pub async fn update_connection(
        &self,
        id: &ComponentId,
        spec: &ConnectionSpec,
    ) -> Result<Option<Entity<Connection>>> {
        let _guard = self.lock.acquire("update_connection").await;

        let Some(mut connection) = self.fetch_live(id).await? else {
            return Ok(None);
        };

        let mut handles = vec![
            connection.component.source.clone(),
            connection.component.destination.clone(),
        ];
        for handle in [spec.source.as_ref(), spec.destination.as_ref()]
            .into_iter()
            .flatten()
        {
            if !handles.contains(handle) {
                handles.push(handle.clone());
            }
        }

        let mut endpoints = self.stop_endpoints(id, &handles).await?;

        spec.apply(&mut connection.component);
        let result = self.store.update(&mut connection).await;
        match &result {
            Ok(()) => {
                tracing::info!(connection_id = %id, revision = %connection.revision, "Connection updated");
            }
            Err(e) => tracing::error!(connection_id = %id, error = %e, "Connection update failed"),
        }

        self.start_endpoints(id, &mut endpoints).await;
        result.map(|()| Some(connection))
    }

    /// Drain and delete the connection.
    ///
    /// # Errors
    ///
    /// Returns the first error from stopping an endpoint (nothing is mutated
    /// in that case), or from draining or deleting. Endpoints are restarted
    /// whether draining and deleting succeeded or not.
    pub async fn delete_connection(&self, id: &ComponentId) -> Result<ConnectionRemoval> {
        let _guard = self.lock.acquire("delete_connection").await;

        let Some(connection) = self.fetch_live(id).await? else {
            return Ok(ConnectionRemoval::AlreadyGone);
        };

        let handles = [
            connection.component.source.clone(),
            connection.component.destination.clone(),
        ];
        let mut endpoints = self.stop_endpoints(id, &handles).await?;

        let result = self.drain_and_delete(id).await;
        if let Err(e) = &result {
            tracing::error!(connection_id = %id, error = %e, "Connection delete failed");
        }

        self.start_endpoints(id, &mut endpoints).await;
        result
    }

    async fn fetch_live(&self, id: &ComponentId) -> Result<Option<Entity<Connection>>> {
        match self.store.get(ResourceKind::Connection, id).await {
            Ok(connection) => Ok(Some(connection)),
            Err(e) if e.is_not_found() => {
                tracing::info!(connection_id = %id, "Connection no longer exists");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn drain_and_delete(&self, id: &ComponentId) -> Result<ConnectionRemoval> {
        if let DrainOutcome::Incomplete { attempts } = self.drainer.drain(id).await? {
            if !self.proceed_on_incomplete_drain {
                return Err(ControlError::DrainIncomplete {
                    connection_id: id.clone(),
                    attempts,
                });
            }
            tracing::warn!(connection_id = %id, attempts, "Deleting connection with an incomplete drain");
        }

        // Draining may have advanced the revision
        let Some(mut connection) = self.fetch_live(id).await? else {
            return Ok(ConnectionRemoval::AlreadyGone);
        };
        self.store.delete(&mut connection).await?;

        tracing::info!(connection_id = %id, "Connection deleted");
        Ok(ConnectionRemoval::Deleted)
    }

    async fn stop_endpoints(
        &self,
        connection_id: &ComponentId,
        handles: &[EndpointHandle],
    ) -> Result<Vec<(EndpointHandle, Endpoint)>> {
        let mut endpoints = Vec::with_capacity(handles.len());
        for handle in handles {
            endpoints.push((handle.clone(), handle.resolve(&self.store).await?));
        }

        for (handle, endpoint) in &mut endpoints {
            tracing::debug!(connection_id = %connection_id, endpoint = %handle, "Stopping endpoint");
            if let Err(e) = endpoint.stop(&self.poller).await {
                tracing::error!(connection_id = %connection_id, endpoint = %handle, error = %e, "Failed to stop endpoint");
                return Err(e);
            }
        }

        Ok(endpoints)
    }

    async fn start_endpoints(
        &self,
        connection_id: &ComponentId,
        endpoints: &mut [(EndpointHandle, Endpoint)],
    ) {
        for (handle, endpoint) in endpoints {
            tracing::debug!(connection_id = %connection_id, endpoint = %handle, "Starting endpoint");
            if let Err(e) = endpoint.start(&self.poller).await {
                tracing::warn!(connection_id = %connection_id, endpoint = %handle, error = %e, "Failed to restart endpoint");
            }
        }
    }
}

impl<T> std::fmt::Debug for Choreographer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Choreographer")
            .field("proceed_on_incomplete_drain", &self.proceed_on_incomplete_drain)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::{LockEvent, ProcessLock, RecordingLock};
    use crate::mock::{MockControlPlane, RecordedCall};
    use crate::endpoint::EndpointKind;
    use crate::types::Position;
    use flowplane_client::Method;

    type Mock = Arc<MockControlPlane>;

    struct Fixture {
        mock: Mock,
        choreographer: Choreographer<Mock>,
        a: ComponentId,
        b: ComponentId,
        connection: ComponentId,
    }

    fn fixture_with(mock: MockControlPlane, lock: Arc<dyn CrossResourceLock>, config: &ControlConfig) -> Fixture {
        let mock = Arc::new(mock);
        let a = mock.seed_processor("root", "RUNNING");
        let b = mock.seed_processor("root", "RUNNING");
        let connection = mock.seed_connection("root", &a, &b);
        mock.clear_calls();

        let store = Arc::new(EntityStore::new(Arc::clone(&mock)));
        Fixture {
            choreographer: Choreographer::new(store, lock, config),
            mock,
            a,
            b,
            connection,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(MockControlPlane::new(), Arc::new(ProcessLock::new()), &ControlConfig::default())
    }

    /// Mutating calls in order, with transitions shown as their target state.
    fn mutations(calls: &[RecordedCall]) -> Vec<String> {
        calls
            .iter()
            .filter(|c| c.method != Method::GET)
            .map(|c| match c.requested_state() {
                Some(state) => format!("{state} {}", c.path),
                None => format!("{} {}", c.method, c.path),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn update_stops_mutates_then_restarts() {
        let f = fixture();
        let spec = ConnectionSpec::default().with_object_threshold(2000);

        let updated = f
            .choreographer
            .update_connection(&f.connection, &spec)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.component.back_pressure_object_threshold, Some(2000));
        assert_eq!(
            mutations(&f.mock.calls()),
            vec![
                format!("STOPPED /processors/{}", f.a),
                format!("STOPPED /processors/{}", f.b),
                format!("PUT /connections/{}", f.connection),
                format!("RUNNING /processors/{}", f.a),
                format!("RUNNING /processors/{}", f.b),
            ]
        );
        assert_eq!(f.mock.state_of(ResourceKind::Processor, &f.a).as_deref(), Some("RUNNING"));
        assert_eq!(f.mock.state_of(ResourceKind::Processor, &f.b).as_deref(), Some("RUNNING"));
    }

    #[tokio::test(start_paused = true)]
    async fn threshold_change_happens_while_both_endpoints_are_stopped() {
        let f = fixture();
        let before = f.mock.component(ResourceKind::Connection, &f.connection).unwrap();
        assert_eq!(before["backPressureObjectThreshold"], 10000);

        // The mock refuses the PUT if either endpoint is still running
        f.choreographer
            .update_connection(&f.connection, &ConnectionSpec::default().with_object_threshold(1000))
            .await
            .unwrap();
        f.choreographer
            .update_connection(&f.connection, &ConnectionSpec::default().with_object_threshold(2000))
            .await
            .unwrap();

        let after = f.mock.component(ResourceKind::Connection, &f.connection).unwrap();
        assert_eq!(after["backPressureObjectThreshold"], 2000);
        assert_eq!(after["backPressureDataSizeThreshold"], "1 GB");
        assert_eq!(f.mock.revision_of(ResourceKind::Connection, &f.connection), Some(3));
        assert_eq!(f.mock.state_of(ResourceKind::Processor, &f.a).as_deref(), Some("RUNNING"));
        assert_eq!(f.mock.state_of(ResourceKind::Processor, &f.b).as_deref(), Some("RUNNING"));
    }

    #[tokio::test(start_paused = true)]
    async fn emptied_bends_and_relationships_are_written() {
        let f = fixture();

        f.choreographer
            .update_connection(
                &f.connection,
                &ConnectionSpec::default().with_bends(vec![Position::new(1.0, 2.0)]),
            )
            .await
            .unwrap();
        let bent = f.mock.component(ResourceKind::Connection, &f.connection).unwrap();
        assert_eq!(bent["bends"], serde_json::json!([{"x": 1.0, "y": 2.0}]));

        let cleared = f
            .choreographer
            .update_connection(
                &f.connection,
                &ConnectionSpec::default()
                    .with_bends(Vec::new())
                    .with_relationships(Vec::<String>::new()),
            )
            .await
            .unwrap()
            .unwrap();

        assert!(cleared.component.bends.is_empty());
        assert!(cleared.component.selected_relationships.is_empty());
        let stored = f.mock.component(ResourceKind::Connection, &f.connection).unwrap();
        assert_eq!(stored["bends"], serde_json::json!([]));
        assert_eq!(stored["selectedRelationships"], serde_json::json!([]));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_stop_prevents_update() {
        let f = fixture();
        f.mock.fail(Method::PUT, &format!("/processors/{}", f.b), 500, 1);

        let err = f
            .choreographer
            .update_connection(&f.connection, &ConnectionSpec::default().with_object_threshold(2000))
            .await
            .unwrap_err();

        assert_eq!(err.http_status_code(), 500);
        let calls = f.mock.calls();
        assert!(!calls
            .iter()
            .any(|c| c.method == Method::PUT && c.path.starts_with("/connections/")));
        assert_eq!(f.mock.revision_of(ResourceKind::Connection, &f.connection), Some(1));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_update_still_restarts_endpoints() {
        let f = fixture();
        f.mock
            .fail(Method::PUT, &format!("/connections/{}", f.connection), 409, 1);

        let err = f
            .choreographer
            .update_connection(&f.connection, &ConnectionSpec::default().with_object_threshold(2000))
            .await
            .unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(f.mock.state_of(ResourceKind::Processor, &f.a).as_deref(), Some("RUNNING"));
        assert_eq!(f.mock.state_of(ResourceKind::Processor, &f.b).as_deref(), Some("RUNNING"));
    }

    #[tokio::test(start_paused = true)]
    async fn moving_destination_also_stops_the_new_endpoint() {
        let f = fixture();
        let c = f.mock.seed_processor("root", "RUNNING");
        let new_destination = EndpointHandle::new(
            EndpointKind::Processor,
            c.clone(),
            ComponentId::parse("root").unwrap(),
        );

        let updated = f
            .choreographer
            .update_connection(&f.connection, &ConnectionSpec::default().with_destination(new_destination))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.component.destination.id, c);
        let stops: Vec<_> = f
            .mock
            .calls()
            .iter()
            .filter(|call| call.requested_state() == Some("STOPPED"))
            .map(|call| call.path.clone())
            .collect();
        assert_eq!(
            stops,
            vec![
                format!("/processors/{}", f.a),
                format!("/processors/{}", f.b),
                format!("/processors/{c}"),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn delete_drains_between_stops_and_delete() {
        let f = fixture_with(
            MockControlPlane::new().with_revision_bump_on_drain(),
            Arc::new(ProcessLock::new()),
            &ControlConfig::default(),
        );
        f.mock.set_queued(&f.connection, 7);

        let removal = f.choreographer.delete_connection(&f.connection).await.unwrap();
        assert_eq!(removal, ConnectionRemoval::Deleted);

        let drop_base = format!("/flowfile-queues/{}/drop-requests", f.connection);
        assert_eq!(
            mutations(&f.mock.calls()),
            vec![
                format!("STOPPED /processors/{}", f.a),
                format!("STOPPED /processors/{}", f.b),
                format!("POST {drop_base}"),
                format!("DELETE {drop_base}/drop-1"),
                // Revision 2: the drop request advanced it
                format!("DELETE /connections/{}?version=2", f.connection),
                format!("RUNNING /processors/{}", f.a),
                format!("RUNNING /processors/{}", f.b),
            ]
        );
        assert!(f.mock.revision_of(ResourceKind::Connection, &f.connection).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn incomplete_drain_can_abort_delete() {
        let config = ControlConfig {
            proceed_on_incomplete_drain: false,
            ..ControlConfig::default()
        };
        let f = fixture_with(
            MockControlPlane::new().with_drain_polls(100),
            Arc::new(ProcessLock::new()),
            &config,
        );
        f.mock.set_queued(&f.connection, 7);

        let err = f.choreographer.delete_connection(&f.connection).await.unwrap_err();

        assert!(matches!(err, ControlError::DrainIncomplete { attempts: 10, .. }));
        assert_eq!(f.mock.revision_of(ResourceKind::Connection, &f.connection), Some(1));
        assert_eq!(f.mock.state_of(ResourceKind::Processor, &f.a).as_deref(), Some("RUNNING"));
        assert_eq!(f.mock.state_of(ResourceKind::Processor, &f.b).as_deref(), Some("RUNNING"));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_connection_exits_cleanly() {
        let f = fixture();
        let gone = ComponentId::parse("connections-404").unwrap();

        assert_eq!(
            f.choreographer.delete_connection(&gone).await.unwrap(),
            ConnectionRemoval::AlreadyGone
        );
        assert!(f
            .choreographer
            .update_connection(&gone, &ConnectionSpec::default().with_object_threshold(1))
            .await
            .unwrap()
            .is_none());
        assert!(mutations(&f.mock.calls()).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_deletes_serialise_on_the_lock() {
        let lock = Arc::new(RecordingLock::new());
        let f = fixture_with(MockControlPlane::new(), lock.clone(), &ControlConfig::default());

        let (first, second) = tokio::join!(
            f.choreographer.delete_connection(&f.connection),
            f.choreographer.delete_connection(&f.connection),
        );

        let mut outcomes = vec![first.unwrap(), second.unwrap()];
        outcomes.sort_by_key(|o| *o == ConnectionRemoval::AlreadyGone);
        assert_eq!(
            outcomes,
            vec![ConnectionRemoval::Deleted, ConnectionRemoval::AlreadyGone]
        );
        assert_eq!(
            lock.events(),
            vec![
                LockEvent::Acquired("delete_connection"),
                LockEvent::Released("delete_connection"),
                LockEvent::Acquired("delete_connection"),
                LockEvent::Released("delete_connection"),
            ]
        );

        let deletes = f
            .mock
            .calls()
            .iter()
            .filter(|c| c.method == Method::DELETE && c.path.starts_with("/connections/"))
            .count();
        assert_eq!(deletes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unsupported_endpoint_aborts_before_any_stop() {
        let f = fixture();
        let label = EndpointHandle::new(
            EndpointKind::Unsupported("LABEL".into()),
            ComponentId::parse("l1").unwrap(),
            ComponentId::parse("root").unwrap(),
        );

        let err = f
            .choreographer
            .update_connection(&f.connection, &ConnectionSpec::default().with_destination(label))
            .await
            .unwrap_err();

        assert!(matches!(err, ControlError::UnsupportedEndpointKind(_)));
        assert!(mutations(&f.mock.calls()).is_empty());
        assert_eq!(f.mock.revision_of(ResourceKind::Connection, &f.connection), Some(1));
    }
}
