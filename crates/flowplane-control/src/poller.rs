//! State convergence: request a transition, then poll until it is observed.
//!
//! The control plane answers a state change with 2xx once it has *accepted*
//! the request, not once it has *applied* it. Every transition is therefore
//! followed by polling the component at a fixed interval until the desired
//! state is reported or the timeout elapses.

use std::sync::Arc;
use std::time::Duration;

use flowplane_client::{Method, Transport};
use serde_json::json;
use tokio::time::{sleep, Instant};

use crate::entity::{Entity, StatefulComponent};
use crate::error::{ControlError, Result};
use crate::store::EntityStore;

/// Polling cadence and budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Time between fetches.
    pub interval: Duration,
    /// Upper bound on the total wait.
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Drives stateful components to a desired state.
///
/// Works for any [`StatefulComponent`], so processors, ports and controller
/// services share one engine.
#[derive(Debug)]
pub struct ConvergencePoller<T> {
    store: Arc<EntityStore<T>>,
    settings: PollSettings,
}

impl<T> Clone for ConvergencePoller<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            settings: self.settings,
        }
    }
}

impl<T: Transport> ConvergencePoller<T> {
    /// Create a poller over `store`.
    #[must_use]
    pub const fn new(store: Arc<EntityStore<T>>, settings: PollSettings) -> Self {
        Self { store, settings }
    }

    /// Get the polling settings.
    #[must_use]
    pub const fn settings(&self) -> PollSettings {
        self.settings
    }

    /// Get the store used for fetches.
    #[must_use]
    pub fn store(&self) -> &EntityStore<T> {
        &self.store
    }

    /// Request `desired` and wait for the control plane to report it.
    ///
    /// On return `entity` holds the last representation observed.
    ///
    /// # Errors
    ///
    /// Returns `ConvergenceTimeout` if the state is not observed within the
    /// configured timeout, or the error of the transition request itself
    /// unless it was a conflict.
    pub async fn request_transition<C: StatefulComponent>(
        &self,
        entity: &mut Entity<C>,
        desired: C::State,
    ) -> Result<()> {
        self.submit_transition(entity, desired).await?;
        self.await_state(entity, desired, self.settings.timeout).await
    }

    /// Send the minimal state-change body without waiting.
    ///
    /// A 409 is logged and swallowed: the component may already be in, or
    /// heading to, the requested state, and polling decides either way.
    ///
    /// # Errors
    ///
    /// Returns any control-plane error other than a conflict.
    pub async fn submit_transition<C: StatefulComponent>(
        &self,
        entity: &mut Entity<C>,
        desired: C::State,
    ) -> Result<()> {
        let kind = entity.kind();
        let id = entity.id()?.clone();
        let body = json!({
            "revision": entity.revision,
            "component": { "id": id, "state": desired },
        });

        match self
            .store
            .send(Method::PUT, &kind.entity_path(&id), Some(&body))
            .await
        {
            Ok(response) => {
                if let Ok(mut accepted) = serde_json::from_slice::<Entity<C>>(&response.body) {
                    accepted.component.normalize();
                    *entity = accepted;
                }
                tracing::debug!(kind = %kind, id = %id, desired = %desired, "Transition accepted");
                Ok(())
            }
            Err(e) if e.is_conflict() => {
                tracing::warn!(
                    kind = %kind,
                    id = %id,
                    desired = %desired,
                    error = %e,
                    "Transition request conflicted; confirming by polling"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Poll until the component reports `desired` or `timeout` elapses.
    ///
    /// Failed fetches are treated as transient and retried on the next tick.
    ///
    /// # Errors
    ///
    /// Returns `ConvergenceTimeout` carrying the last observed state.
    pub async fn await_state<C: StatefulComponent>(
        &self,
        entity: &mut Entity<C>,
        desired: C::State,
        timeout: Duration,
    ) -> Result<()> {
        let kind = entity.kind();
        let id = entity.id()?.clone();
        let interval = self.settings.interval;
        let started = Instant::now();
        let deadline = started + timeout;

        loop {
            match self.store.get::<C>(kind, &id).await {
                Ok(fresh) => {
                    *entity = fresh;
                    if entity.state() == Some(desired) {
                        tracing::debug!(
                            kind = %kind,
                            id = %id,
                            state = %desired,
                            elapsed = ?started.elapsed(),
                            "State converged"
                        );
                        return Ok(());
                    }
                }
                Err(e) => {
                    tracing::debug!(kind = %kind, id = %id, error = %e, "Fetch failed while polling");
                }
            }

            if Instant::now() + interval > deadline {
                let observed = entity.state().map(|s| s.to_string());
                tracing::warn!(
                    kind = %kind,
                    id = %id,
                    desired = %desired,
                    observed = ?observed,
                    "State did not converge"
                );
                return Err(ControlError::ConvergenceTimeout {
                    kind,
                    id,
                    desired: desired.to_string(),
                    observed,
                    waited: started.elapsed(),
                });
            }

            sleep(interval).await;
        }
    }
}
