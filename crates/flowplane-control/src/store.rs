//! Revision-checked CRUD against the control plane.
//!
//! Each operation performs exactly one call. On success the caller's
//! [`Entity`] is replaced with the control plane's representation, so the
//! revision it holds is always the latest one observed.

use flowplane_client::{Method, Response, Transport};
use flowplane_core::{ComponentId, ResourceKind};
use serde::de::DeserializeOwned;

use crate::entity::{Component, Entity};
use crate::error::{ControlError, Result};

/// CRUD operations over a [`Transport`].
#[derive(Debug)]
pub struct EntityStore<T> {
    transport: T,
}

impl<T: Transport> EntityStore<T> {
    /// Create a store issuing calls through `transport`.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Get the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Create the component, inside its parent group for group-scoped kinds.
    ///
    /// # Errors
    ///
    /// Returns `MissingField` if a group-scoped component has no parent
    /// group, or the mapped control-plane error.
    pub async fn create<C: Component>(&self, entity: &mut Entity<C>) -> Result<()> {
        let kind = entity.kind();
        let path = kind
            .create_path(entity.component.parent_group_id())
            .ok_or(ControlError::MissingField {
                kind,
                field: "parentGroupId",
            })?;
        let body = serde_json::to_value(&*entity)?;

        let created: Entity<C> = self.send_json(Method::POST, &path, Some(&body)).await?;
        *entity = normalized(created);

        tracing::info!(kind = %kind, id = ?entity.component.id(), revision = %entity.revision, "Created component");
        Ok(())
    }

    /// Fetch a component by kind and id.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::NotFound` if the component does not exist.
    pub async fn get<C: Component>(&self, kind: ResourceKind, id: &ComponentId) -> Result<Entity<C>> {
        let entity: Entity<C> = self
            .send_json(Method::GET, &kind.entity_path(id), None)
            .await?;
        Ok(normalized(entity))
    }

    /// Replace `entity` with the live representation.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::NotFound` if the component no longer exists.
    pub async fn refresh<C: Component>(&self, entity: &mut Entity<C>) -> Result<()> {
        let id = entity.id()?.clone();
        *entity = self.get(entity.kind(), &id).await?;
        Ok(())
    }

    /// Write the component at the caller's revision.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Conflict` if the revision is stale or the
    /// component is not in a state that allows the change.
    pub async fn update<C: Component>(&self, entity: &mut Entity<C>) -> Result<()> {
        let kind = entity.kind();
        let path = kind.entity_path(entity.id()?);
        let body = serde_json::to_value(&*entity)?;

        let updated: Entity<C> = self.send_json(Method::PUT, &path, Some(&body)).await?;
        *entity = normalized(updated);

        tracing::debug!(kind = %kind, id = ?entity.component.id(), revision = %entity.revision, "Updated component");
        Ok(())
    }

    /// Delete the component at the caller's revision.
    ///
    /// A stale revision surfaces as `Conflict` and is never retried here.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Conflict` on a stale revision and
    /// `ControlError::NotFound` if the component is already gone.
    pub async fn delete<C: Component>(&self, entity: &mut Entity<C>) -> Result<()> {
        let kind = entity.kind();
        let id = entity.id()?.clone();
        let path = kind.delete_path(&id, entity.revision);

        let response = self.send(Method::DELETE, &path, None).await?;
        if let Ok(deleted) = serde_json::from_slice::<Entity<C>>(&response.body) {
            *entity = normalized(deleted);
        }

        tracing::info!(kind = %kind, id = %id, "Deleted component");
        Ok(())
    }

    /// Send a request and map non-2xx statuses to errors.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on 404, `Conflict` on 409 and `RemoteRejected` on
    /// any other non-2xx status.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let response = self.transport.invoke(method.clone(), path, body).await?;
        check_status(&method, path, response)
    }

    /// Send a request and decode the JSON response body.
    ///
    /// # Errors
    ///
    /// Returns the mapped status error or `Serialization` if the body does
    /// not decode.
    pub async fn send_json<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<R> {
        let response = self.send(method, path, body).await?;
        Ok(serde_json::from_slice(&response.body)?)
    }
}

fn normalized<C: Component>(mut entity: Entity<C>) -> Entity<C> {
    entity.component.normalize();
    entity
}

fn check_status(method: &Method, path: &str, response: Response) -> Result<Response> {
    match response.status {
        200..=299 => Ok(response),
        404 => Err(ControlError::NotFound(path.to_string())),
        409 => {
            tracing::debug!(%method, path, "Control plane reported a conflict");
            Err(ControlError::Conflict {
                path: path.to_string(),
                body: response.text(),
            })
        }
        status => {
            tracing::warn!(%method, path, status, "Control plane rejected the call");
            Err(ControlError::RemoteRejected {
                status,
                body: response.text(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::RunState;
    use crate::mock::MockControlPlane;
    use crate::types::{Funnel, Processor};
    use std::sync::Arc;

    fn root() -> ComponentId {
        ComponentId::parse("root").unwrap()
    }

    fn store() -> (Arc<MockControlPlane>, EntityStore<Arc<MockControlPlane>>) {
        let mock = Arc::new(MockControlPlane::new());
        (mock.clone(), EntityStore::new(mock))
    }

    #[tokio::test]
    async fn create_then_get_returns_created_revision() {
        let (_, store) = store();

        let mut processor = Entity::new(Processor::new(root(), "gen", "org.example.Generate"));
        store.create(&mut processor).await.unwrap();

        let id = processor.id().unwrap().clone();
        assert!(processor.revision.version >= 1);
        assert_eq!(processor.state(), Some(RunState::Stopped));

        let fetched: Entity<Processor> = store.get(ResourceKind::Processor, &id).await.unwrap();
        assert_eq!(fetched.revision, processor.revision);
        assert_eq!(fetched.component, processor.component);
    }

    #[tokio::test]
    async fn update_advances_revision() {
        let (_, store) = store();

        let mut processor = Entity::new(Processor::new(root(), "gen", "org.example.Generate"));
        store.create(&mut processor).await.unwrap();
        let created = processor.revision;

        processor.component.name = Some("renamed".into());
        store.update(&mut processor).await.unwrap();

        assert_eq!(processor.revision, created.next());
        assert_eq!(processor.component.name.as_deref(), Some("renamed"));
    }

    #[tokio::test]
    async fn stale_delete_is_conflict() {
        let (mock, store) = store();

        let mut funnel = Entity::new(Funnel::new(root()));
        store.create(&mut funnel).await.unwrap();
        let id = funnel.id().unwrap().clone();

        let mut stale = funnel.clone();
        store.update(&mut funnel).await.unwrap();
        assert!(stale.revision < funnel.revision);

        let err = store.delete(&mut stale).await.unwrap_err();
        assert!(err.is_conflict());

        // Nothing was retried
        let deletes = mock
            .calls()
            .into_iter()
            .filter(|c| c.method == Method::DELETE)
            .count();
        assert_eq!(deletes, 1);

        store.delete(&mut funnel).await.unwrap();
        let gone = store.get::<Funnel>(ResourceKind::Funnel, &id).await.unwrap_err();
        assert!(gone.is_not_found());
    }

    #[tokio::test]
    async fn other_statuses_are_remote_rejected() {
        let (mock, store) = store();
        mock.fail(Method::GET, "/processors/p9", 503, 1);

        let err = store
            .get::<Processor>(ResourceKind::Processor, &ComponentId::parse("p9").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::RemoteRejected { status: 503, .. }));
        assert!(err.is_retriable());
    }

    #[tokio::test]
    async fn create_requires_parent_group() {
        let (_, store) = store();
        let mut funnel = Entity::new(Funnel::default());

        let err = store.create(&mut funnel).await.unwrap_err();
        assert!(matches!(
            err,
            ControlError::MissingField { field: "parentGroupId", .. }
        ));
    }
}
