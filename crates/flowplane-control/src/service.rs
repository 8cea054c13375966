//! Flow service: the public API over the entity store, poller and
//! choreographer.

use std::sync::Arc;

use async_trait::async_trait;
use flowplane_client::{Method, Transport};
use flowplane_core::{ComponentId, ResourceKind};

use crate::choreographer::{Choreographer, ConnectionRemoval};
use crate::config::ControlConfig;
use crate::entity::{Component, Entity, StatefulComponent};
use crate::error::Result;
use crate::lifecycle::{transition_path, RunState, ServiceState};
use crate::lock::{CrossResourceLock, ProcessLock};
use crate::poller::ConvergencePoller;
use crate::store::EntityStore;
use crate::types::{
    Connection, ConnectionSpec, ControllerService, Funnel, Port, PortType, ProcessGroup,
    Processor, RemoteProcessGroup, ReportingTask, User, UserGroup,
};

/// Operations on a dataflow that go beyond single-call CRUD.
///
/// Lifecycle verbs take an id, fetch the live component and return it once
/// the control plane reports the requested state.
#[async_trait]
pub trait FlowControl: Send + Sync {
    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a processor.
    async fn get_processor(&self, id: &ComponentId) -> Result<Entity<Processor>>;

    /// Get an input or output port.
    async fn get_port(&self, port_type: PortType, id: &ComponentId) -> Result<Entity<Port>>;

    /// Get a funnel.
    async fn get_funnel(&self, id: &ComponentId) -> Result<Entity<Funnel>>;

    /// Get a connection.
    async fn get_connection(&self, id: &ComponentId) -> Result<Entity<Connection>>;

    /// Get a controller service.
    async fn get_controller_service(&self, id: &ComponentId)
        -> Result<Entity<ControllerService>>;

    /// Get a process group.
    async fn get_process_group(&self, id: &ComponentId) -> Result<Entity<ProcessGroup>>;

    /// Get a remote process group.
    async fn get_remote_process_group(
        &self,
        id: &ComponentId,
    ) -> Result<Entity<RemoteProcessGroup>>;

    /// Get a reporting task.
    async fn get_reporting_task(&self, id: &ComponentId) -> Result<Entity<ReportingTask>>;

    /// Get a user.
    async fn get_user(&self, id: &ComponentId) -> Result<Entity<User>>;

    /// Get a user group.
    async fn get_user_group(&self, id: &ComponentId) -> Result<Entity<UserGroup>>;

    /// Whether a component exists. A 404 maps to `false`.
    async fn exists(&self, kind: ResourceKind, id: &ComponentId) -> Result<bool>;

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start a processor and wait until it runs.
    async fn start_processor(&self, id: &ComponentId) -> Result<Entity<Processor>>;

    /// Stop a processor and wait until it is stopped.
    async fn stop_processor(&self, id: &ComponentId) -> Result<Entity<Processor>>;

    /// Disable a processor, stopping it first if it runs.
    async fn disable_processor(&self, id: &ComponentId) -> Result<Entity<Processor>>;

    /// Start a port and wait until it runs.
    async fn start_port(&self, port_type: PortType, id: &ComponentId) -> Result<Entity<Port>>;

    /// Stop a port and wait until it is stopped.
    async fn stop_port(&self, port_type: PortType, id: &ComponentId) -> Result<Entity<Port>>;

    /// Disable a port, stopping it first if it runs.
    async fn disable_port(&self, port_type: PortType, id: &ComponentId) -> Result<Entity<Port>>;

    /// Enable a controller service and wait until it is enabled.
    async fn enable_controller_service(
        &self,
        id: &ComponentId,
    ) -> Result<Entity<ControllerService>>;

    /// Disable a controller service and wait until it is disabled.
    async fn disable_controller_service(
        &self,
        id: &ComponentId,
    ) -> Result<Entity<ControllerService>>;

    /// Start a reporting task and wait until it runs.
    async fn start_reporting_task(&self, id: &ComponentId) -> Result<Entity<ReportingTask>>;

    /// Stop a reporting task and wait until it is stopped.
    async fn stop_reporting_task(&self, id: &ComponentId) -> Result<Entity<ReportingTask>>;

    /// Disable a reporting task, stopping it first if it runs.
    async fn disable_reporting_task(&self, id: &ComponentId) -> Result<Entity<ReportingTask>>;

    // =========================================================================
    // Cross-resource
    // =========================================================================

    /// Update a user group under the cross-resource lock.
    async fn update_user_group(&self, group: &mut Entity<UserGroup>) -> Result<()>;

    /// Delete a user group under the cross-resource lock.
    async fn delete_user_group(&self, group: &mut Entity<UserGroup>) -> Result<()>;

    /// Update a funnel under the cross-resource lock.
    async fn update_funnel(&self, funnel: &mut Entity<Funnel>) -> Result<()>;

    /// Delete a funnel under the cross-resource lock.
    async fn delete_funnel(&self, funnel: &mut Entity<Funnel>) -> Result<()>;

    /// Create a connection.
    async fn create_connection(&self, connection: Connection) -> Result<Entity<Connection>>;

    /// Change a connection, stopping and restarting its endpoints around it.
    ///
    /// Returns `None` if the connection no longer exists.
    async fn update_connection(
        &self,
        id: &ComponentId,
        spec: &ConnectionSpec,
    ) -> Result<Option<Entity<Connection>>>;

    /// Drain and delete a connection, stopping and restarting its endpoints.
    async fn delete_connection(&self, id: &ComponentId) -> Result<ConnectionRemoval>;
}

/// The flow service.
pub struct FlowService<T> {
    store: Arc<EntityStore<T>>,
    poller: ConvergencePoller<T>,
    choreographer: Choreographer<T>,
    lock: Arc<dyn CrossResourceLock>,
    config: ControlConfig,
}

impl<T: Transport> FlowService<T> {
    /// Create a service with a process-wide lock.
    #[must_use]
    pub fn new(transport: T, config: ControlConfig) -> Self {
        Self::with_lock(transport, config, Arc::new(ProcessLock::new()))
    }

    /// Create a service sharing an existing cross-resource lock.
    #[must_use]
    pub fn with_lock(transport: T, config: ControlConfig, lock: Arc<dyn CrossResourceLock>) -> Self {
        let store = Arc::new(EntityStore::new(transport));
        Self {
            poller: ConvergencePoller::new(Arc::clone(&store), config.poll_settings()),
            choreographer: Choreographer::new(Arc::clone(&store), Arc::clone(&lock), &config),
            store,
            lock,
            config,
        }
    }

    /// Get the entity store.
    #[must_use]
    pub fn store(&self) -> &EntityStore<T> {
        &self.store
    }

    /// Get the convergence poller.
    #[must_use]
    pub const fn poller(&self) -> &ConvergencePoller<T> {
        &self.poller
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &ControlConfig {
        &self.config
    }

    // =========================================================================
    // Generic CRUD
    // =========================================================================

    /// Create a component and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns the mapped control-plane error.
    pub async fn create<C: Component>(&self, component: C) -> Result<Entity<C>> {
        let mut entity = Entity::new(component);
        self.store.create(&mut entity).await?;
        Ok(entity)
    }

    /// Fetch a component.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::NotFound` if it does not exist.
    pub async fn get<C: Component>(&self, kind: ResourceKind, id: &ComponentId) -> Result<Entity<C>> {
        self.store.get(kind, id).await
    }

    /// Write a component at the revision it holds.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Conflict` if the revision is stale.
    pub async fn update<C: Component>(&self, entity: &mut Entity<C>) -> Result<()> {
        self.store.update(entity).await
    }

    /// Delete a component at the revision it holds.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::Conflict` if the revision is stale.
    pub async fn delete<C: Component>(&self, entity: &mut Entity<C>) -> Result<()> {
        self.store.delete(entity).await
    }

    async fn drive_run_state<C>(&self, kind: ResourceKind, id: &ComponentId, target: RunState) -> Result<Entity<C>>
    where
        C: StatefulComponent<State = RunState>,
    {
        let mut entity: Entity<C> = self.store.get(kind, id).await?;
        let current = entity.state().unwrap_or(RunState::Unknown);

        for step in transition_path(current, target) {
            tracing::debug!(kind = %kind, id = %id, from = %current, step = %step, "Requesting transition");
            self.poller.request_transition(&mut entity, step).await?;
        }

        tracing::info!(kind = %kind, id = %id, state = %target, "Component reached state");
        Ok(entity)
    }

    async fn drive_service_state(
        &self,
        id: &ComponentId,
        target: ServiceState,
    ) -> Result<Entity<ControllerService>> {
        let kind = ResourceKind::ControllerService;
        let mut entity: Entity<ControllerService> = self.store.get(kind, id).await?;

        if entity.state() != Some(target) {
            self.poller.request_transition(&mut entity, target).await?;
        }

        tracing::info!(kind = %kind, id = %id, state = %target, "Controller service reached state");
        Ok(entity)
    }
}

const fn port_kind(port_type: PortType) -> ResourceKind {
    match port_type {
        PortType::InputPort => ResourceKind::InputPort,
        PortType::OutputPort => ResourceKind::OutputPort,
    }
}

#[async_trait]
impl<T: Transport> FlowControl for FlowService<T> {
    async fn get_processor(&self, id: &ComponentId) -> Result<Entity<Processor>> {
        self.store.get(ResourceKind::Processor, id).await
    }

    async fn get_port(&self, port_type: PortType, id: &ComponentId) -> Result<Entity<Port>> {
        self.store.get(port_kind(port_type), id).await
    }

    async fn get_funnel(&self, id: &ComponentId) -> Result<Entity<Funnel>> {
        self.store.get(ResourceKind::Funnel, id).await
    }

    async fn get_connection(&self, id: &ComponentId) -> Result<Entity<Connection>> {
        self.store.get(ResourceKind::Connection, id).await
    }

    async fn get_controller_service(
        &self,
        id: &ComponentId,
    ) -> Result<Entity<ControllerService>> {
        self.store.get(ResourceKind::ControllerService, id).await
    }

    async fn get_process_group(&self, id: &ComponentId) -> Result<Entity<ProcessGroup>> {
        self.store.get(ResourceKind::ProcessGroup, id).await
    }

    async fn get_remote_process_group(
        &self,
        id: &ComponentId,
    ) -> Result<Entity<RemoteProcessGroup>> {
        self.store.get(ResourceKind::RemoteProcessGroup, id).await
    }

    async fn get_reporting_task(&self, id: &ComponentId) -> Result<Entity<ReportingTask>> {
        self.store.get(ResourceKind::ReportingTask, id).await
    }

    async fn get_user(&self, id: &ComponentId) -> Result<Entity<User>> {
        self.store.get(ResourceKind::User, id).await
    }

    async fn get_user_group(&self, id: &ComponentId) -> Result<Entity<UserGroup>> {
        self.store.get(ResourceKind::UserGroup, id).await
    }

    async fn exists(&self, kind: ResourceKind, id: &ComponentId) -> Result<bool> {
        match self.store.send(Method::GET, &kind.entity_path(id), None).await {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn start_processor(&self, id: &ComponentId) -> Result<Entity<Processor>> {
        self.drive_run_state(ResourceKind::Processor, id, RunState::Running)
            .await
    }

    async fn stop_processor(&self, id: &ComponentId) -> Result<Entity<Processor>> {
        self.drive_run_state(ResourceKind::Processor, id, RunState::Stopped)
            .await
    }

    async fn disable_processor(&self, id: &ComponentId) -> Result<Entity<Processor>> {
        self.drive_run_state(ResourceKind::Processor, id, RunState::Disabled)
            .await
    }

    async fn start_port(&self, port_type: PortType, id: &ComponentId) -> Result<Entity<Port>> {
        self.drive_run_state(port_kind(port_type), id, RunState::Running)
            .await
    }

    async fn stop_port(&self, port_type: PortType, id: &ComponentId) -> Result<Entity<Port>> {
        self.drive_run_state(port_kind(port_type), id, RunState::Stopped)
            .await
    }

    async fn disable_port(&self, port_type: PortType, id: &ComponentId) -> Result<Entity<Port>> {
        self.drive_run_state(port_kind(port_type), id, RunState::Disabled)
            .await
    }

    async fn enable_controller_service(
        &self,
        id: &ComponentId,
    ) -> Result<Entity<ControllerService>> {
        self.drive_service_state(id, ServiceState::Enabled).await
    }

    async fn disable_controller_service(
        &self,
        id: &ComponentId,
    ) -> Result<Entity<ControllerService>> {
        self.drive_service_state(id, ServiceState::Disabled).await
    }

    async fn start_reporting_task(&self, id: &ComponentId) -> Result<Entity<ReportingTask>> {
        self.drive_run_state(ResourceKind::ReportingTask, id, RunState::Running)
            .await
    }

    async fn stop_reporting_task(&self, id: &ComponentId) -> Result<Entity<ReportingTask>> {
        self.drive_run_state(ResourceKind::ReportingTask, id, RunState::Stopped)
            .await
    }

    async fn disable_reporting_task(&self, id: &ComponentId) -> Result<Entity<ReportingTask>> {
        self.drive_run_state(ResourceKind::ReportingTask, id, RunState::Disabled)
            .await
    }

    async fn update_user_group(&self, group: &mut Entity<UserGroup>) -> Result<()> {
        let _guard = self.lock.acquire("update_user_group").await;
        self.store.update(group).await
    }

    async fn delete_user_group(&self, group: &mut Entity<UserGroup>) -> Result<()> {
        let _guard = self.lock.acquire("delete_user_group").await;
        self.store.delete(group).await
    }

    async fn update_funnel(&self, funnel: &mut Entity<Funnel>) -> Result<()> {
        let _guard = self.lock.acquire("update_funnel").await;
        self.store.update(funnel).await
    }

    async fn delete_funnel(&self, funnel: &mut Entity<Funnel>) -> Result<()> {
        let _guard = self.lock.acquire("delete_funnel").await;
        self.store.delete(funnel).await
    }

    async fn create_connection(&self, connection: Connection) -> Result<Entity<Connection>> {
        self.create(connection).await
    }

    async fn update_connection(
        &self,
        id: &ComponentId,
        spec: &ConnectionSpec,
    ) -> Result<Option<Entity<Connection>>> {
        self.choreographer.update_connection(id, spec).await
    }

    async fn delete_connection(&self, id: &ComponentId) -> Result<ConnectionRemoval> {
        self.choreographer.delete_connection(id).await
    }
}

impl<T> std::fmt::Debug for FlowService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
