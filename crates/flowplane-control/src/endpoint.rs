//! Connection endpoints and how to stop and start each kind.

use std::fmt;

use flowplane_client::{Method, Transport};
use flowplane_core::{ComponentId, ResourceKind};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::entity::{Entity, StatefulComponent};
use crate::error::{ControlError, Result};
use crate::lifecycle::RunState;
use crate::poller::ConvergencePoller;
use crate::store::EntityStore;
use crate::types::{Port, PortType, Processor, RemoteProcessGroup};

/// The kind of component at one end of a connection.
///
/// Unrecognised spellings are preserved so they can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EndpointKind {
    /// A processor.
    Processor,
    /// A local input port.
    InputPort,
    /// A local output port.
    OutputPort,
    /// An input port of a remote process group.
    RemoteInputPort,
    /// An output port of a remote process group.
    RemoteOutputPort,
    /// A funnel.
    Funnel,
    /// Anything else.
    Unsupported(String),
}

impl EndpointKind {
    /// The wire spelling of this kind.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Processor => "PROCESSOR",
            Self::InputPort => "INPUT_PORT",
            Self::OutputPort => "OUTPUT_PORT",
            Self::RemoteInputPort => "REMOTE_INPUT_PORT",
            Self::RemoteOutputPort => "REMOTE_OUTPUT_PORT",
            Self::Funnel => "FUNNEL",
            Self::Unsupported(other) => other,
        }
    }
}

impl From<String> for EndpointKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PROCESSOR" => Self::Processor,
            "INPUT_PORT" => Self::InputPort,
            "OUTPUT_PORT" => Self::OutputPort,
            "REMOTE_INPUT_PORT" => Self::RemoteInputPort,
            "REMOTE_OUTPUT_PORT" => Self::RemoteOutputPort,
            "FUNNEL" => Self::Funnel,
            _ => Self::Unsupported(value),
        }
    }
}

impl From<EndpointKind> for String {
    fn from(kind: EndpointKind) -> Self {
        match kind {
            EndpointKind::Unsupported(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reference to a connection endpoint as carried by the connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointHandle {
    /// Component id.
    pub id: ComponentId,
    /// Owning group. For remote ports this is the remote process group.
    pub group_id: ComponentId,
    /// Endpoint kind.
    #[serde(rename = "type")]
    pub kind: EndpointKind,
}

impl EndpointHandle {
    /// Create a handle.
    #[must_use]
    pub const fn new(kind: EndpointKind, id: ComponentId, group_id: ComponentId) -> Self {
        Self { id, group_id, kind }
    }

    /// Resolve the handle into something that can be stopped and started.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedEndpointKind` for kinds this client cannot
    /// drive, or the fetch error for local components.
    pub async fn resolve<T: Transport>(&self, store: &EntityStore<T>) -> Result<Endpoint> {
        let endpoint = match &self.kind {
            EndpointKind::Processor => {
                Endpoint::Processor(store.get(ResourceKind::Processor, &self.id).await?)
            }
            EndpointKind::InputPort => {
                Endpoint::Port(store.get(ResourceKind::InputPort, &self.id).await?)
            }
            EndpointKind::OutputPort => {
                Endpoint::Port(store.get(ResourceKind::OutputPort, &self.id).await?)
            }
            EndpointKind::RemoteInputPort => Endpoint::RemotePort(RemotePort {
                group_id: self.group_id.clone(),
                port_id: self.id.clone(),
                direction: PortType::InputPort,
            }),
            EndpointKind::RemoteOutputPort => Endpoint::RemotePort(RemotePort {
                group_id: self.group_id.clone(),
                port_id: self.id.clone(),
                direction: PortType::OutputPort,
            }),
            EndpointKind::Funnel => Endpoint::Funnel(self.id.clone()),
            EndpointKind::Unsupported(other) => {
                return Err(ControlError::UnsupportedEndpointKind(other.clone()))
            }
        };
        Ok(endpoint)
    }
}

impl fmt::Display for EndpointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.id)
    }
}

/// A port of a remote process group, driven through its owning group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePort {
    /// The owning remote process group.
    pub group_id: ComponentId,
    /// The remote port id.
    pub port_id: ComponentId,
    /// Whether the port sends to or receives from the remote instance.
    pub direction: PortType,
}

impl RemotePort {
    fn run_status_path(&self) -> String {
        let collection = match self.direction {
            PortType::InputPort => "input-ports",
            PortType::OutputPort => "output-ports",
        };
        format!(
            "/remote-process-groups/{}/{collection}/{}/run-status",
            self.group_id, self.port_id
        )
    }

    /// Switch transmission on or off. The request is not followed by polling.
    ///
    /// # Errors
    ///
    /// Returns any control-plane error other than a conflict.
    pub async fn set_transmitting<T: Transport>(
        &self,
        store: &EntityStore<T>,
        transmitting: bool,
    ) -> Result<()> {
        let group: Entity<RemoteProcessGroup> = store
            .get(ResourceKind::RemoteProcessGroup, &self.group_id)
            .await?;
        let state = if transmitting { "TRANSMITTING" } else { "STOPPED" };
        let body = json!({ "revision": group.revision, "state": state });

        match store.send(Method::PUT, &self.run_status_path(), Some(&body)).await {
            Ok(_) => {
                tracing::debug!(group_id = %self.group_id, port_id = %self.port_id, state, "Remote port run status set");
                Ok(())
            }
            Err(e) if e.is_conflict() => {
                tracing::warn!(group_id = %self.group_id, port_id = %self.port_id, state, error = %e, "Remote port run status conflicted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// A resolved connection endpoint.
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// A processor, driven through the convergence poller.
    Processor(Entity<Processor>),
    /// A local input or output port, driven through the convergence poller.
    Port(Entity<Port>),
    /// A remote port, driven through its remote process group.
    RemotePort(RemotePort),
    /// A funnel, which is always ready.
    Funnel(ComponentId),
}

impl Endpoint {
    /// Stop the endpoint and wait until it is stopped.
    ///
    /// # Errors
    ///
    /// Returns the transition or convergence error.
    pub async fn stop<T: Transport>(&mut self, poller: &ConvergencePoller<T>) -> Result<()> {
        self.drive(poller, RunState::Stopped).await
    }

    /// Start the endpoint and wait until it is running.
    ///
    /// # Errors
    ///
    /// Returns the transition or convergence error.
    pub async fn start<T: Transport>(&mut self, poller: &ConvergencePoller<T>) -> Result<()> {
        self.drive(poller, RunState::Running).await
    }

    async fn drive<T: Transport>(
        &mut self,
        poller: &ConvergencePoller<T>,
        desired: RunState,
    ) -> Result<()> {
        match self {
            Self::Processor(entity) => converge(poller, entity, desired).await,
            Self::Port(entity) => converge(poller, entity, desired).await,
            Self::RemotePort(port) => {
                port.set_transmitting(poller.store(), desired == RunState::Running)
                    .await
            }
            Self::Funnel(_) => Ok(()),
        }
    }
}

async fn converge<T, C>(
    poller: &ConvergencePoller<T>,
    entity: &mut Entity<C>,
    desired: RunState,
) -> Result<()>
where
    T: Transport,
    C: StatefulComponent<State = RunState>,
{
    match entity.state() {
        // Disabled components are neither stopped nor started
        Some(RunState::Disabled) => {
            tracing::debug!(kind = %entity.kind(), id = ?entity.component.id(), "Skipping disabled endpoint");
            Ok(())
        }
        Some(state) if state == desired => Ok(()),
        _ => poller.request_transition(entity, desired).await,
    }
}
