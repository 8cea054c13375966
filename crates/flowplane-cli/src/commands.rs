//! Subcommands and their execution against a [`FlowControl`] implementation.

use anyhow::Context;
use clap::{Subcommand, ValueEnum};
use flowplane_client::{Method, Transport};
use flowplane_control::{ConnectionRemoval, ConnectionSpec, FlowControl, FlowService, PortType};
use flowplane_core::{ComponentId, ResourceKind};
use serde::Serialize;

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a component as returned by the control plane.
    Get {
        /// Resource kind, e.g. `processor` or `connections`.
        kind: ResourceKind,
        /// Component id.
        id: ComponentId,
    },
    /// Drive a processor's run state.
    Processor {
        #[command(subcommand)]
        action: RunAction,
    },
    /// Drive a port's run state.
    Port {
        /// Port direction.
        #[arg(long, value_enum, default_value_t = Direction::Input)]
        direction: Direction,
        #[command(subcommand)]
        action: RunAction,
    },
    /// Drive a reporting task's run state.
    ReportingTask {
        #[command(subcommand)]
        action: RunAction,
    },
    /// Enable or disable a controller service.
    Service {
        #[command(subcommand)]
        action: ServiceAction,
    },
    /// Change or remove a connection; its endpoints are stopped around the change.
    Connection {
        #[command(subcommand)]
        action: ConnectionAction,
    },
}

/// Run-state verbs for processors, ports and reporting tasks.
#[derive(Subcommand, Debug, Clone)]
pub enum RunAction {
    /// Start the component.
    Start { id: ComponentId },
    /// Stop the component.
    Stop { id: ComponentId },
    /// Stop and disable the component.
    Disable { id: ComponentId },
}

/// Controller service verbs.
#[derive(Subcommand, Debug, Clone)]
pub enum ServiceAction {
    /// Enable the service.
    Enable { id: ComponentId },
    /// Disable the service.
    Disable { id: ComponentId },
}

/// Connection verbs.
#[derive(Subcommand, Debug, Clone)]
pub enum ConnectionAction {
    /// Update thresholds, name or relationships.
    Update {
        id: ComponentId,
        /// Back-pressure object count threshold.
        #[arg(long)]
        object_threshold: Option<u64>,
        /// Back-pressure data size threshold, e.g. `"1 GB"`.
        #[arg(long)]
        data_size_threshold: Option<String>,
        /// New display name.
        #[arg(long)]
        name: Option<String>,
        /// Selected relationships, comma separated.
        #[arg(long, value_delimiter = ',')]
        relationships: Vec<String>,
    },
    /// Drain the queue and delete the connection.
    Delete { id: ComponentId },
}

/// Port direction flag.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Input port.
    Input,
    /// Output port.
    Output,
}

impl From<Direction> for PortType {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Input => Self::InputPort,
            Direction::Output => Self::OutputPort,
        }
    }
}

impl ConnectionAction {
    fn spec(
        object_threshold: Option<u64>,
        data_size_threshold: Option<String>,
        name: Option<String>,
        relationships: Vec<String>,
    ) -> ConnectionSpec {
        let mut spec = ConnectionSpec::default();
        if let Some(n) = object_threshold {
            spec = spec.with_object_threshold(n);
        }
        if let Some(size) = data_size_threshold {
            spec = spec.with_data_size_threshold(size);
        }
        if let Some(name) = name {
            spec = spec.with_name(name);
        }
        if !relationships.is_empty() {
            spec = spec.with_relationships(relationships);
        }
        spec
    }
}

fn pretty<S: Serialize>(value: &S) -> anyhow::Result<String> {
    serde_json::to_string_pretty(value).context("failed to render response")
}

/// Execute a command and return the text to print.
pub async fn run<T: Transport>(
    service: &FlowService<T>,
    command: Command,
) -> anyhow::Result<String> {
    match command {
        Command::Get { kind, id } => {
            let value: serde_json::Value = service
                .store()
                .send_json(Method::GET, &kind.entity_path(&id), None)
                .await
                .with_context(|| format!("failed to fetch {kind} {id}"))?;
            pretty(&value)
        }
        Command::Processor { action } => {
            let entity = match action {
                RunAction::Start { id } => service.start_processor(&id).await?,
                RunAction::Stop { id } => service.stop_processor(&id).await?,
                RunAction::Disable { id } => service.disable_processor(&id).await?,
            };
            pretty(&entity)
        }
        Command::Port { direction, action } => {
            let port_type = PortType::from(direction);
            let entity = match action {
                RunAction::Start { id } => service.start_port(port_type, &id).await?,
                RunAction::Stop { id } => service.stop_port(port_type, &id).await?,
                RunAction::Disable { id } => service.disable_port(port_type, &id).await?,
            };
            pretty(&entity)
        }
        Command::ReportingTask { action } => {
            let entity = match action {
                RunAction::Start { id } => service.start_reporting_task(&id).await?,
                RunAction::Stop { id } => service.stop_reporting_task(&id).await?,
                RunAction::Disable { id } => service.disable_reporting_task(&id).await?,
            };
            pretty(&entity)
        }
        Command::Service { action } => {
            let entity = match action {
                ServiceAction::Enable { id } => service.enable_controller_service(&id).await?,
                ServiceAction::Disable { id } => service.disable_controller_service(&id).await?,
            };
            pretty(&entity)
        }
        Command::Connection { action } => match action {
            ConnectionAction::Update {
                id,
                object_threshold,
                data_size_threshold,
                name,
                relationships,
            } => {
                let spec = ConnectionAction::spec(
                    object_threshold,
                    data_size_threshold,
                    name,
                    relationships,
                );
                if spec.is_empty() {
                    anyhow::bail!("nothing to update: pass at least one connection setting");
                }
                match service.update_connection(&id, &spec).await? {
                    Some(entity) => pretty(&entity),
                    None => Ok(format!("connection {id} does not exist")),
                }
            }
            ConnectionAction::Delete { id } => {
                Ok(match service.delete_connection(&id).await? {
                    ConnectionRemoval::Deleted => format!("connection {id} deleted"),
                    ConnectionRemoval::AlreadyGone => format!("connection {id} does not exist"),
                })
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowplane_control::{ControlConfig, MockControlPlane};

    #[tokio::test(start_paused = true)]
    async fn processor_stop_prints_entity() {
        let mock = MockControlPlane::new();
        let id = mock.seed_processor("root", "RUNNING");
        let service = FlowService::new(mock, ControlConfig::default());

        let output = run(&service, Command::Processor { action: RunAction::Stop { id } })
            .await
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["component"]["state"], "STOPPED");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_update_is_rejected() {
        let service = FlowService::new(MockControlPlane::new(), ControlConfig::default());
        let id = ComponentId::parse("c1").unwrap();

        let err = run(
            &service,
            Command::Connection {
                action: ConnectionAction::Update {
                    id,
                    object_threshold: None,
                    data_size_threshold: None,
                    name: None,
                    relationships: Vec::new(),
                },
            },
        )
        .await
        .unwrap_err();

        assert!(err.to_string().contains("nothing to update"));
    }

    #[tokio::test(start_paused = true)]
    async fn deleting_a_missing_connection_reports_it() {
        let service = FlowService::new(MockControlPlane::new(), ControlConfig::default());
        let id = ComponentId::parse("gone").unwrap();

        let output = run(&service, Command::Connection { action: ConnectionAction::Delete { id } })
            .await
            .unwrap();

        assert_eq!(output, "connection gone does not exist");
    }
}
