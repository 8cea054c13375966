//! Lifecycle orchestration for dataflow components.
//!
//! The control plane applies state changes asynchronously and refuses
//! structural changes to connections whose endpoints are running. This crate
//! turns "make it so" requests into the ordered, revision-checked call
//! sequences the control plane accepts.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        FlowService                          │
//! │  ┌─────────────┐ ┌─────────────────┐ ┌──────────────────┐   │
//! │  │  Generic    │ │   Lifecycle     │ │  Choreographer   │   │
//! │  │  CRUD       │ │   verbs         │ │  (connections)   │   │
//! │  └──────┬──────┘ └────────┬────────┘ └───┬─────────┬────┘   │
//! │         │                 │              │         │        │
//! │         │       ┌─────────▼─────────┐    │  ┌──────▼─────┐  │
//! │         │       │ ConvergencePoller │◀───┘  │QueueDrainer│  │
//! │         │       └─────────┬─────────┘       └──────┬─────┘  │
//! │         │                 │                        │        │
//! │  ┌──────▼─────────────────▼────────────────────────▼─────┐  │
//! │  │                    EntityStore                        │  │
//! │  └───────────────────────────┬───────────────────────────┘  │
//! └──────────────────────────────┼──────────────────────────────┘
//!                                ▼
//!                     flowplane_client::Transport
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use flowplane_client::{ClientConfig, HttpTransport};
//! use flowplane_control::{ConnectionSpec, ControlConfig, FlowControl, FlowService};
//! use flowplane_core::ComponentId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::connect(ClientConfig::from_env()).await?;
//! let service = FlowService::new(transport, ControlConfig::from_env());
//!
//! // Raise a back-pressure threshold; both endpoints are stopped around the change
//! let id: ComponentId = "0b7a4c1e-017d-1000-ffff-ffffb3c4d6a2".parse()?;
//! let spec = ConnectionSpec::default().with_object_threshold(2000);
//! service.update_connection(&id, &spec).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Testing
//!
//! With the `test-utils` feature, [`MockControlPlane`] provides an in-memory
//! control plane enforcing revisions, delayed state application and the
//! connection rules, and [`RecordingLock`] records lock acquisition order.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod choreographer;
pub mod config;
pub mod drain;
pub mod endpoint;
pub mod entity;
pub mod error;
pub mod lifecycle;
pub mod lock;
pub mod poller;
pub mod service;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use choreographer::{Choreographer, ConnectionRemoval};
pub use config::ControlConfig;
pub use drain::{DrainOutcome, QueueDrainer};
pub use endpoint::{Endpoint, EndpointHandle, EndpointKind};
pub use entity::{Component, Entity, StatefulComponent};
pub use error::{ControlError, Result};
pub use lifecycle::{RunState, ServiceState};
pub use lock::{CrossResourceLock, LockGuard, ProcessLock};
pub use poller::{ConvergencePoller, PollSettings};
pub use service::{FlowControl, FlowService};
pub use store::EntityStore;
pub use types::{
    Connection, ConnectionSpec, ControllerService, Funnel, Port, PortType, Position,
    ProcessGroup, Processor, RemoteProcessGroup, ReportingTask, TenantRef, User, UserGroup,
};

#[cfg(any(test, feature = "test-utils"))]
pub use lock::{LockEvent, RecordingLock};
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockControlPlane;
