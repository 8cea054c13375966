//! Component payloads for every resource kind.
//!
//! Field names follow the control plane's camelCase wire format. Fields this
//! client does not model are dropped on read; optional fields are omitted on
//! write so the control plane keeps its current value.

use std::collections::{BTreeMap, BTreeSet};

use flowplane_core::{ComponentId, ResourceKind};
use serde::{Deserialize, Serialize};

use crate::endpoint::EndpointHandle;
use crate::entity::{Component, StatefulComponent};
use crate::lifecycle::{RunState, ServiceState};

/// Canvas position of a component or connection bend point.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal offset.
    pub x: f64,
    /// Vertical offset.
    pub y: f64,
}

impl Position {
    /// Create a position.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Property map in which a `null` value means "unset".
pub type Properties = BTreeMap<String, Option<String>>;

fn strip_null_properties(properties: &mut Properties) {
    properties.retain(|_, value| value.is_some());
}

// ============================================================================
// Processors
// ============================================================================

/// A relationship a processor can route flowfiles to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Relationship name, e.g. `"success"`.
    pub name: String,
    /// Whether flowfiles routed here are dropped.
    #[serde(default)]
    pub auto_terminate: bool,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Scheduling and property configuration of a processor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessorConfig {
    /// Processor properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    /// `TIMER_DRIVEN`, `CRON_DRIVEN` or `EVENT_DRIVEN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_strategy: Option<String>,
    /// Scheduling period, e.g. `"0 sec"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_period: Option<String>,
    /// Maximum concurrent tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrently_schedulable_task_count: Option<u32>,
    /// Relationships whose flowfiles are dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_terminated_relationships: Option<BTreeSet<String>>,
    /// Free-form comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

/// A processor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Processor {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ComponentId>,
    /// Containing process group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<ComponentId>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fully qualified processor class.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub processor_type: Option<String>,
    /// Canvas position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Run state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RunState>,
    /// Configuration.
    #[serde(default)]
    pub config: ProcessorConfig,
    /// Relationships reported by the control plane.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<Relationship>,
}

impl Processor {
    /// Describe a new processor of `processor_type` inside `parent_group_id`.
    #[must_use]
    pub fn new(
        parent_group_id: ComponentId,
        name: impl Into<String>,
        processor_type: impl Into<String>,
    ) -> Self {
        Self {
            parent_group_id: Some(parent_group_id),
            name: Some(name.into()),
            processor_type: Some(processor_type.into()),
            ..Self::default()
        }
    }

    /// Set a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.properties.insert(key.into(), Some(value.into()));
        self
    }
}

impl Component for Processor {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Processor
    }

    fn id(&self) -> Option<&ComponentId> {
        self.id.as_ref()
    }

    fn parent_group_id(&self) -> Option<&ComponentId> {
        self.parent_group_id.as_ref()
    }

    fn normalize(&mut self) {
        strip_null_properties(&mut self.config.properties);

        if !self.relationships.is_empty() {
            let terminated = self
                .relationships
                .iter()
                .filter(|r| r.auto_terminate)
                .map(|r| r.name.clone())
                .collect();
            self.config.auto_terminated_relationships = Some(terminated);
        }
    }
}

impl StatefulComponent for Processor {
    type State = RunState;

    fn state(&self) -> Option<RunState> {
        self.state
    }
}

// ============================================================================
// Ports
// ============================================================================

/// Direction of a process-group port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PortType {
    /// Receives data into the group.
    InputPort,
    /// Sends data out of the group.
    OutputPort,
}

/// An input or output port of a process group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ComponentId>,
    /// Containing process group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<ComponentId>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Port direction.
    #[serde(rename = "type")]
    pub port_type: PortType,
    /// Free-form comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    /// Canvas position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Run state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RunState>,
}

impl Port {
    fn new(port_type: PortType, parent_group_id: ComponentId, name: String) -> Self {
        Self {
            id: None,
            parent_group_id: Some(parent_group_id),
            name: Some(name),
            port_type,
            comments: None,
            position: None,
            state: None,
        }
    }

    /// Describe a new input port.
    #[must_use]
    pub fn input(parent_group_id: ComponentId, name: impl Into<String>) -> Self {
        Self::new(PortType::InputPort, parent_group_id, name.into())
    }

    /// Describe a new output port.
    #[must_use]
    pub fn output(parent_group_id: ComponentId, name: impl Into<String>) -> Self {
        Self::new(PortType::OutputPort, parent_group_id, name.into())
    }
}

impl Component for Port {
    fn kind(&self) -> ResourceKind {
        match self.port_type {
            PortType::InputPort => ResourceKind::InputPort,
            PortType::OutputPort => ResourceKind::OutputPort,
        }
    }

    fn id(&self) -> Option<&ComponentId> {
        self.id.as_ref()
    }

    fn parent_group_id(&self) -> Option<&ComponentId> {
        self.parent_group_id.as_ref()
    }
}

impl StatefulComponent for Port {
    type State = RunState;

    fn state(&self) -> Option<RunState> {
        self.state
    }
}

// ============================================================================
// Funnels
// ============================================================================

/// A funnel. Funnels have no operational state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Funnel {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ComponentId>,
    /// Containing process group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<ComponentId>,
    /// Canvas position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl Funnel {
    /// Describe a new funnel.
    #[must_use]
    pub fn new(parent_group_id: ComponentId) -> Self {
        Self {
            parent_group_id: Some(parent_group_id),
            ..Self::default()
        }
    }
}

impl Component for Funnel {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Funnel
    }

    fn id(&self) -> Option<&ComponentId> {
        self.id.as_ref()
    }

    fn parent_group_id(&self) -> Option<&ComponentId> {
        self.parent_group_id.as_ref()
    }
}

// ============================================================================
// Controller services
// ============================================================================

/// A controller service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerService {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ComponentId>,
    /// Containing process group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<ComponentId>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fully qualified service class.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub service_type: Option<String>,
    /// Service properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    /// Enablement state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ServiceState>,
}

impl ControllerService {
    /// Describe a new controller service.
    #[must_use]
    pub fn new(
        parent_group_id: ComponentId,
        name: impl Into<String>,
        service_type: impl Into<String>,
    ) -> Self {
        Self {
            parent_group_id: Some(parent_group_id),
            name: Some(name.into()),
            service_type: Some(service_type.into()),
            ..Self::default()
        }
    }
}

impl Component for ControllerService {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ControllerService
    }

    fn id(&self) -> Option<&ComponentId> {
        self.id.as_ref()
    }

    fn parent_group_id(&self) -> Option<&ComponentId> {
        self.parent_group_id.as_ref()
    }

    fn normalize(&mut self) {
        strip_null_properties(&mut self.properties);
    }
}

impl StatefulComponent for ControllerService {
    type State = ServiceState;

    fn state(&self) -> Option<ServiceState> {
        self.state
    }
}

// ============================================================================
// Process groups
// ============================================================================

/// A process group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessGroup {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ComponentId>,
    /// Containing process group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<ComponentId>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    /// Canvas position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl ProcessGroup {
    /// Describe a new process group.
    #[must_use]
    pub fn new(parent_group_id: ComponentId, name: impl Into<String>) -> Self {
        Self {
            parent_group_id: Some(parent_group_id),
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

impl Component for ProcessGroup {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ProcessGroup
    }

    fn id(&self) -> Option<&ComponentId> {
        self.id.as_ref()
    }

    fn parent_group_id(&self) -> Option<&ComponentId> {
        self.parent_group_id.as_ref()
    }
}

/// A remote process group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProcessGroup {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ComponentId>,
    /// Containing process group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<ComponentId>,
    /// Display name reported by the remote instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Comma-separated URLs of the remote instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_uris: Option<String>,
    /// `RAW` or `HTTP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_protocol: Option<String>,
    /// Communications timeout, e.g. `"30 sec"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communications_timeout: Option<String>,
    /// Canvas position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl RemoteProcessGroup {
    /// Describe a new remote process group targeting `target_uris`.
    #[must_use]
    pub fn new(parent_group_id: ComponentId, target_uris: impl Into<String>) -> Self {
        Self {
            parent_group_id: Some(parent_group_id),
            target_uris: Some(target_uris.into()),
            ..Self::default()
        }
    }
}

impl Component for RemoteProcessGroup {
    fn kind(&self) -> ResourceKind {
        ResourceKind::RemoteProcessGroup
    }

    fn id(&self) -> Option<&ComponentId> {
        self.id.as_ref()
    }

    fn parent_group_id(&self) -> Option<&ComponentId> {
        self.parent_group_id.as_ref()
    }
}

// ============================================================================
// Reporting tasks
// ============================================================================

/// A controller-level reporting task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportingTask {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ComponentId>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Fully qualified reporting task class.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub task_type: Option<String>,
    /// Free-form comments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    /// `TIMER_DRIVEN` or `CRON_DRIVEN`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_strategy: Option<String>,
    /// Scheduling period, e.g. `"5 mins"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduling_period: Option<String>,
    /// Task properties.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: Properties,
    /// Run state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RunState>,
}

impl ReportingTask {
    /// Describe a new reporting task of `task_type`.
    #[must_use]
    pub fn new(name: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            task_type: Some(task_type.into()),
            ..Self::default()
        }
    }

    /// Set a property.
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), Some(value.into()));
        self
    }
}

impl Component for ReportingTask {
    fn kind(&self) -> ResourceKind {
        ResourceKind::ReportingTask
    }

    fn id(&self) -> Option<&ComponentId> {
        self.id.as_ref()
    }

    fn parent_group_id(&self) -> Option<&ComponentId> {
        None
    }

    fn normalize(&mut self) {
        strip_null_properties(&mut self.properties);
    }
}

impl StatefulComponent for ReportingTask {
    type State = RunState;

    fn state(&self) -> Option<RunState> {
        self.state
    }
}

// ============================================================================
// Tenants
// ============================================================================

/// Reference to a tenant by id, as listed in a group's membership.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantRef {
    /// Tenant id.
    pub id: ComponentId,
}

/// A user tenant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ComponentId>,
    /// Identity the user authenticates as, e.g. a certificate DN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
}

impl User {
    /// Describe a new user.
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            id: None,
            identity: Some(identity.into()),
        }
    }

    /// This user as a group member reference, once created.
    #[must_use]
    pub fn as_tenant(&self) -> Option<TenantRef> {
        self.id.clone().map(|id| TenantRef { id })
    }
}

impl Component for User {
    fn kind(&self) -> ResourceKind {
        ResourceKind::User
    }

    fn id(&self) -> Option<&ComponentId> {
        self.id.as_ref()
    }

    fn parent_group_id(&self) -> Option<&ComponentId> {
        None
    }
}

/// A group of user tenants.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGroup {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ComponentId>,
    /// Group identity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// Member users. Always sent so that removing the last member is applied.
    #[serde(default)]
    pub users: Vec<TenantRef>,
}

impl UserGroup {
    /// Describe a new, empty group.
    #[must_use]
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            id: None,
            identity: Some(identity.into()),
            users: Vec::new(),
        }
    }

    /// Add `user` to the members if not already present.
    pub fn add_member(&mut self, user: TenantRef) {
        if !self.users.contains(&user) {
            self.users.push(user);
        }
    }

    /// Remove the member with `id`.
    pub fn remove_member(&mut self, id: &ComponentId) {
        self.users.retain(|member| &member.id != id);
    }
}

impl Component for UserGroup {
    fn kind(&self) -> ResourceKind {
        ResourceKind::UserGroup
    }

    fn id(&self) -> Option<&ComponentId> {
        self.id.as_ref()
    }

    fn parent_group_id(&self) -> Option<&ComponentId> {
        None
    }

    fn normalize(&mut self) {
        self.users.sort();
        self.users.dedup();
    }
}

// ============================================================================
// Connections
// ============================================================================

/// A connection between two components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Server-assigned id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ComponentId>,
    /// Containing process group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_group_id: Option<ComponentId>,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Upstream endpoint.
    pub source: EndpointHandle,
    /// Downstream endpoint.
    pub destination: EndpointHandle,
    /// Source relationships routed into this connection.
    #[serde(default)]
    pub selected_relationships: BTreeSet<String>,
    /// Queue size in flowfiles at which the source is throttled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_pressure_object_threshold: Option<u64>,
    /// Queue size in bytes at which the source is throttled, e.g. `"1 GB"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_pressure_data_size_threshold: Option<String>,
    /// Bend points on the canvas.
    #[serde(default)]
    pub bends: Vec<Position>,
}

impl Connection {
    /// Describe a new connection from `source` to `destination`.
    #[must_use]
    pub fn new(
        parent_group_id: ComponentId,
        source: EndpointHandle,
        destination: EndpointHandle,
    ) -> Self {
        Self {
            id: None,
            parent_group_id: Some(parent_group_id),
            name: None,
            source,
            destination,
            selected_relationships: BTreeSet::new(),
            back_pressure_object_threshold: None,
            back_pressure_data_size_threshold: None,
            bends: Vec::new(),
        }
    }

    /// Route `relationship` of the source into this connection.
    #[must_use]
    pub fn with_relationship(mut self, relationship: impl Into<String>) -> Self {
        self.selected_relationships.insert(relationship.into());
        self
    }
}

impl Component for Connection {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Connection
    }

    fn id(&self) -> Option<&ComponentId> {
        self.id.as_ref()
    }

    fn parent_group_id(&self) -> Option<&ComponentId> {
        self.parent_group_id.as_ref()
    }
}

/// The fields of a connection a caller wants changed.
///
/// Unset fields keep their live value. The live connection is always fetched
/// fresh before these changes are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSpec {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New upstream endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<EndpointHandle>,
    /// New downstream endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<EndpointHandle>,
    /// Replacement set of routed relationships.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_relationships: Option<BTreeSet<String>>,
    /// New object back-pressure threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_pressure_object_threshold: Option<u64>,
    /// New data-size back-pressure threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_pressure_data_size_threshold: Option<String>,
    /// Replacement bend points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bends: Option<Vec<Position>>,
}

impl ConnectionSpec {
    /// Set the object back-pressure threshold.
    #[must_use]
    pub const fn with_object_threshold(mut self, threshold: u64) -> Self {
        self.back_pressure_object_threshold = Some(threshold);
        self
    }

    /// Set the data-size back-pressure threshold.
    #[must_use]
    pub fn with_data_size_threshold(mut self, threshold: impl Into<String>) -> Self {
        self.back_pressure_data_size_threshold = Some(threshold.into());
        self
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Replace the routed relationships.
    #[must_use]
    pub fn with_relationships<I, S>(mut self, relationships: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_relationships = Some(relationships.into_iter().map(Into::into).collect());
        self
    }

    /// Replace the bend points; an empty list removes them.
    #[must_use]
    pub fn with_bends(mut self, bends: Vec<Position>) -> Self {
        self.bends = Some(bends);
        self
    }

    /// Move the destination to another endpoint.
    #[must_use]
    pub fn with_destination(mut self, destination: EndpointHandle) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Whether applying this spec would change nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the fields of `connection` this spec sets.
    pub fn apply(&self, connection: &mut Connection) {
        if let Some(name) = &self.name {
            connection.name = Some(name.clone());
        }
        if let Some(source) = &self.source {
            connection.source = source.clone();
        }
        if let Some(destination) = &self.destination {
            connection.destination = destination.clone();
        }
        if let Some(relationships) = &self.selected_relationships {
            connection.selected_relationships = relationships.clone();
        }
        if let Some(threshold) = self.back_pressure_object_threshold {
            connection.back_pressure_object_threshold = Some(threshold);
        }
        if let Some(threshold) = &self.back_pressure_data_size_threshold {
            connection.back_pressure_data_size_threshold = Some(threshold.clone());
        }
        if let Some(bends) = &self.bends {
            connection.bends = bends.clone();
        }
    }
}
