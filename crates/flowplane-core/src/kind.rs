//! Resource kinds exposed by the control plane and their URL templates.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::ids::{ComponentId, Revision};

/// A kind of component managed through the control-plane REST API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceKind {
    /// A processor.
    Processor,
    /// An input port of a process group.
    InputPort,
    /// An output port of a process group.
    OutputPort,
    /// A funnel.
    Funnel,
    /// A connection between two components.
    Connection,
    /// A controller service.
    ControllerService,
    /// A process group.
    ProcessGroup,
    /// A remote process group.
    RemoteProcessGroup,
    /// A controller-level reporting task.
    ReportingTask,
    /// A user tenant.
    User,
    /// A group of user tenants.
    UserGroup,
}

impl ResourceKind {
    /// All resource kinds.
    pub const ALL: [Self; 11] = [
        Self::Processor,
        Self::InputPort,
        Self::OutputPort,
        Self::Funnel,
        Self::Connection,
        Self::ControllerService,
        Self::ProcessGroup,
        Self::RemoteProcessGroup,
        Self::ReportingTask,
        Self::User,
        Self::UserGroup,
    ];

    /// The REST collection segment for this kind.
    #[must_use]
    pub const fn collection(self) -> &'static str {
        match self {
            Self::Processor => "processors",
            Self::InputPort => "input-ports",
            Self::OutputPort => "output-ports",
            Self::Funnel => "funnels",
            Self::Connection => "connections",
            Self::ControllerService => "controller-services",
            Self::ProcessGroup => "process-groups",
            Self::RemoteProcessGroup => "remote-process-groups",
            Self::ReportingTask => "reporting-tasks",
            Self::User => "users",
            Self::UserGroup => "user-groups",
        }
    }

    /// Whether components of this kind live inside a process group.
    #[must_use]
    pub const fn is_group_scoped(self) -> bool {
        !matches!(self, Self::ReportingTask | Self::User | Self::UserGroup)
    }

    /// Whether this kind is a tenant, addressed under `/tenants`.
    #[must_use]
    pub const fn is_tenant(self) -> bool {
        matches!(self, Self::User | Self::UserGroup)
    }

    fn base_path(self) -> String {
        if self.is_tenant() {
            format!("/tenants/{}", self.collection())
        } else {
            format!("/{}", self.collection())
        }
    }

    /// Parse a kind from its REST collection segment.
    #[must_use]
    pub fn from_collection(collection: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.collection() == collection)
    }

    /// Path used to create a component of this kind.
    ///
    /// Group-scoped kinds are created inside `parent_group_id` and yield
    /// `None` without one. Reporting tasks and tenants ignore it.
    #[must_use]
    pub fn create_path(self, parent_group_id: Option<&ComponentId>) -> Option<String> {
        match self {
            Self::ReportingTask => Some("/controller/reporting-tasks".to_string()),
            Self::User | Self::UserGroup => Some(self.base_path()),
            _ => parent_group_id
                .map(|parent| format!("/process-groups/{parent}/{}", self.collection())),
        }
    }

    /// Path used to read or update a component.
    #[must_use]
    pub fn entity_path(self, id: &ComponentId) -> String {
        format!("{}/{id}", self.base_path())
    }

    /// Path used to delete a component at the given revision.
    #[must_use]
    pub fn delete_path(self, id: &ComponentId, revision: Revision) -> String {
        format!("{}/{id}?version={}", self.base_path(), revision.version)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_ascii_lowercase().replace('_', "-");
        Self::from_collection(&normalized)
            .or_else(|| Self::from_collection(&format!("{normalized}s")))
            .ok_or_else(|| CoreError::UnknownKind(s.to_string()))
    }
}
