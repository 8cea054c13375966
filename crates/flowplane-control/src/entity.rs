//! Revisioned entity model shared by every component kind.
//!
//! The control plane wraps every component in an envelope carrying its
//! revision. Callers hold an [`Entity`] and hand it back on every mutation;
//! the store overwrites it with whatever the control plane returns so the
//! revision the caller holds is always the last one observed.

use std::fmt::{Debug, Display};

use flowplane_core::{ComponentId, ResourceKind, Revision};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{ControlError, Result};

/// A component payload that can be stored under a revision envelope.
pub trait Component: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    /// The resource kind, which selects the REST collection.
    fn kind(&self) -> ResourceKind;

    /// Server-assigned id; `None` before creation.
    fn id(&self) -> Option<&ComponentId>;

    /// Id of the containing process group.
    fn parent_group_id(&self) -> Option<&ComponentId>;

    /// Clean up a representation returned by the control plane.
    fn normalize(&mut self) {}
}

/// A component with an operational state the control plane applies
/// asynchronously.
pub trait StatefulComponent: Component {
    /// The state vocabulary of this component kind.
    type State: Copy + PartialEq + Debug + Display + Serialize + Send + Sync + 'static;

    /// The state as last reported by the control plane.
    fn state(&self) -> Option<Self::State>;
}

/// A component together with the revision it was last observed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity<C> {
    /// Optimistic-concurrency token.
    #[serde(default)]
    pub revision: Revision,
    /// The component payload.
    pub component: C,
}

impl<C: Component> Entity<C> {
    /// Wrap a component that has not been created yet.
    #[must_use]
    pub fn new(component: C) -> Self {
        Self {
            revision: Revision::default(),
            component,
        }
    }

    /// The resource kind of the wrapped component.
    #[must_use]
    pub fn kind(&self) -> ResourceKind {
        self.component.kind()
    }

    /// The component id.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::MissingField` if the component was never created.
    pub fn id(&self) -> Result<&ComponentId> {
        self.component.id().ok_or(ControlError::MissingField {
            kind: self.kind(),
            field: "id",
        })
    }

    /// The containing process group id.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::MissingField` if no parent group is set.
    pub fn parent_group_id(&self) -> Result<&ComponentId> {
        self.component
            .parent_group_id()
            .ok_or(ControlError::MissingField {
                kind: self.kind(),
                field: "parentGroupId",
            })
    }
}

impl<C: StatefulComponent> Entity<C> {
    /// The state as last reported by the control plane.
    #[must_use]
    pub fn state(&self) -> Option<C::State> {
        self.component.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::RunState;
    use crate::types::Processor;

    #[test]
    fn envelope_deserializes_and_ignores_extra_fields() {
        let json = r#"{
            "revision": {"version": 5, "clientId": "abc"},
            "id": "p1",
            "uri": "https://nifi/nifi-api/processors/p1",
            "component": {"id": "p1", "parentGroupId": "root", "state": "RUNNING"}
        }"#;

        let entity: Entity<Processor> = serde_json::from_str(json).unwrap();
        assert_eq!(entity.revision, Revision::new(5));
        assert_eq!(entity.id().unwrap().as_str(), "p1");
        assert_eq!(entity.parent_group_id().unwrap().as_str(), "root");
        assert_eq!(entity.state(), Some(RunState::Running));
    }

    #[test]
    fn uncreated_entity_has_no_id() {
        let entity = Entity::new(Processor::default());
        assert_eq!(entity.revision, Revision::default());
        assert!(matches!(
            entity.id(),
            Err(ControlError::MissingField { field: "id", .. })
        ));
    }
}
