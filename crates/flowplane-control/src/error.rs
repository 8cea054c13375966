//! Error types for the orchestration layer.
//!
//! This module defines every error a lifecycle or choreography operation can
//! surface, from the status-code taxonomy of a single call up to convergence
//! timeouts of a multi-step sequence.

use std::time::Duration;

use flowplane_client::TransportError;
use flowplane_core::{ComponentId, ResourceKind};
use thiserror::Error;

/// A result type using `ControlError`.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors that can occur in control-plane operations.
#[derive(Debug, Error)]
pub enum ControlError {
    /// The control plane reported no such resource (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// The control plane rejected the call with HTTP 409: a stale revision
    /// or a transition that is invalid from the current state.
    #[error("conflict on {path}: {body}")]
    Conflict {
        /// Request path that was rejected.
        path: String,
        /// Response body returned by the control plane.
        body: String,
    },

    /// Any other non-2xx response.
    #[error("control plane rejected the call with status {status}: {body}")]
    RemoteRejected {
        /// HTTP status code.
        status: u16,
        /// Response body returned by the control plane.
        body: String,
    },

    /// The desired state was not observed before the deadline.
    #[error(
        "{kind} {id} did not reach {desired} within {waited:?} (last observed: {})",
        observed.as_deref().unwrap_or("nothing")
    )]
    ConvergenceTimeout {
        /// Kind of the component being polled.
        kind: ResourceKind,
        /// Id of the component being polled.
        id: ComponentId,
        /// State that was requested.
        desired: String,
        /// Last state observed, if any fetch succeeded.
        observed: Option<String>,
        /// Time spent waiting.
        waited: Duration,
    },

    /// A connection endpoint has a kind the choreographer cannot drive.
    #[error("unsupported connection endpoint kind: {0}")]
    UnsupportedEndpointKind(String),

    /// Queued data was not drained within the attempt budget and the
    /// configuration forbids deleting anyway.
    #[error("queue of connection {connection_id} not drained after {attempts} attempts")]
    DrainIncomplete {
        /// Connection whose queue was being drained.
        connection_id: ComponentId,
        /// Number of polls performed.
        attempts: u32,
    },

    /// A field required to build the request path is missing.
    #[error("{kind} is missing required field {field}")]
    MissingField {
        /// Kind of the component.
        kind: ResourceKind,
        /// Name of the missing field.
        field: &'static str,
    },

    /// Network, timeout, or authentication failure below the status line.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A request or response body could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ControlError {
    /// Returns the HTTP status code this error corresponds to.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict { .. } | Self::DrainIncomplete { .. } => 409,
            Self::RemoteRejected { status, .. } => *status,
            Self::ConvergenceTimeout { .. } => 504,
            Self::UnsupportedEndpointKind(_) | Self::MissingField { .. } => 400,
            Self::Transport(_) => 502,
            Self::Serialization(_) => 500,
        }
    }

    /// Returns true if this error might be resolved by retrying.
    ///
    /// Conflicts are never retriable: retrying with a refreshed revision
    /// could apply a change the caller no longer intends.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_retriable(),
            Self::ConvergenceTimeout { .. } | Self::DrainIncomplete { .. } => true,
            Self::RemoteRejected { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns true if the resource does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns true if the control plane answered with a conflict.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        let id = ComponentId::parse("p1").unwrap();

        assert_eq!(ControlError::NotFound("/processors/p1".into()).http_status_code(), 404);
        assert_eq!(
            ControlError::Conflict {
                path: "/processors/p1".into(),
                body: "stale".into()
            }
            .http_status_code(),
            409
        );
        assert_eq!(
            ControlError::RemoteRejected {
                status: 403,
                body: String::new()
            }
            .http_status_code(),
            403
        );
        assert_eq!(
            ControlError::ConvergenceTimeout {
                kind: ResourceKind::Processor,
                id,
                desired: "RUNNING".into(),
                observed: None,
                waited: Duration::from_secs(120),
            }
            .http_status_code(),
            504
        );
        assert_eq!(
            ControlError::UnsupportedEndpointKind("OUTPUT_FUNNEL".into()).http_status_code(),
            400
        );
    }

    #[test]
    fn conflicts_are_not_retriable() {
        let conflict = ControlError::Conflict {
            path: "/connections/c1?version=1".into(),
            body: "revision mismatch".into(),
        };
        assert!(conflict.is_conflict());
        assert!(!conflict.is_retriable());

        let unavailable = ControlError::RemoteRejected {
            status: 503,
            body: String::new(),
        };
        assert!(unavailable.is_retriable());
        assert!(!ControlError::UnsupportedEndpointKind("X".into()).is_retriable());
    }

    #[test]
    fn timeout_message_names_last_observed_state() {
        let err = ControlError::ConvergenceTimeout {
            kind: ResourceKind::ControllerService,
            id: ComponentId::parse("cs1").unwrap(),
            desired: "ENABLED".into(),
            observed: Some("ENABLING".into()),
            waited: Duration::from_secs(120),
        };
        let message = err.to_string();
        assert!(message.contains("controller-services cs1"));
        assert!(message.contains("ENABLING"));
    }
}
