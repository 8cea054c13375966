//! Core types and identifiers for flowplane.
//!
//! This crate provides the foundational types shared by the flowplane crates:
//!
//! - **Identifiers**: [`ComponentId`] and the optimistic-concurrency [`Revision`]
//! - **Resource kinds**: [`ResourceKind`] and the REST collections they live under
//! - **Error types**: [`CoreError`]
//!
//! # Example
//!
//! ```
//! use flowplane_core::{ComponentId, ResourceKind, Revision};
//!
//! let id = ComponentId::parse("3f2a0c1e-0171-1000-ffff-ffffd3c1a2b4").unwrap();
//! let revision = Revision::new(4);
//!
//! assert_eq!(ResourceKind::Processor.collection(), "processors");
//! assert_eq!(
//!     ResourceKind::Processor.delete_path(&id, revision),
//!     "/processors/3f2a0c1e-0171-1000-ffff-ffffd3c1a2b4?version=4"
//! );
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod kind;

pub use error::{CoreError, Result};
pub use ids::{ComponentId, Revision};
pub use kind::ResourceKind;
