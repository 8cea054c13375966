//! HTTP transport and authentication for the flowplane control-plane client.
//!
//! This crate provides the single capability the orchestration layer needs
//! from the network: `invoke(method, path, body) -> (status, body)`. It
//! deliberately knows nothing about the resources behind the paths.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────┐
//! │  flowplane-      │────▶│   Transport      │
//! │  control         │     │   (trait)        │
//! └──────────────────┘     └────────┬─────────┘
//!                                   │
//!                          ┌────────▼─────────┐
//!                          │  HttpTransport   │
//!                          │  (reqwest)       │
//!                          └────────┬─────────┘
//!                                   │ HTTP(S) + bearer token
//!                          ┌────────▼─────────┐
//!                          │  Control plane   │
//!                          │  REST API        │
//!                          └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use flowplane_client::{ClientConfig, HttpTransport, Method, Transport};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::with_host("localhost:8443");
//! let transport = HttpTransport::connect(config).await?;
//!
//! let response = transport.invoke(Method::GET, "/flow/about", None).await?;
//! println!("status {}: {}", response.status, response.text());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod http;
pub mod transport;

pub use config::ClientConfig;
pub use error::{Result, TransportError};
pub use http::HttpTransport;
pub use transport::{Response, Transport};

pub use reqwest::Method;
