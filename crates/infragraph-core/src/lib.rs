//! infragraph-core library.
//!
//! Turns a flat list of infrastructure resources into a connectivity graph:
//! real resources (instances, load balancers, databases) become nodes, and
//! policy resources that only mediate traffic (security groups, firewall
//! rules) are contracted away into the edges between them.
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums in [`error`]; config loading uses
//!   `anyhow::Result` with context.
//! - **Logging**: `tracing` macros (`info!` per pipeline stage, `debug!` per
//!   contraction, `warn!` for tolerated inconsistencies).

#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod generate;
pub mod graph;
pub mod provider;

pub use config::{Config, load_config};
pub use error::{ErrorCode, GenerateError, GraphError, ProviderError};
pub use generate::{GenerateOptions, Generated, Resource, generate};
pub use graph::{Edge, EdgeId, Graph, Node, NodeId};
