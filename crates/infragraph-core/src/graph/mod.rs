//! Connectivity graph store.
//!
//! # Overview
//!
//! [`Graph`] is the single owner of every [`Node`] and [`Edge`]. All
//! structural changes go through its methods so the lookup indices never
//! drift from the collections. Algorithms in [`crate::generate`] only read
//! through shared references and mutate through the store API.
//!
//! ```text
//! add_node / add_edge      populate
//! clean / remove_node      prune
//! invert_edge              fix direction
//! replace(src, rep)        contract: merge src into rep
//! to_petgraph              hand off to renderers / stats
//! ```

mod edge;
mod export;
mod id;
mod node;
mod store;

pub use edge::Edge;
pub use id::{EdgeId, NodeId};
pub use node::Node;
pub use store::Graph;
