use serde::{Deserialize, Serialize};

/// Switches for [`super::generate`].
///
/// Also the `[generate]` table of `infragraph.toml`; every field is
/// optional there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateOptions {
    /// Treat every resource as a real node and skip contraction entirely.
    #[serde(default)]
    pub raw: bool,

    /// Drop unconnected nodes and sweep hanging pass-through nodes.
    #[serde(default = "default_true")]
    pub clean: bool,

    /// Contract pass-through chains into direct node-to-node edges.
    #[serde(default = "default_true")]
    pub connections: bool,

    /// Add synthetic external nodes for rules open to the world.
    #[serde(default = "default_true")]
    pub external_nodes: bool,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            raw: false,
            clean: default_true(),
            connections: default_true(),
            external_nodes: default_true(),
        }
    }
}

const fn default_true() -> bool {
    true
}
