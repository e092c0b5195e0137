//! Error types for the graph store, providers and the generation pipeline.
//!
//! Every fallible core operation returns one of the typed errors below.
//! [`ErrorCode`] maps them onto stable machine codes so callers (the CLI in
//! particular) can report a single descriptive failure.

use std::fmt;

use crate::graph::{EdgeId, NodeId};

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    InvalidNode,
    InvalidEdge,
    DuplicateNode,
    DuplicateEdge,
    NodeNotFound,
    EdgeNotFound,
    NoMutualEdge,
    MissingEdgeBetweenNodes,
    ContractionDidNotConverge,
    ProviderNotFound,
    InvalidDescription,
    ConfigParseError,
    InputParseError,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::InvalidNode => "E1001",
            Self::InvalidEdge => "E1002",
            Self::DuplicateNode => "E1003",
            Self::DuplicateEdge => "E1004",
            Self::NodeNotFound => "E2001",
            Self::EdgeNotFound => "E2002",
            Self::NoMutualEdge => "E3001",
            Self::MissingEdgeBetweenNodes => "E3002",
            Self::ContractionDidNotConverge => "E3003",
            Self::ProviderNotFound => "E4001",
            Self::InvalidDescription => "E5001",
            Self::ConfigParseError => "E6001",
            Self::InputParseError => "E6002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::InvalidNode => "Node is missing a required field",
            Self::InvalidEdge => "Edge is missing a required field or endpoint",
            Self::DuplicateNode => "Node already exists",
            Self::DuplicateEdge => "Edge already exists",
            Self::NodeNotFound => "Node not found",
            Self::EdgeNotFound => "Edge not found",
            Self::NoMutualEdge => "Nodes are not directly connected",
            Self::MissingEdgeBetweenNodes => "Missing edge between contracted nodes",
            Self::ContractionDidNotConverge => "Contraction did not reach a fixpoint",
            Self::ProviderNotFound => "No provider for resource",
            Self::InvalidDescription => "Invalid infrastructure description",
            Self::ConfigParseError => "Config file parse error",
            Self::InputParseError => "Resource list parse error",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::InvalidNode | Self::InvalidEdge | Self::InvalidDescription => {
                Some("Check that every resource has a `type.name` canonical and an `id`.")
            }
            Self::DuplicateNode | Self::DuplicateEdge => {
                Some("Remove duplicated resources or dependencies from the input.")
            }
            Self::NodeNotFound | Self::EdgeNotFound => None,
            Self::NoMutualEdge | Self::MissingEdgeBetweenNodes => {
                Some("Retry with --raw to inspect the uncontracted dependency graph.")
            }
            Self::ContractionDidNotConverge | Self::InternalUnexpected => {
                Some("Retry once. If persistent, report a bug with the input and logs.")
            }
            Self::ProviderNotFound => Some("Add the provider to the catalog in infragraph.toml."),
            Self::ConfigParseError => Some("Fix syntax in infragraph.toml and retry."),
            Self::InputParseError => {
                Some("Provide a JSON array of {canonical, attributes, dependencies} objects.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// GraphError
// ---------------------------------------------------------------------------

/// Validation and consistency errors raised by [`crate::graph::Graph`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("graph node canonical is required")]
    RequiredNodeCanonical,

    #[error("graph node ID is required")]
    RequiredNodeId,

    #[error("graph node {0:?} already exists")]
    NodeExists(String),

    #[error("graph node ID {0} already exists")]
    NodeIdExists(NodeId),

    #[error("graph node {0:?} not found")]
    NodeNotFound(String),

    #[error("graph edge ID is required")]
    RequiredEdgeId,

    #[error("graph edge source is required")]
    RequiredEdgeSource,

    #[error("graph edge target is required")]
    RequiredEdgeTarget,

    #[error("graph edge source {0} not found")]
    EdgeSourceNotFound(NodeId),

    #[error("graph edge target {0} not found")]
    EdgeTargetNotFound(NodeId),

    #[error("graph edge between {from} and {to} already exists")]
    EdgeExists { from: NodeId, to: NodeId },

    #[error("graph edge ID {0} already exists")]
    EdgeIdExists(EdgeId),

    #[error("graph edge {0} connects node {1} to itself")]
    SelfLoop(EdgeId, NodeId),

    #[error("graph edge {0} not found")]
    EdgeNotFound(EdgeId),

    /// `replace` was asked to merge two nodes that share no edge.
    #[error("no mutual edge between src {src} and rep {rep}")]
    NoMutualEdge { src: NodeId, rep: NodeId },

    /// A contracted chain did not leave an edge between its two real ends.
    #[error("missing edge between {from:?} and {to:?}")]
    MissingEdgeBetweenNodes { from: String, to: String },
}

impl GraphError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::RequiredNodeCanonical | Self::RequiredNodeId => ErrorCode::InvalidNode,
            Self::RequiredEdgeId
            | Self::RequiredEdgeSource
            | Self::RequiredEdgeTarget
            | Self::EdgeSourceNotFound(_)
            | Self::EdgeTargetNotFound(_)
            | Self::SelfLoop(..) => ErrorCode::InvalidEdge,
            Self::NodeExists(_) | Self::NodeIdExists(_) => ErrorCode::DuplicateNode,
            Self::EdgeExists { .. } | Self::EdgeIdExists(_) => ErrorCode::DuplicateEdge,
            Self::NodeNotFound(_) => ErrorCode::NodeNotFound,
            Self::EdgeNotFound(_) => ErrorCode::EdgeNotFound,
            Self::NoMutualEdge { .. } => ErrorCode::NoMutualEdge,
            Self::MissingEdgeBetweenNodes { .. } => ErrorCode::MissingEdgeBetweenNodes,
        }
    }
}

// ---------------------------------------------------------------------------
// ProviderError
// ---------------------------------------------------------------------------

/// Errors from resolving a canonical to its provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// No registered provider handles the canonical's type prefix.
    ///
    /// Recoverable: the pipeline skips the resource.
    #[error("no provider for {0:?}")]
    NotFound(String),

    /// The canonical does not have a `type.name` shape.
    #[error("invalid canonical {0:?}, expected `type.name`")]
    InvalidCanonical(String),
}

// ---------------------------------------------------------------------------
// GenerateError
// ---------------------------------------------------------------------------

/// Fatal errors from the generation pipeline. No partial graph is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Contraction kept finding candidates past the round limit.
    #[error("contraction did not converge after {rounds} rounds")]
    DidNotConverge { rounds: usize },

    /// The resources and the graph disagree (missing or repeated config).
    #[error("invalid infrastructure description: {0}")]
    InvalidDescription(String),
}

impl GenerateError {
    /// Machine-readable code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Graph(err) => err.code(),
            Self::Provider(ProviderError::NotFound(_)) => ErrorCode::ProviderNotFound,
            Self::Provider(ProviderError::InvalidCanonical(_)) | Self::InvalidDescription(_) => {
                ErrorCode::InvalidDescription
            }
            Self::DidNotConverge { .. } => ErrorCode::ContractionDidNotConverge,
        }
    }
}
