use serde::{Deserialize, Serialize};

use crate::provider::Attributes;

/// One managed resource of an infrastructure description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// `type.name`, optionally prefixed by module path segments.
    pub canonical: String,

    /// Provider attributes. The `id` attribute, when a string, becomes the
    /// node's external id.
    #[serde(default)]
    pub attributes: Attributes,

    /// Canonicals this resource depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Resource {
    pub fn new(canonical: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    #[must_use]
    pub fn depends_on<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(dependencies.into_iter().map(Into::into));
        self
    }

    /// The provider's identifier for this resource.
    #[must_use]
    pub fn provider_id(&self) -> Option<&str> {
        self.attributes.get("id").and_then(serde_json::Value::as_str)
    }
}

/// Accepted input shapes: a bare list or `{"resources": [...]}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResourceList {
    List(Vec<Resource>),
    Wrapped { resources: Vec<Resource> },
}

impl ResourceList {
    #[must_use]
    pub fn into_resources(self) -> Vec<Resource> {
        match self {
            Self::List(r) | Self::Wrapped { resources: r } => r,
        }
    }
}
