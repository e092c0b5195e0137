use super::{Provider, ProviderKind};

/// Treats every resource type as a real node.
///
/// Used for raw mode and as the fallback when a description has no resource
/// any registered provider recognizes.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawProvider;

impl Provider for RawProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Raw
    }

    fn is_node(&self, _resource_type: &str) -> bool {
        true
    }
}
