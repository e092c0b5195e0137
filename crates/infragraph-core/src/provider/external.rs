use super::{Provider, ProviderKind};

/// Canonical prefix of synthetic external nodes (`im_out.tcp/80->80`).
pub const EXTERNAL_PREFIX: &str = "im";

/// Owner of synthetic external nodes such as the open internet.
///
/// External resources are neither nodes nor edges for classification: the
/// connection finder steps over them and contraction never merges them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalProvider;

impl Provider for ExternalProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::External
    }
}
