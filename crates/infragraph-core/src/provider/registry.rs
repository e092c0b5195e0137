//! Provider lookup by canonical.

use std::collections::HashMap;

use super::external::EXTERNAL_PREFIX;
use super::{ExternalProvider, Provider, ProviderKind, RawProvider};
use crate::error::ProviderError;

/// Resource type of a canonical: its second-to-last `.` segment, so module
/// prefixes are skipped (`module.net.aws_lb.front` → `aws_lb`).
///
/// # Errors
///
/// [`ProviderError::InvalidCanonical`] if the canonical has no `type.name`
/// shape.
pub fn resource_type(canonical: &str) -> Result<&str, ProviderError> {
    let mut parts = canonical.rsplit('.');
    let name = parts.next().unwrap_or_default();
    match parts.next() {
        Some(ty) if !ty.is_empty() && !name.is_empty() => Ok(ty),
        _ => Err(ProviderError::InvalidCanonical(canonical.to_string())),
    }
}

/// Provider prefix of a canonical: the resource type up to its first `_`
/// (`aws_lb.front` → `aws`, `im_out.tcp/80->80` → `im`).
///
/// # Errors
///
/// [`ProviderError::InvalidCanonical`] if the canonical has no `type.name`
/// shape or the type starts with `_`.
pub fn prefix(canonical: &str) -> Result<&str, ProviderError> {
    let ty = resource_type(canonical)?;
    match ty.split('_').next() {
        Some(p) if !p.is_empty() => Ok(p),
        _ => Err(ProviderError::InvalidCanonical(canonical.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Providers keyed by canonical prefix.
///
/// A fresh registry always knows the external (`im`) provider.
#[derive(Debug)]
pub struct Registry {
    providers: HashMap<String, Box<dyn Provider>>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self {
            providers: HashMap::new(),
        };
        registry.register(EXTERNAL_PREFIX, ExternalProvider);
        registry
    }
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under `prefix`, replacing any previous one.
    pub fn register(&mut self, prefix: impl Into<String>, provider: impl Provider + 'static) {
        self.providers.insert(prefix.into(), Box::new(provider));
    }

    #[must_use]
    pub fn get(&self, prefix: &str) -> Option<&dyn Provider> {
        self.providers.get(prefix).map(|p| &**p)
    }

    /// Registered prefixes, sorted.
    #[must_use]
    pub fn prefixes(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// How a resource takes part in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Real infrastructure, survives contraction.
    Node,
    /// Connectivity policy, contracted away.
    Edge,
    /// Synthetic external endpoint, never traversed or merged.
    External,
    /// Known provider, but the type is neither node nor edge.
    Ignored,
}

impl ResourceKind {
    /// True for resources the contraction engine merges away.
    #[must_use]
    pub const fn is_pass_through(self) -> bool {
        matches!(self, Self::Edge | Self::Ignored)
    }
}

/// Registry plus raw-mode switch, passed into every classification site.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a Registry,
    raw: bool,
}

impl<'a> Resolver<'a> {
    #[must_use]
    pub const fn new(registry: &'a Registry, raw: bool) -> Self {
        Self { registry, raw }
    }

    /// Provider and resource type for `canonical`.
    ///
    /// In raw mode every canonical resolves to [`RawProvider`].
    ///
    /// # Errors
    ///
    /// [`ProviderError::NotFound`] if no provider is registered for the
    /// prefix, [`ProviderError::InvalidCanonical`] for malformed canonicals.
    pub fn resolve<'c>(
        &self,
        canonical: &'c str,
    ) -> Result<(&'a dyn Provider, &'c str), ProviderError> {
        static RAW: RawProvider = RawProvider;

        let ty = resource_type(canonical)?;
        if self.raw {
            return Ok((&RAW, ty));
        }
        let p = prefix(canonical)?;
        let provider = self
            .registry
            .get(p)
            .ok_or_else(|| ProviderError::NotFound(canonical.to_string()))?;
        Ok((provider, ty))
    }

    /// Classify `canonical`.
    ///
    /// # Errors
    ///
    /// Same as [`Resolver::resolve`].
    pub fn kind(&self, canonical: &str) -> Result<ResourceKind, ProviderError> {
        let (provider, ty) = self.resolve(canonical)?;
        Ok(if provider.kind() == ProviderKind::External {
            ResourceKind::External
        } else if provider.is_node(ty) {
            ResourceKind::Node
        } else if provider.is_edge(ty) {
            ResourceKind::Edge
        } else {
            ResourceKind::Ignored
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CatalogProvider, ProviderCatalog};

    fn aws() -> CatalogProvider {
        CatalogProvider::new(ProviderCatalog {
            name: "aws".into(),
            nodes: vec!["aws_instance".into(), "aws_lb".into()],
            edges: vec!["aws_security_group".into()],
            ..ProviderCatalog::default()
        })
    }

    #[test]
    fn resource_type_and_prefix() {
        assert_eq!(resource_type("aws_lb.front"), Ok("aws_lb"));
        assert_eq!(resource_type("module.net.aws_lb.front"), Ok("aws_lb"));
        assert_eq!(prefix("module.net.aws_lb.front"), Ok("aws"));
        assert_eq!(prefix("im_out.tcp/80->80"), Ok("im"));
        assert_eq!(prefix("google.x"), Ok("google"));
        assert!(resource_type("bare").is_err());
        assert!(resource_type(".name").is_err());
        assert!(prefix("_x.y").is_err());
    }

    #[test]
    fn default_registry_knows_external() {
        let r = Registry::new();
        assert_eq!(r.prefixes(), vec!["im"]);
        assert_eq!(
            Resolver::new(&r, false).kind("im_out.tcp/443->443"),
            Ok(ResourceKind::External)
        );
    }

    #[test]
    fn classification_through_registry() {
        let mut r = Registry::new();
        r.register("aws", aws());
        let res = Resolver::new(&r, false);

        assert_eq!(res.kind("aws_instance.web"), Ok(ResourceKind::Node));
        assert_eq!(res.kind("module.a.aws_lb.front"), Ok(ResourceKind::Node));
        assert_eq!(res.kind("aws_security_group.sg"), Ok(ResourceKind::Edge));
        assert_eq!(res.kind("aws_iam_role.r"), Ok(ResourceKind::Ignored));
        assert_eq!(
            res.kind("azurerm_vm.x"),
            Err(ProviderError::NotFound("azurerm_vm.x".into()))
        );
    }

    #[test]
    fn raw_mode_makes_everything_a_node() {
        let r = Registry::new();
        let res = Resolver::new(&r, true);
        assert_eq!(res.kind("aws_security_group.sg"), Ok(ResourceKind::Node));
        assert_eq!(res.kind("whatever_thing.x"), Ok(ResourceKind::Node));
        let (p, ty) = res.resolve("module.m.foo_bar.x").unwrap();
        assert_eq!(p.kind(), ProviderKind::Raw);
        assert_eq!(ty, "foo_bar");
    }
}
