//! `infragraph.toml` loading.
//!
//! ```toml
//! [generate]
//! external_nodes = false
//!
//! [[providers]]
//! name = "aws"
//! nodes = ["aws_instance", "aws_lb"]
//! edges = ["aws_security_group"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::generate::GenerateOptions;
use crate::provider::{CatalogProvider, ProviderCatalog, Registry};

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "infragraph.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub generate: GenerateOptions,
    #[serde(default)]
    pub providers: Vec<ProviderCatalog>,
}

impl Config {
    /// Registry holding the external provider plus one catalog provider per
    /// `[[providers]]` entry, keyed by the entry's `name`.
    #[must_use]
    pub fn registry(&self) -> Registry {
        let mut registry = Registry::new();
        for catalog in &self.providers {
            if catalog.name.is_empty() {
                warn!("provider catalog without a name ignored");
                continue;
            }
            registry.register(catalog.name.clone(), CatalogProvider::new(catalog.clone()));
        }
        registry
    }
}

/// Load `path`, or the defaults if it does not exist.
///
/// # Errors
///
/// Fails if the file exists but cannot be read or parsed.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<Config>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ResourceKind;
    use crate::provider::Resolver;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config.generate, GenerateOptions::default());
        assert!(config.providers.is_empty());
    }

    #[test]
    fn parses_generate_options_and_providers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(
            &path,
            r#"
[generate]
external_nodes = false

[[providers]]
name = "aws"
nodes = ["aws_instance"]
edges = ["aws_security_group"]
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert!(!config.generate.external_nodes);
        assert!(config.generate.clean);
        assert_eq!(config.providers.len(), 1);

        let registry = config.registry();
        assert_eq!(registry.prefixes(), vec!["aws", "im"]);
        let resolver = Resolver::new(&registry, false);
        assert_eq!(
            resolver.kind("aws_security_group.sg").unwrap(),
            ResourceKind::Edge
        );
        assert_eq!(resolver.kind("aws_instance.web").unwrap(), ResourceKind::Node);
    }

    #[test]
    fn unnamed_catalogs_are_ignored() {
        let config = Config {
            providers: vec![ProviderCatalog::default()],
            ..Config::default()
        };
        assert_eq!(config.registry().prefixes(), vec!["im"]);
    }

    #[test]
    fn demo_config_covers_every_cloud() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../demos").join(CONFIG_FILE);
        let config = load_config(&path).unwrap();
        let registry = config.registry();
        assert_eq!(
            registry.prefixes(),
            vec!["aws", "azurerm", "flexibleengine", "google", "im", "openstack"]
        );

        let res = Resolver::new(&registry, false);
        for (canonical, kind) in [
            ("aws_lb.front", ResourceKind::Node),
            ("aws_security_group_rule.r", ResourceKind::Edge),
            ("azurerm_virtual_network.vnet", ResourceKind::Node),
            ("azurerm_virtual_network_peering.p", ResourceKind::Edge),
            ("google_compute_firewall.fw", ResourceKind::Edge),
            ("flexibleengine_networking_secgroup_rule_v2.r", ResourceKind::Edge),
            ("openstack_lb_loadbalancer_v2.lb", ResourceKind::Node),
            ("openstack_lb_member_v2.m", ResourceKind::Edge),
        ] {
            assert_eq!(res.kind(canonical), Ok(kind), "{canonical}");
        }
    }

    #[test]
    fn invalid_toml_is_reported_with_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[generate\nraw = ").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(format!("{err}").contains("Failed to parse"));
    }
}
