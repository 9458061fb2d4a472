use super::types::NetworkConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Default document location relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/network_setup.json";

/// Loads and validates the topology document at `path`.
///
/// Validation is minimal: the document must parse, name at least one node,
/// and its `client_gateway` must refer to a listed node. Anything beyond
/// that (dead hosts, bad ports) surfaces later as transport errors.
pub fn load_config(path: &Path) -> Result<NetworkConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;

    let cfg: NetworkConfig = serde_json::from_str(&raw)
        .with_context(|| format!("cannot parse config file {}", path.display()))?;

    if cfg.nodes.is_empty() {
        anyhow::bail!("config {} lists no nodes", path.display());
    }

    if cfg.gateway().is_none() {
        anyhow::bail!(
            "config {} names unknown client_gateway {:?}",
            path.display(),
            cfg.client_gateway
        );
    }

    Ok(cfg)
}
