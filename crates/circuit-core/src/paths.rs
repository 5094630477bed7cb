//! Config file path resolution.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

/// Config file used when no `--config` override is given.
pub const DEFAULT_CONFIG_FILE: &str = "/etc/send-circuit.yaml";

/// Resolve the config file path, expanding `~` and environment variables
/// in an override.
///
/// # Errors
///
/// Returns an error if shell expansion fails or the path is a directory.
pub fn resolve_config_path(override_path: Option<&Path>) -> Result<PathBuf> {
    let path = match override_path {
        Some(path) => expand_path(path)?,
        None => PathBuf::from(DEFAULT_CONFIG_FILE),
    };

    if path.is_dir() {
        return Err(anyhow!(
            "config path {} is a directory, expected a YAML file",
            path.display()
        ));
    }

    Ok(path)
}

/// Expand a `Path`, resolving ~ and environment variables.
///
/// # Errors
///
/// Returns an error if shell expansion fails.
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    path.to_str()
        .map_or_else(|| Ok(path.to_path_buf()), expand_str_path)
}

/// Expand a string path, resolving ~ and environment variables.
///
/// # Errors
///
/// Returns an error if shell expansion fails.
pub fn expand_str_path(text: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(text).context("expanding path")?;
    Ok(PathBuf::from(expanded.to_string()))
}
