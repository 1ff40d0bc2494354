//! Command implementations.

pub mod build;
pub mod clean;
pub mod plan;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use slipway::config::{PipelineConfig, MANIFEST_NAME};

/// Load the manifest, defaulting to `./slipway.toml`.
///
/// Returns the config and the directory the manifest lives in (the
/// packaging directory the pipeline must be invoked from).
pub fn load_config(manifest_path: &Option<PathBuf>) -> Result<(PipelineConfig, PathBuf)> {
    let path = match manifest_path {
        Some(path) => path.clone(),
        None => Path::new(MANIFEST_NAME).to_path_buf(),
    };

    if !path.is_file() {
        bail!(
            "{} not found\n\
             hint: run slipway from the packaging directory, or pass --manifest-path",
            path.display()
        );
    }

    let path = path
        .canonicalize()
        .with_context(|| format!("failed to resolve manifest path: {}", path.display()))?;

    let config = PipelineConfig::from_manifest(&path)?;
    let dir = path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok((config, dir))
}
