use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use codebook_core::config::{config_from_json, EngineConfig};
use codebook_core::model::{Annotation, CodebookNode, Unit};

pub fn read_json_file<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let v = serde_json::from_str(&raw).with_context(|| format!("invalid json in {}", path.display()))?;
    Ok(v)
}

pub fn read_nodes(path: &str) -> Result<Vec<CodebookNode>> {
    read_json_file(path).context("expected a JSON array of codebook nodes")
}

pub fn read_unit(path: &str) -> Result<Unit> {
    read_json_file(path).context("expected a unit record")
}

pub fn read_annotations(path: &str) -> Result<Vec<Annotation>> {
    read_json_file(path).context("expected a JSON array of annotations")
}

/// Load the engine configuration, or defaults when no file is given.
pub fn load_config(path: Option<&str>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    let raw = fs::read_to_string(path).with_context(|| format!("failed to read config {path}"))?;
    let cfg = config_from_json(&raw).with_context(|| format!("invalid config {path}"))?;
    tracing::debug!(path, "loaded engine config");
    Ok(cfg)
}
