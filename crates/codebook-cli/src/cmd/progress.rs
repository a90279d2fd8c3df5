use anyhow::{Context, Result};

use codebook_core::assemble::build_codebook;
use codebook_core::config::EngineConfig;
use codebook_core::progress::{compute_progress, UnitProgress};

use crate::io::input;
use crate::output;

pub fn run(cfg: &EngineConfig, nodes_path: &str, unit_progress_path: &str, annotations_path: Option<&str>) -> Result<()> {
    let nodes = input::read_nodes(nodes_path)?;
    let unit_progress: UnitProgress = input::read_json_file(unit_progress_path)?;
    let annotations = match annotations_path {
        Some(p) => input::read_annotations(p)?,
        None => Vec::new(),
    };

    let codebook = build_codebook(&nodes, &cfg.limits).with_context(|| format!("cannot assemble {nodes_path}"))?;
    let state = compute_progress(&codebook, &annotations, &unit_progress, cfg.rules)
        .context("cannot compute progress")?;

    output::print(&state)
}
