use anyhow::{Context, Result};
use serde::Serialize;

use codebook_core::config::EngineConfig;
use codebook_core::tree::order::ensure_contiguous;
use codebook_core::tree::validate_tree;

use crate::io::input;
use crate::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOut {
    pub ok: bool,
    pub nodes: usize,
    pub phases: usize,
    pub variables: usize,
    pub depth: usize,
    /// Stored positions are already `0..n` per parent.
    pub contiguous: bool,
}

pub fn run(cfg: &EngineConfig, nodes_path: &str) -> Result<()> {
    let nodes = input::read_nodes(nodes_path)?;

    let sorted = match validate_tree(&nodes, &cfg.limits) {
        Ok(sorted) => sorted,
        Err(e) => {
            output::status(false, &e.to_string());
            return Err(e).with_context(|| format!("{nodes_path} is not a valid codebook"));
        }
    };

    let out = CheckOut {
        ok: true,
        nodes: sorted.len(),
        phases: sorted.iter().filter(|n| n.node_type().is_phase()).count(),
        variables: sorted.iter().filter(|n| n.node_type().is_variable()).count(),
        depth: sorted.iter().map(|n| n.level + 1).max().unwrap_or(0),
        contiguous: ensure_contiguous(&nodes).is_ok(),
    };
    output::status(true, &format!("{} nodes in {} phases", out.nodes, out.phases));
    output::print(&out)
}
