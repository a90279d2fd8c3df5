use anyhow::{Context, Result};
use serde::Serialize;

use codebook_core::config::EngineConfig;
use codebook_core::tree::{reindex_positions, sort_nested_with_limits, PositionUpdate, ReindexScope, TreeNode};

use crate::io::input;
use crate::output;

#[derive(Debug, Serialize)]
pub struct SortOut {
    pub nodes: Vec<TreeNode>,
    /// Rows whose stored position differs from the contiguous one.
    pub updates: Vec<PositionUpdate>,
}

pub fn run(cfg: &EngineConfig, nodes_path: &str) -> Result<()> {
    let mut nodes = input::read_nodes(nodes_path)?;
    let sorted = sort_nested_with_limits(&nodes, &cfg.limits).with_context(|| format!("cannot sort {nodes_path}"))?;
    let updates = reindex_positions(&mut nodes, ReindexScope::All);

    output::print(&SortOut { nodes: sorted, updates })
}
