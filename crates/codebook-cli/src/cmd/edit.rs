use anyhow::{Context, Result};

use codebook_core::config::EngineConfig;
use codebook_core::model::NodeId;
use codebook_core::tree::CodebookTree;

use crate::io::input;
use crate::output;

fn load(cfg: &EngineConfig, nodes_path: &str) -> Result<CodebookTree> {
    let nodes = input::read_nodes(nodes_path)?;
    CodebookTree::new(nodes, cfg.limits.clone()).with_context(|| format!("{nodes_path} is not a valid codebook"))
}

pub fn run_move(cfg: &EngineConfig, nodes_path: &str, node: NodeId, parent: Option<NodeId>, slot: Option<usize>) -> Result<()> {
    let mut tree = load(cfg, nodes_path)?;
    let changes = tree
        .move_node(node, parent, slot)
        .with_context(|| format!("cannot move node {node}"))?;
    output::print(&changes)
}

pub fn run_delete(cfg: &EngineConfig, nodes_path: &str, node: NodeId, recursive: bool) -> Result<()> {
    let mut tree = load(cfg, nodes_path)?;
    let changes = tree
        .delete(node, recursive)
        .with_context(|| format!("cannot delete node {node}"))?;
    output::print(&changes)
}
