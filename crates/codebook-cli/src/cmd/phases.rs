use anyhow::{Context, Result};

use codebook_core::assemble::build_codebook;
use codebook_core::config::EngineConfig;

use crate::io::input;
use crate::output;

pub fn run(cfg: &EngineConfig, nodes_path: &str) -> Result<()> {
    let nodes = input::read_nodes(nodes_path)?;
    let codebook = build_codebook(&nodes, &cfg.limits).with_context(|| format!("cannot assemble {nodes_path}"))?;
    output::print(&codebook)
}
