use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use codebook_core::assemble::build_codebook;
use codebook_core::config::EngineConfig;
use codebook_core::model::NodeId;
use codebook_core::unfold::{first_open_question, unfold_questions, QuestionInstance};

use crate::io::input;
use crate::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseQuestions {
    pub phase_id: NodeId,
    pub questions: Vec<QuestionInstance>,
    /// Index of the first unanswered question.
    pub current: usize,
}

pub fn run(cfg: &EngineConfig, nodes_path: &str, unit_path: &str, phase: Option<usize>) -> Result<()> {
    let nodes = input::read_nodes(nodes_path)?;
    let unit = input::read_unit(unit_path)?;
    let codebook = build_codebook(&nodes, &cfg.limits).with_context(|| format!("cannot assemble {nodes_path}"))?;

    let phases = match phase {
        Some(i) => {
            let p = codebook
                .phases
                .get(i)
                .ok_or_else(|| anyhow!("phase index {i} out of range ({} phases)", codebook.phases.len()))?;
            std::slice::from_ref(p)
        }
        None => codebook.phases.as_slice(),
    };

    let out: Vec<PhaseQuestions> = phases
        .iter()
        .map(|p| {
            let questions = unfold_questions(&p.variables, &unit);
            let current = first_open_question(&questions, &unit.annotations);
            PhaseQuestions {
                phase_id: p.id,
                questions,
                current,
            }
        })
        .collect();

    output::print(&out)
}
