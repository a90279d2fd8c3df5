//! Codebook assembler: nested node list -> phases of variables.
//!
//! Layout inheritance follows the tree: a phase or group that owns a layout
//! passes it to its whole subtree, and only its subtree. The inherit context is
//! therefore a stack keyed by nesting level, cleared at every root.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::config::TreeLimits;
use crate::errors::{CodebookError, CodebookResult};
use crate::model::{AnnotationTaskData, CodebookNode, Layout, NodeData, NodeId, PhaseKind, QuestionData};
use crate::tree::{validate_tree, TreeNode};

/// What a variable asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum VariableKind {
    #[serde(rename = "Question")]
    Question(QuestionData),
    #[serde(rename = "Annotation task")]
    AnnotationTask(AnnotationTaskData),
}

/// A resolved leaf of the codebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodebookVariable {
    pub id: NodeId,
    pub name: String,
    pub phase_id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_id: Option<NodeId>,
    pub global_position: usize,
    #[serde(default)]
    pub dependencies: BTreeSet<String>,
    pub kind: VariableKind,
}

impl CodebookVariable {
    pub fn question(&self) -> Option<&QuestionData> {
        match &self.kind {
            VariableKind::Question(q) => Some(q),
            VariableKind::AnnotationTask(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodebookPhase {
    pub id: NodeId,
    pub name: String,
    /// Display label; the phase name when the node carries none.
    pub label: String,
    #[serde(rename = "type")]
    pub kind: PhaseKind,
    pub variables: Vec<CodebookVariable>,
}

/// Group a pre-ordered node list into phases.
pub fn build_phases(sorted: &[TreeNode]) -> CodebookResult<Vec<CodebookPhase>> {
    let mut phases: Vec<CodebookPhase> = Vec::new();
    // (level, layout owner, layout)
    let mut layouts: Vec<(usize, NodeId, &Layout)> = Vec::new();

    for t in sorted {
        let node = &t.node;
        if t.level == 0 {
            layouts.clear();
        } else {
            while layouts.last().is_some_and(|(level, _, _)| *level >= t.level) {
                layouts.pop();
            }
        }
        if let Some(layout) = node.data.layout() {
            layouts.push((t.level, node.id, layout));
        }
        let inherited = layouts.last().map(|(_, id, layout)| (*id, (*layout).clone()));

        let kind = match &node.data {
            NodeData::SurveyPhase(c) | NodeData::AnnotationPhase(c) => {
                let kind = if matches!(node.data, NodeData::SurveyPhase(_)) {
                    PhaseKind::Survey
                } else {
                    PhaseKind::Annotation
                };
                phases.push(CodebookPhase {
                    id: node.id,
                    name: node.name.clone(),
                    label: c.label.clone().unwrap_or_else(|| node.name.clone()),
                    kind,
                    variables: Vec::new(),
                });
                continue;
            }
            NodeData::SurveyGroup(_) | NodeData::AnnotationGroup(_) => continue,
            NodeData::Question(q) => VariableKind::Question(q.clone()),
            NodeData::AnnotationTask(a) => VariableKind::AnnotationTask(a.clone()),
        };

        let phase = match phases.last_mut() {
            Some(p) if p.id == t.phase_id => p,
            _ => return Err(CodebookError::OrphanVariable(node.id)),
        };
        let (layout_id, layout) = inherited.unzip();
        phase.variables.push(CodebookVariable {
            id: node.id,
            name: node.name.clone(),
            phase_id: phase.id,
            layout,
            layout_id,
            global_position: t.global_position,
            dependencies: t.dependencies.clone(),
            kind,
        });
    }

    tracing::debug!(phases = phases.len(), "assembled codebook phases");
    Ok(phases)
}

/// An assembled codebook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Codebook {
    pub phases: Vec<CodebookPhase>,
}

impl Codebook {
    pub fn phase(&self, id: NodeId) -> Option<&CodebookPhase> {
        self.phases.iter().find(|p| p.id == id)
    }

    /// First variable with this name, in codebook order.
    pub fn variable(&self, name: &str) -> Option<&CodebookVariable> {
        self.variables().find(|v| v.name == name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &CodebookVariable> {
        self.phases.iter().flat_map(|p| p.variables.iter())
    }
}

/// Validate, sort and assemble a raw node snapshot.
pub fn build_codebook(nodes: &[CodebookNode], limits: &TreeLimits) -> CodebookResult<Codebook> {
    let sorted = validate_tree(nodes, limits)?;
    Ok(Codebook {
        phases: build_phases(&sorted)?,
    })
}
