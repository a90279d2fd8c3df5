//! Codebook node rows and their typed payloads.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Primary key of a codebook node row.
pub type NodeId = i64;

/// One row of the codebook tree as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodebookNode {
    pub id: NodeId,
    #[serde(default)]
    pub parent_id: Option<NodeId>,
    /// Ordering key among siblings. Fractional values are only ever temporary.
    #[serde(default)]
    pub position: f64,
    pub name: String,
    pub data: NodeData,
}

impl CodebookNode {
    pub fn new(id: NodeId, parent_id: Option<NodeId>, position: f64, name: impl Into<String>, data: NodeData) -> Self {
        Self {
            id,
            parent_id,
            position,
            name: name.into(),
            data,
        }
    }

    pub fn node_type(&self) -> NodeType {
        self.data.node_type()
    }
}

/// The six node type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeType {
    #[serde(rename = "Survey phase")]
    SurveyPhase,
    #[serde(rename = "Survey group")]
    SurveyGroup,
    #[serde(rename = "Annotation phase")]
    AnnotationPhase,
    #[serde(rename = "Annotation group")]
    AnnotationGroup,
    #[serde(rename = "Question")]
    Question,
    #[serde(rename = "Annotation task")]
    AnnotationTask,
}

impl NodeType {
    pub const ALL: [NodeType; 6] = [
        NodeType::SurveyPhase,
        NodeType::SurveyGroup,
        NodeType::AnnotationPhase,
        NodeType::AnnotationGroup,
        NodeType::Question,
        NodeType::AnnotationTask,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SurveyPhase => "Survey phase",
            Self::SurveyGroup => "Survey group",
            Self::AnnotationPhase => "Annotation phase",
            Self::AnnotationGroup => "Annotation group",
            Self::Question => "Question",
            Self::AnnotationTask => "Annotation task",
        }
    }

    pub fn is_phase(&self) -> bool {
        matches!(self, Self::SurveyPhase | Self::AnnotationPhase)
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Self::SurveyGroup | Self::AnnotationGroup)
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Self::Question | Self::AnnotationTask)
    }

    pub fn tree_type(&self) -> TreeType {
        if self.is_phase() {
            TreeType::Phase
        } else if self.is_group() {
            TreeType::Group
        } else {
            TreeType::Variable
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural role of a node. Phases are the roots of the forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreeType {
    Phase,
    Group,
    Variable,
}

/// Survey or annotation family of a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Survey,
    Annotation,
}

/// Type-specific node content, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum NodeData {
    #[serde(rename = "Survey phase")]
    SurveyPhase(ContainerData),
    #[serde(rename = "Survey group")]
    SurveyGroup(ContainerData),
    #[serde(rename = "Annotation phase")]
    AnnotationPhase(ContainerData),
    #[serde(rename = "Annotation group")]
    AnnotationGroup(ContainerData),
    #[serde(rename = "Question")]
    Question(QuestionData),
    #[serde(rename = "Annotation task")]
    AnnotationTask(AnnotationTaskData),
}

impl NodeData {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::SurveyPhase(_) => NodeType::SurveyPhase,
            Self::SurveyGroup(_) => NodeType::SurveyGroup,
            Self::AnnotationPhase(_) => NodeType::AnnotationPhase,
            Self::AnnotationGroup(_) => NodeType::AnnotationGroup,
            Self::Question(_) => NodeType::Question,
            Self::AnnotationTask(_) => NodeType::AnnotationTask,
        }
    }

    /// Layout carried by this node, if it owns one.
    pub fn layout(&self) -> Option<&Layout> {
        match self {
            Self::SurveyPhase(c)
            | Self::SurveyGroup(c)
            | Self::AnnotationPhase(c)
            | Self::AnnotationGroup(c) => c.layout.as_ref(),
            Self::Question(_) | Self::AnnotationTask(_) => None,
        }
    }

    /// Variable names referenced by this node's content: `{name}` placeholders
    /// in its texts and the `perAnnotation` targets.
    pub fn dependencies(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        match self {
            Self::Question(q) => {
                collect_placeholders(&q.question, &mut out);
                if let Some(i) = &q.instruction {
                    collect_placeholders(i, &mut out);
                }
                if let Some(per) = &q.per_annotation {
                    out.extend(per.iter().cloned());
                }
            }
            Self::AnnotationTask(t) => {
                if let Some(i) = &t.instruction {
                    collect_placeholders(i, &mut out);
                }
            }
            _ => {}
        }
        out
    }
}

fn collect_placeholders(text: &str, out: &mut BTreeSet<String>) {
    let mut rest = text;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = after[..end].trim().trim_matches(|c| c == '{' || c == '}');
        if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '-')) {
            out.insert(name.to_string());
        }
        rest = &after[end + 1..];
    }
}

/// Field arrangement for descendants of a phase or group. Opaque to the core.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layout(pub Map<String, Value>);

/// Payload of phases and groups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<Layout>,
}

/// How a question is answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum QuestionType {
    #[default]
    SelectCode,
    Scale,
    Search,
    Confirm,
    Inputs,
}

/// One answer option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Code {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<super::AnswerValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// One item of a scale question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Payload of a `Question` node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionData {
    #[serde(default)]
    pub question: String,
    #[serde(default, rename = "questionType")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub codes: Vec<Code>,
    #[serde(default)]
    pub items: Vec<ScaleItem>,
    #[serde(default)]
    pub multiple: bool,
    #[serde(default)]
    pub vertical: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    /// Repeat the question for every unit field listed here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_field: Option<Vec<String>>,
    /// Repeat the question for every unit annotation of the listed variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_annotation: Option<Vec<String>>,
    #[serde(default)]
    pub focus_annotations: bool,
}

/// A relation type an annotation task allows between two span annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationDef {
    pub codes: Vec<Code>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_variable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_variable: Option<String>,
}

/// What an annotation task asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskKind {
    Span {
        #[serde(default)]
        codes: Vec<Code>,
    },
    Relation {
        #[serde(default)]
        relations: Vec<RelationDef>,
    },
}

/// Payload of an `Annotation task` node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationTaskData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    pub task: TaskKind,
}
