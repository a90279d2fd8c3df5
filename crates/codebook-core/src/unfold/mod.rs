//! Question unfolder.
//!
//! Expands the variables of one phase against one unit into the literal
//! sequence of questions an annotator answers:
//! - a plain variable yields one instance
//! - `perAnnotation` yields one instance per distinct unit annotation of the
//!   listed variables
//! - `perField` yields one instance per selected content field
//!
//! When a question sets both, `perAnnotation` wins.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::assemble::CodebookVariable;
use crate::model::{Annotation, FieldKind, NodeId, Unit};
use crate::progress::{current_index, VariableStatus};

mod fields;

pub use fields::{base_field_name, field_selected};

/// One concrete question for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionInstance {
    pub instance_id: String,
    pub variable: String,
    pub variable_id: NodeId,
    /// Fields the question is scoped to; `None` means the whole unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    /// The annotation a `perAnnotation` question is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Annotation>,
}

impl QuestionInstance {
    fn plain(v: &CodebookVariable) -> Self {
        Self {
            instance_id: v.name.clone(),
            variable: v.name.clone(),
            variable_id: v.id,
            fields: None,
            annotation: None,
        }
    }
}

/// Expand `variables` (in codebook order) against `unit`.
pub fn unfold_questions(variables: &[CodebookVariable], unit: &Unit) -> Vec<QuestionInstance> {
    let mut out = Vec::new();

    for v in variables {
        let Some(q) = v.question() else {
            out.push(QuestionInstance::plain(v));
            continue;
        };

        if let Some(targets) = &q.per_annotation {
            let mut seen = HashSet::new();
            for a in unit.annotations.iter().filter(|a| !a.deleted && targets.contains(&a.variable)) {
                if !seen.insert(a.dedup_key()) {
                    continue;
                }
                let fields = match (q.focus_annotations, a.field()) {
                    (true, Some(f)) => Some(vec![f.to_string()]),
                    _ => None,
                };
                out.push(QuestionInstance {
                    instance_id: format!("{}.{}", v.name, a.id),
                    variable: v.name.clone(),
                    variable_id: v.id,
                    fields,
                    annotation: Some(a.clone()),
                });
            }
            continue;
        }

        if let Some(per_field) = &q.per_field {
            let selected = unit
                .fields
                .iter()
                .filter(|f| matches!(f.kind, FieldKind::Text | FieldKind::Markdown | FieldKind::Image))
                .filter(|f| field_selected(per_field, &f.name));
            for f in selected {
                out.push(QuestionInstance {
                    instance_id: format!("{}.{}", v.name, f.name),
                    variable: v.name.clone(),
                    variable_id: v.id,
                    fields: Some(vec![f.name.clone()]),
                    annotation: None,
                });
            }
            continue;
        }

        out.push(QuestionInstance::plain(v));
    }

    tracing::trace!(unit = %unit.id, instances = out.len(), "unfolded questions");
    out
}

/// Answer status of one instance: finishing annotations of its variable,
/// restricted to its scope.
pub fn question_status(instance: &QuestionInstance, annotations: &[Annotation]) -> VariableStatus {
    let in_scope = |a: &&Annotation| -> bool {
        if a.variable != instance.variable || !a.is_finishing() {
            return false;
        }
        match (&instance.annotation, &instance.fields) {
            (Some(target), _) => {
                a.field() == target.field() && a.offset() == target.offset() && a.length() == target.length()
            }
            (None, Some(fields)) => a.field().is_some_and(|f| fields.iter().any(|x| x == f)),
            (None, None) => true,
        }
    };

    let mut status = VariableStatus::default();
    for a in annotations.iter().filter(in_scope) {
        status.done = true;
        status.skip |= a.is_skip();
    }
    status
}

/// Index of the question to show: the first open one, or the last one when
/// all are answered.
pub fn first_open_question(instances: &[QuestionInstance], annotations: &[Annotation]) -> usize {
    let closed: Vec<bool> = instances.iter().map(|i| question_status(i, annotations).closed()).collect();
    current_index(&closed)
}
