//! Codebook data models.
//!
//! This module defines the strongly-typed Rust representations of the records
//! exchanged with the persistence and presentation layers:
//! - codebook node rows (`CodebookNode`, tagged `NodeData`)
//! - annotations (`Annotation`, tagged `AnnotationKind`)
//! - units and their fields (`Unit`)
//! - gold conditionals (`Conditional`)
//!
//! Models are mostly "dumb" data. Structural policy lives in `crate::tree`,
//! evaluation policy in `crate::conditions`.
//!
//! Notes on serde:
//! - field names are camelCase (`parentId`, `perField`, `finishVariable`) to
//!   match the API layer byte for byte.
//! - tagged variants use the `type` key, with the display names the codebook
//!   editor stores (`"Annotation phase"`, `"Question"`, ...).

mod annotation;
mod condition;
mod node;
mod unit;

pub use annotation::{Annotation, AnnotationId, AnnotationKind, AnswerValue};
pub use condition::{ActionKind, Condition, Conditional, Operator};
pub use node::{
    AnnotationTaskData, Code, CodebookNode, ContainerData, Layout, NodeData, NodeId, NodeType,
    PhaseKind, QuestionData, QuestionType, RelationDef, ScaleItem, TaskKind, TreeType,
};
pub use unit::{tokenize, FieldKind, Token, Unit, UnitField, UnitStatus, UnitType};

/// Lightweight validation helpers for model consumers.
///
/// Full structural validation of a node snapshot is `crate::tree::validate_tree`.
pub mod validate {
    use std::collections::HashSet;

    use super::{Annotation, AnnotationKind};
    use crate::errors::{CodebookError, CodebookResult};

    /// Check that annotation ids are unique and that relation endpoints exist.
    pub fn annotations_basic(annotations: &[Annotation]) -> CodebookResult<()> {
        let mut ids = HashSet::new();
        for a in annotations {
            if !ids.insert(a.id.as_str()) {
                return Err(CodebookError::invalid_argument(format!(
                    "duplicate annotation id: {}",
                    a.id
                )));
            }
        }

        for a in annotations {
            if let AnnotationKind::Relation { from_id, to_id } = &a.kind {
                for end in [from_id, to_id] {
                    if !ids.contains(end.as_str()) {
                        return Err(CodebookError::invalid_argument(format!(
                            "relation {} references missing annotation id: {}",
                            a.id, end
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::validate::*;
    use super::*;

    #[test]
    fn dangling_relation_rejected() {
        let rel = Annotation::new(
            "r",
            "rel",
            AnnotationKind::Relation {
                from_id: "a".to_string(),
                to_id: "missing".to_string(),
            },
        );
        let anns = vec![Annotation::span("a", "actor", "text", 0, 1), rel];
        let err = annotations_basic(&anns).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
