//! codebook-core
//!
//! Core primitives for coding jobs:
//! - Codebook tree utilities (nested sort, cycle and parent-type checks, reindexing)
//! - Validate-then-commit tree mutations
//! - Codebook assembly into phases of variables
//! - Question unfolding per unit (`perField`, `perAnnotation`)
//! - Session progress and navigation
//! - Gold-unit condition evaluation with damage accounting
//!
//! The crate is pure: no I/O, no environment, no system clock. Callers hand in
//! snapshots and get derived views or position write-backs back.

pub mod assemble;
pub mod conditions;
pub mod config;
pub mod errors;
pub mod library;
pub mod model;
pub mod progress;
pub mod tree;
pub mod unfold;

pub use crate::errors::{CodebookError, CodebookResult, ErrorClass};

/// Convenience re-exports.
pub mod prelude {
    pub use crate::assemble::{build_codebook, build_phases, Codebook, CodebookPhase, CodebookVariable, VariableKind};
    pub use crate::conditions::{evaluate_conditions, Action, ConditionReport};
    pub use crate::config::{validate_config, ConditionDefaults, EngineConfig, Rules, TreeLimits};
    pub use crate::library::{AnnotationLibrary, Clock};
    pub use crate::model::{
        Annotation, AnnotationKind, AnswerValue, CodebookNode, Conditional, NodeData, NodeId, NodeType, Unit,
        UnitStatus, UnitType,
    };
    pub use crate::progress::{
        compute_progress, compute_units_done, compute_variable_status, Damage, DamageLedger, Pointer,
        ProgressState, UnitProgress, VariableStatus,
    };
    pub use crate::tree::{
        detects_cycle, is_valid_parent, recursive_descendants, reindex_positions, sort_nested,
        sort_nested_with_limits, validate_tree, CodebookTree, NewNode, PositionUpdate, ReindexScope,
        TreeChanges, TreeNode,
    };
    pub use crate::unfold::{first_open_question, question_status, unfold_questions, QuestionInstance};
    pub use crate::{CodebookError, CodebookResult};
}
