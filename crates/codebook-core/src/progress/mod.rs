//! Progress / session state machine.
//!
//! A session walks through the phases of a codebook. Survey phases are tracked
//! per variable (from the session scoped survey answers); annotation phases are
//! tracked per unit (from the completion booleans the job layer stores).
//!
//! Everything here is recomputed from snapshots. Nothing is marked done by
//! navigating: only finishing annotations and completed units close a slot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::assemble::Codebook;
use crate::config::Rules;
use crate::errors::{CodebookError, CodebookResult};
use crate::model::{Annotation, NodeId, PhaseKind};

mod navigation;
mod session;

pub use session::{Damage, DamageLedger};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableStatus {
    pub done: bool,
    pub skip: bool,
}

impl VariableStatus {
    /// Done or skipped.
    pub fn closed(&self) -> bool {
        self.done || self.skip
    }
}

/// Status of `variable` given a set of annotations.
///
/// Done iff a non-deleted annotation on the variable carries both finishing
/// flags; skip iff such an annotation is an explicit skip.
pub fn compute_variable_status(annotations: &[Annotation], variable: &str) -> VariableStatus {
    let mut status = VariableStatus::default();
    for a in annotations.iter().filter(|a| a.variable == variable && a.is_finishing()) {
        status.done = true;
        status.skip |= a.is_skip();
    }
    status
}

/// The first open index, or the last index when everything is closed.
/// Empty lists yield 0.
pub fn current_index(closed: &[bool]) -> usize {
    closed
        .iter()
        .position(|c| !c)
        .unwrap_or_else(|| closed.len().saturating_sub(1))
}

/// Per-phase unit completion booleans, keyed by phase id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitProgress {
    #[serde(default)]
    pub units_done: BTreeMap<NodeId, Vec<bool>>,
}

impl UnitProgress {
    pub fn with_phase(mut self, phase_id: NodeId, units_done: Vec<bool>) -> Self {
        self.units_done.insert(phase_id, units_done);
        self
    }
}

pub fn compute_units_done(progress: &UnitProgress, phase_id: NodeId) -> CodebookResult<Vec<bool>> {
    progress
        .units_done
        .get(&phase_id)
        .cloned()
        .ok_or(CodebookError::MissingProgress(phase_id))
}

/// Session position: phase index, unit index, variable index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pointer {
    pub phase: usize,
    pub unit: usize,
    pub variable: usize,
}

impl Pointer {
    pub fn new(phase: usize, unit: usize, variable: usize) -> Self {
        Self { phase, unit, variable }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableProgress {
    pub id: NodeId,
    pub label: String,
    pub done: bool,
    pub skip: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseProgress {
    pub phase_id: NodeId,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: PhaseKind,
    pub variables: Vec<VariableProgress>,
    pub units_done: Vec<bool>,
    pub current_unit: usize,
    pub current_variable: usize,
    pub done: bool,
}

impl PhaseProgress {
    fn variables_closed(&self) -> Vec<bool> {
        self.variables.iter().map(|v| v.done || v.skip).collect()
    }

    /// Recompute the derived pointers and the done flag.
    fn settle(&mut self) {
        let closed = self.variables_closed();
        self.current_variable = current_index(&closed);
        self.current_unit = current_index(&self.units_done);
        self.done = match self.kind {
            PhaseKind::Survey => closed.iter().all(|c| *c),
            PhaseKind::Annotation => self.units_done.iter().all(|d| *d),
        };
    }

    /// Number of units (annotation phases) or 1 (survey phases).
    pub fn unit_slots(&self) -> usize {
        match self.kind {
            PhaseKind::Survey => 1,
            PhaseKind::Annotation => self.units_done.len().max(1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    pub current: Pointer,
    pub previous: Pointer,
    pub phases: Vec<PhaseProgress>,
    pub settings: Rules,
}

impl ProgressState {
    /// Index of the lowest phase that is not done; `None` once the session is
    /// finished (or the codebook has no phases).
    pub fn active_phase(&self) -> Option<usize> {
        self.phases.iter().position(|p| !p.done)
    }

    pub fn is_finished(&self) -> bool {
        self.active_phase().is_none()
    }

    /// Position of the first open slot of the active phase.
    pub fn frontier(&self) -> Option<Pointer> {
        let i = self.active_phase()?;
        let p = &self.phases[i];
        Some(Pointer::new(i, p.current_unit, p.current_variable))
    }

    /// Refresh the variable statuses of an annotation phase from the answers
    /// of the unit being coded.
    pub fn refresh_unit(&mut self, phase_index: usize, unit_annotations: &[Annotation]) -> CodebookResult<()> {
        let phase = self
            .phases
            .get_mut(phase_index)
            .ok_or_else(|| CodebookError::invalid_argument(format!("phase index {phase_index} out of range")))?;
        for v in phase.variables.iter_mut() {
            let s = compute_variable_status(unit_annotations, &v.label);
            v.done = s.done;
            v.skip = s.skip;
        }
        phase.settle();
        if self.current.phase == phase_index {
            self.current.variable = phase.current_variable;
        }
        Ok(())
    }
}

/// Build the progress state of a session.
pub fn compute_progress(
    codebook: &Codebook,
    global_annotations: &[Annotation],
    unit_progress: &UnitProgress,
    rules: Rules,
) -> CodebookResult<ProgressState> {
    let mut phases = Vec::with_capacity(codebook.phases.len());

    for phase in &codebook.phases {
        let variables = phase
            .variables
            .iter()
            .map(|v| {
                let status = match phase.kind {
                    PhaseKind::Survey => compute_variable_status(global_annotations, &v.name),
                    PhaseKind::Annotation => VariableStatus::default(),
                };
                VariableProgress {
                    id: v.id,
                    label: v.name.clone(),
                    done: status.done,
                    skip: status.skip,
                }
            })
            .collect();

        let units_done = match phase.kind {
            PhaseKind::Survey => Vec::new(),
            PhaseKind::Annotation => compute_units_done(unit_progress, phase.id)?,
        };

        let mut p = PhaseProgress {
            phase_id: phase.id,
            label: phase.label.clone(),
            kind: phase.kind,
            variables,
            units_done,
            current_unit: 0,
            current_variable: 0,
            done: false,
        };
        p.settle();
        phases.push(p);
    }

    let current = match phases.iter().position(|p| !p.done) {
        Some(i) => Pointer::new(i, phases[i].current_unit, phases[i].current_variable),
        None => match phases.last() {
            Some(p) => Pointer::new(phases.len() - 1, p.current_unit, p.current_variable),
            None => Pointer::default(),
        },
    };

    tracing::debug!(
        phases = phases.len(),
        active = ?phases.iter().position(|p| !p.done),
        "computed session progress"
    );

    Ok(ProgressState {
        current,
        previous: current,
        phases,
        settings: rules,
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::assemble::{CodebookPhase, CodebookVariable, VariableKind};
    use crate::model::{AnnotationKind, QuestionData};

    fn var(id: NodeId, name: &str) -> CodebookVariable {
        CodebookVariable {
            id,
            name: name.to_string(),
            phase_id: 0,
            layout: None,
            layout_id: None,
            global_position: 0,
            dependencies: Default::default(),
            kind: VariableKind::Question(QuestionData::default()),
        }
    }

    fn codebook() -> Codebook {
        Codebook {
            phases: vec![
                CodebookPhase {
                    id: 1,
                    name: "intro".into(),
                    label: "Intro".into(),
                    kind: PhaseKind::Survey,
                    variables: vec![var(2, "age"), var(3, "gender")],
                },
                CodebookPhase {
                    id: 4,
                    name: "code".into(),
                    label: "Code".into(),
                    kind: PhaseKind::Annotation,
                    variables: vec![var(5, "topic")],
                },
            ],
        }
    }

    #[test]
    fn current_index_rule() {
        assert_eq!(current_index(&[]), 0);
        assert_eq!(current_index(&[true, false, false]), 1);
        assert_eq!(current_index(&[true, true]), 1);
    }

    #[test]
    fn deleted_or_unfinished_annotations_do_not_count() {
        let mut deleted = Annotation::unit("a", "age").with_value(30.0).finished();
        deleted.deleted = true;
        let mut half = Annotation::unit("b", "age").with_value(30.0);
        half.finish_variable = true;
        assert!(!compute_variable_status(&[deleted, half], "age").done);

        let skip = Annotation::new("c", "age", AnnotationKind::Skip).finished();
        assert_eq!(compute_variable_status(&[skip], "age"), VariableStatus { done: true, skip: true });
    }

    #[test]
    fn survey_then_annotation_phase() {
        let answers = vec![Annotation::unit("a", "age").with_value(30.0).finished()];
        let progress = UnitProgress::default().with_phase(4, vec![false, false]);
        let state = compute_progress(&codebook(), &answers, &progress, Rules::default()).unwrap();

        assert_eq!(state.active_phase(), Some(0));
        assert_eq!(state.current, Pointer::new(0, 0, 1));
        assert!(!state.phases[0].done);
        assert_eq!(state.phases[1].current_unit, 0);
    }

    #[test]
    fn finished_session_has_no_active_phase() {
        let answers = vec![
            Annotation::unit("a", "age").with_value(30.0).finished(),
            Annotation::new("b", "gender", AnnotationKind::Skip).finished(),
        ];
        let progress = UnitProgress::default().with_phase(4, vec![true]);
        let state = compute_progress(&codebook(), &answers, &progress, Rules::default()).unwrap();
        assert!(state.is_finished());
        assert_eq!(state.current, Pointer::new(1, 0, 0));
        assert!(state.phases[0].variables[1].skip);
    }

    #[test]
    fn missing_unit_progress_is_an_error() {
        let err = compute_progress(&codebook(), &[], &UnitProgress::default(), Rules::default()).unwrap_err();
        assert_matches!(err, CodebookError::MissingProgress(4));
    }

    #[test]
    fn refresh_unit_moves_the_variable_pointer() {
        let mut cb = codebook();
        cb.phases[1].variables.push(var(6, "tone"));
        let progress = UnitProgress::default().with_phase(4, vec![false]);
        let mut state = compute_progress(&Codebook { phases: vec![cb.phases[1].clone()] }, &[], &progress, Rules::default()).unwrap();

        let answers = vec![Annotation::unit("t", "topic").with_value("economy").finished()];
        state.refresh_unit(0, &answers).unwrap();
        assert_eq!(state.current.variable, 1);
        assert!(state.phases[0].variables[0].done);
        assert!(!state.phases[0].done);
    }
}
