//! Condition / evaluation engine for gold units.
//!
//! Train and test units carry conditionals: per variable, the answers an
//! annotator is expected to give. Evaluating a submission yields one action
//! per conditional plus the damage it caused. Train units give visible
//! feedback (applaud / retry with a message); test units are silent and only
//! add damage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{ConditionDefaults, UnitTypeDefaults};
use crate::model::{ActionKind, Annotation, AnnotationId, Conditional, Unit, UnitStatus};
use crate::progress::Damage;

/// Feedback for one variable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Action {
    pub action: Option<ActionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub submessages: Vec<String>,
    #[serde(default)]
    pub correct: Vec<AnnotationId>,
    #[serde(default)]
    pub incorrect: Vec<AnnotationId>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionReport {
    pub evaluation: BTreeMap<String, Action>,
    pub damage: Damage,
}

impl ConditionReport {
    /// True when any variable asks for a retry; the session should not
    /// advance past the unit.
    pub fn blocks_progress(&self) -> bool {
        self.evaluation
            .values()
            .any(|a| matches!(a.action, Some(ActionKind::Retry | ActionKind::Block)))
    }
}

/// Evaluate the submitted `annotations` against the conditionals of `unit`.
///
/// Units that are neither `train` nor `test` produce an empty report.
pub fn evaluate_conditions(unit: &Unit, annotations: &[Annotation], defaults: &ConditionDefaults) -> ConditionReport {
    let mut report = ConditionReport::default();
    let Some(unit_defaults) = defaults.for_unit_type(&unit.unit_type) else {
        return report;
    };

    for conditional in &unit.conditionals {
        let submitted: Vec<&Annotation> = annotations
            .iter()
            .filter(|a| !a.deleted && a.variable == conditional.variable)
            .collect();

        if submitted.is_empty() && unit.status != UnitStatus::Done {
            // Not answered yet: nothing to judge.
            report.evaluation.insert(
                conditional.variable.clone(),
                Action {
                    action: conditional.on_success.or(unit_defaults.on_success),
                    ..Action::default()
                },
            );
            continue;
        }

        let (action, damage) = evaluate_one(conditional, &submitted, unit_defaults);
        tracing::debug!(
            unit = %unit.id,
            variable = %conditional.variable,
            action = ?action.action,
            damage,
            "evaluated conditional"
        );
        report.damage.damage += damage;
        report.evaluation.insert(conditional.variable.clone(), action);
    }

    report
}

fn evaluate_one(conditional: &Conditional, submitted: &[&Annotation], defaults: &UnitTypeDefaults) -> (Action, f64) {
    let mut valid = vec![false; submitted.len()];
    let mut satisfied = true;
    let mut damage = 0.0;
    let mut submessages = Vec::new();

    for condition in &conditional.conditions {
        match submitted.iter().position(|a| condition.matches(a)) {
            Some(i) => valid[i] = true,
            None => {
                satisfied = false;
                damage += condition.damage.unwrap_or(0.0);
                if let Some(m) = &condition.submessage {
                    submessages.push(m.clone());
                }
            }
        }
    }

    let success = satisfied && valid.iter().all(|v| *v);

    let ids = |want: bool| -> Vec<AnnotationId> {
        submitted
            .iter()
            .zip(&valid)
            .filter(|(_, v)| **v == want)
            .map(|(a, _)| a.id.clone())
            .collect()
    };

    let mut action = Action {
        action: None,
        message: None,
        submessages,
        correct: ids(true),
        incorrect: ids(false),
    };

    if success {
        action.action = conditional.on_success.or(defaults.on_success);
    } else {
        action.action = conditional.on_fail.or(defaults.on_fail);
        action.message = conditional
            .message
            .clone()
            .or_else(|| defaults.retry_message.then(|| retry_message(&conditional.variable)));
        damage += conditional.damage.unwrap_or(defaults.damage);
    }

    (action, damage)
}

fn retry_message(variable: &str) -> String {
    format!("### Please retry\n\nThe answer to **{variable}** is not what we expected. Have another look and try again.")
}
