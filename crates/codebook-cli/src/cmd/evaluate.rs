use anyhow::Result;
use serde::Serialize;

use codebook_core::conditions::{evaluate_conditions, ConditionReport};
use codebook_core::config::EngineConfig;
use codebook_core::progress::{Damage, DamageLedger};

use crate::io::input;
use crate::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateOut {
    #[serde(flatten)]
    pub report: ConditionReport,
    /// Session totals after this submission.
    pub session: Damage,
}

pub fn run(cfg: &EngineConfig, unit_path: &str, annotations_path: &str, damage: f64, max_damage: Option<f64>) -> Result<()> {
    let unit = input::read_unit(unit_path)?;
    let annotations = input::read_annotations(annotations_path)?;

    let report = evaluate_conditions(&unit, &annotations, &cfg.conditions);
    let mut ledger = DamageLedger::new(damage, max_damage);
    let session = ledger.record(&report);

    output::print(&EvaluateOut { report, session })
}
