//! Damage accounting across submissions of one session.

use serde::{Deserialize, Serialize};

use crate::conditions::ConditionReport;

/// Damage of one evaluation, or the running total of a ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Damage {
    pub damage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_over: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_damage: Option<f64>,
}

/// Accumulates damage over a session. Once the total exceeds `max_damage`
/// the session is over and stays over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageLedger {
    pub total: f64,
    #[serde(default)]
    pub max_damage: Option<f64>,
    #[serde(default)]
    pub game_over: bool,
}

impl DamageLedger {
    pub fn new(total: f64, max_damage: Option<f64>) -> Self {
        let mut ledger = Self {
            total,
            max_damage,
            game_over: false,
        };
        ledger.check();
        ledger
    }

    /// Add the damage of one evaluation and return the session totals.
    pub fn record(&mut self, report: &ConditionReport) -> Damage {
        self.total += report.damage.damage;
        self.check();
        if self.game_over {
            tracing::info!(total = self.total, max = ?self.max_damage, "damage limit exceeded");
        }
        self.snapshot()
    }

    pub fn snapshot(&self) -> Damage {
        Damage {
            damage: self.total,
            game_over: self.max_damage.map(|_| self.game_over),
            max_damage: self.max_damage,
        }
    }

    fn check(&mut self) {
        if let Some(max) = self.max_damage {
            self.game_over |= self.total > max;
        }
    }
}
