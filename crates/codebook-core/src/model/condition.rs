//! Gold-unit conditionals and the actions they produce.

use serde::{Deserialize, Serialize};

use super::{Annotation, AnswerValue};

/// Comparison operator of a condition. Defaults to `==`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[default]
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl Operator {
    /// Apply `actual <op> expected`. Incomparable values only satisfy `!=`.
    pub fn apply(&self, actual: &AnswerValue, expected: &AnswerValue) -> bool {
        use std::cmp::Ordering::*;

        let ord = actual.compare(expected);
        match self {
            Self::Eq => ord == Some(Equal),
            Self::Ne => ord != Some(Equal),
            Self::Lt => ord == Some(Less),
            Self::Le => matches!(ord, Some(Less | Equal)),
            Self::Gt => ord == Some(Greater),
            Self::Ge => matches!(ord, Some(Greater | Equal)),
        }
    }
}

/// One expected answer within a conditional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub value: AnswerValue,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submessage: Option<String>,
}

impl Condition {
    pub fn new(value: impl Into<AnswerValue>) -> Self {
        Self {
            value: value.into(),
            operator: Operator::Eq,
            field: None,
            offset: None,
            length: None,
            damage: None,
            submessage: None,
        }
    }

    /// True when the annotation satisfies the position constraints (if any)
    /// and the value comparison. The comparison uses `value`, never `code`.
    pub fn matches(&self, a: &Annotation) -> bool {
        if let Some(field) = &self.field {
            if a.field() != Some(field.as_str()) {
                return false;
            }
        }
        if let Some(offset) = self.offset {
            if a.offset() != Some(offset) {
                return false;
            }
        }
        if let Some(length) = self.length {
            if a.length() != Some(length) {
                return false;
            }
        }
        match &a.value {
            Some(v) => self.operator.apply(v, &self.value),
            None => false,
        }
    }
}

/// Feedback a UI shows after evaluating a conditional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Retry,
    Block,
    Applaud,
}

/// Gold rule for one variable of a unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conditional {
    pub variable: String,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_success: Option<ActionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_fail: Option<ActionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operator_parses_from_symbols() {
        let c: Condition = serde_json::from_value(json!({"value": 3, "operator": ">="})).unwrap();
        assert_eq!(c.operator, Operator::Ge);
        let c: Condition = serde_json::from_value(json!({"value": "pro"})).unwrap();
        assert_eq!(c.operator, Operator::Eq);
    }

    #[test]
    fn condition_checks_position_and_value() {
        let mut c = Condition::new("pro");
        c.field = Some("text".to_string());
        c.offset = Some(3);

        let hit = Annotation::span("a", "stance", "text", 3, 4).with_value("pro");
        let wrong_place = Annotation::span("b", "stance", "text", 9, 4).with_value("pro");
        let no_field = Annotation::unit("c", "stance").with_value("pro");

        assert!(c.matches(&hit));
        assert!(!c.matches(&wrong_place));
        assert!(!c.matches(&no_field));
    }

    #[test]
    fn operators_over_mixed_operands() {
        use AnswerValue::{Bool, Number, Text};

        let ops = [Operator::Eq, Operator::Ne, Operator::Lt, Operator::Le, Operator::Gt, Operator::Ge];
        // (actual, expected, [==, !=, <, <=, >, >=])
        let table = [
            (Number(3.0), Number(5.0), [false, true, true, true, false, false]),
            (Number(5.0), Text("5".into()), [true, false, false, true, false, true]),
            (Text("10".into()), Number(9.0), [false, true, false, false, true, true]),
            (Text("10".into()), Text("9".into()), [false, true, false, false, true, true]),
            (Text("apple".into()), Text("banana".into()), [false, true, true, true, false, false]),
            (Text("pro".into()), Number(1.0), [false, true, false, false, false, false]),
            (Bool(true), Bool(true), [true, false, false, true, false, true]),
            (Bool(false), Bool(true), [false, true, true, true, false, false]),
            (Bool(true), Text("true".into()), [false, true, false, false, false, false]),
        ];

        for (actual, expected, want) in &table {
            for (op, want) in ops.iter().zip(want) {
                assert_eq!(op.apply(actual, expected), *want, "{actual:?} {op:?} {expected:?}");

                let mut c = Condition::new(expected.clone());
                c.operator = *op;
                let a = Annotation::unit("a", "v").with_value(actual.clone());
                assert_eq!(c.matches(&a), *want, "condition {actual:?} {op:?} {expected:?}");
            }
        }
    }

    #[test]
    fn code_is_not_compared() {
        let c = Condition::new("pro");
        let a = Annotation::unit("a", "stance").with_code("pro");
        assert!(!c.matches(&a));
    }
}
