//! Annotations: the answers an annotator produces.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an annotation.
pub type AnnotationId = String;

/// A scalar answer value as it appears in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl AnswerValue {
    /// Numeric view: numbers as-is, numeric strings parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok(),
            Self::Bool(_) => None,
        }
    }

    /// Compare two values. Numbers (and numeric strings) compare numerically,
    /// texts lexicographically, booleans only with booleans.
    pub fn compare(&self, other: &AnswerValue) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => match (self.as_f64(), other.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => Some(a.cmp(b)),
            },
            (Self::Bool(_), _) | (_, Self::Bool(_)) => None,
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<f64> for AnswerValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// Shape of an annotation, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AnnotationKind {
    Span {
        field: String,
        offset: usize,
        length: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Field {
        field: String,
    },
    Unit,
    Relation {
        #[serde(rename = "fromId")]
        from_id: AnnotationId,
        #[serde(rename = "toId")]
        to_id: AnnotationId,
    },
    /// The annotator explicitly skipped the variable.
    Skip,
}

/// One annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub id: AnnotationId,
    pub variable: String,
    #[serde(flatten)]
    pub kind: AnnotationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AnswerValue>,
    /// RFC 3339 creation time, injected by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    /// Set when the annotator finished the variable (not merely touched it).
    #[serde(default)]
    pub finish_variable: bool,
    /// Set when the annotator also finished the repeat loop of the variable.
    #[serde(default)]
    pub finish_loop: bool,
    #[serde(default)]
    pub deleted: bool,
}

impl Annotation {
    pub fn new(id: impl Into<AnnotationId>, variable: impl Into<String>, kind: AnnotationKind) -> Self {
        Self {
            id: id.into(),
            variable: variable.into(),
            kind,
            code: None,
            value: None,
            created: None,
            finish_variable: false,
            finish_loop: false,
            deleted: false,
        }
    }

    pub fn span(id: impl Into<AnnotationId>, variable: impl Into<String>, field: impl Into<String>, offset: usize, length: usize) -> Self {
        Self::new(
            id,
            variable,
            AnnotationKind::Span {
                field: field.into(),
                offset,
                length,
                text: None,
            },
        )
    }

    pub fn unit(id: impl Into<AnnotationId>, variable: impl Into<String>) -> Self {
        Self::new(id, variable, AnnotationKind::Unit)
    }

    pub fn with_value(mut self, value: impl Into<AnswerValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Mark as a finished answer (both finishing flags set).
    pub fn finished(mut self) -> Self {
        self.finish_variable = true;
        self.finish_loop = true;
        self
    }

    pub fn field(&self) -> Option<&str> {
        match &self.kind {
            AnnotationKind::Span { field, .. } | AnnotationKind::Field { field } => Some(field),
            _ => None,
        }
    }

    pub fn offset(&self) -> Option<usize> {
        match &self.kind {
            AnnotationKind::Span { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    pub fn length(&self) -> Option<usize> {
        match &self.kind {
            AnnotationKind::Span { length, .. } => Some(*length),
            _ => None,
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self.kind, AnnotationKind::Skip)
    }

    /// True when the annotation counts as a completed answer.
    pub fn is_finishing(&self) -> bool {
        !self.deleted && self.finish_variable && self.finish_loop
    }

    /// Composite key identifying the same logical annotation:
    /// field + variable + value + offset + length. Values compare by their
    /// display form, so `5` and `"5"` share a key.
    pub fn dedup_key(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.field().unwrap_or(""),
            self.variable,
            self.value.as_ref().map(|v| v.to_string()).unwrap_or_default(),
            self.offset().map(|o| o.to_string()).unwrap_or_default(),
            self.length().map(|l| l.to_string()).unwrap_or_default(),
        )
    }
}
