//! Units: the documents an annotator codes, plus their tokenization.

use serde::{Deserialize, Serialize};

use super::{Annotation, Conditional};

/// Role of a unit within a job.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitType {
    /// Gold unit with visible feedback.
    Train,
    /// Gold unit used silently for quality control.
    Test,
    #[default]
    Code,
    Survey,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    #[default]
    InProgress,
    Done,
}

/// How a unit field is rendered. Only text, markdown and image fields are
/// addressable by `perField` questions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    #[default]
    Text,
    Markdown,
    Image,
    Meta,
}

impl FieldKind {
    pub fn is_content(&self) -> bool {
        !matches!(self, Self::Meta)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitField {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub value: String,
}

impl UnitField {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Text,
            value: value.into(),
        }
    }
}

/// A unit as handed over by the persistence layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub id: String,
    #[serde(default, rename = "type")]
    pub unit_type: UnitType,
    #[serde(default)]
    pub status: UnitStatus,
    #[serde(default)]
    pub fields: Vec<UnitField>,
    /// Annotations that ship with the unit (imported or produced earlier).
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub conditionals: Vec<Conditional>,
}

impl Unit {
    pub fn new(id: impl Into<String>, unit_type: UnitType) -> Self {
        Self {
            id: id.into(),
            unit_type,
            ..Self::default()
        }
    }

    pub fn with_field(mut self, field: UnitField) -> Self {
        self.fields.push(field);
        self
    }

    /// Content fields in unit order.
    pub fn content_fields(&self) -> impl Iterator<Item = &UnitField> {
        self.fields.iter().filter(|f| f.kind.is_content())
    }

    pub fn tokens(&self) -> Vec<Token> {
        let mut out = Vec::new();
        for f in &self.fields {
            if matches!(f.kind, FieldKind::Text | FieldKind::Markdown) {
                tokenize_into(&f.name, &f.value, &mut out);
            }
        }
        out
    }
}

/// A token of a text field. `offset`/`length` count characters, `index` is
/// global across the unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub field: String,
    pub index: usize,
    pub offset: usize,
    pub length: usize,
    pub text: String,
}

impl Token {
    pub fn overlaps(&self, field: &str, offset: usize, length: usize) -> bool {
        self.field == field && self.offset < offset + length && offset < self.offset + self.length
    }
}

/// Split a text into word tokens (runs of alphanumeric characters) and single
/// punctuation tokens. Whitespace never forms a token.
pub fn tokenize(field: &str, text: &str) -> Vec<Token> {
    let mut out = Vec::new();
    tokenize_into(field, text, &mut out);
    out
}

fn tokenize_into(field: &str, text: &str, out: &mut Vec<Token>) {
    let mut word: Option<(usize, String)> = None;

    let flush = |word: &mut Option<(usize, String)>, out: &mut Vec<Token>| {
        if let Some((start, w)) = word.take() {
            let length = w.chars().count();
            out.push(Token {
                field: field.to_string(),
                index: out.len(),
                offset: start,
                length,
                text: w,
            });
        }
    };

    for (i, c) in text.chars().enumerate() {
        if c.is_alphanumeric() || c == '_' {
            if let Some((_, w)) = word.as_mut() {
                w.push(c);
            } else {
                word = Some((i, c.to_string()));
            }
            continue;
        }
        flush(&mut word, out);
        if !c.is_whitespace() {
            out.push(Token {
                field: field.to_string(),
                index: out.len(),
                offset: i,
                length: 1,
                text: c.to_string(),
            });
        }
    }
    flush(&mut word, out);
}
