//! Per-unit annotation store.
//!
//! The library owns the annotations of the unit being coded plus the session
//! scoped survey answers. It keeps two derived indices, by variable and by
//! token, and both are rebuilt together by [`AnnotationLibrary::rebuild_indices`]
//! after every change. The indices are never serialized; a deserialized library
//! rebuilds them from its annotations.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::errors::{CodebookError, CodebookResult};
use crate::model::{validate, Annotation, AnnotationId, AnnotationKind, Token, Unit};

/// Timestamp source for `created`. The core never reads the system time; the
/// caller builds a clock from whatever time it trusts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clock {
    now_rfc3339: String,
}

impl Default for Clock {
    fn default() -> Self {
        Self::fixed("1970-01-01T00:00:00Z")
    }
}

impl Clock {
    pub fn fixed(now_rfc3339: impl Into<String>) -> Self {
        Self {
            now_rfc3339: now_rfc3339.into(),
        }
    }

    pub fn at(t: OffsetDateTime) -> CodebookResult<Self> {
        let now = t
            .format(&Rfc3339)
            .map_err(|e| CodebookError::invalid_argument(format!("cannot format timestamp: {e}")))?;
        Ok(Self::fixed(now))
    }

    pub fn now(&self) -> &str {
        &self.now_rfc3339
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "LibraryRecord", try_from = "LibraryRecord")]
pub struct AnnotationLibrary {
    pub unit_id: String,
    annotations: BTreeMap<AnnotationId, Annotation>,
    by_variable: BTreeMap<String, BTreeSet<AnnotationId>>,
    by_token: BTreeMap<usize, BTreeSet<AnnotationId>>,
    history: Vec<AnnotationId>,
    global_annotations: Vec<Annotation>,
    tokens: Vec<Token>,
}

/// Wire form of [`AnnotationLibrary`]: annotations in history order, no indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LibraryRecord {
    unit_id: String,
    #[serde(default)]
    annotations: Vec<Annotation>,
    #[serde(default)]
    global_annotations: Vec<Annotation>,
    #[serde(default)]
    tokens: Vec<Token>,
}

impl From<AnnotationLibrary> for LibraryRecord {
    fn from(lib: AnnotationLibrary) -> Self {
        Self {
            annotations: lib.to_vec(),
            unit_id: lib.unit_id,
            global_annotations: lib.global_annotations,
            tokens: lib.tokens,
        }
    }
}

impl TryFrom<LibraryRecord> for AnnotationLibrary {
    type Error = CodebookError;

    fn try_from(record: LibraryRecord) -> CodebookResult<Self> {
        let mut lib = Self {
            unit_id: record.unit_id,
            global_annotations: record.global_annotations,
            tokens: record.tokens,
            ..Self::default()
        };
        lib.replace_all(record.annotations)?;
        Ok(lib)
    }
}

impl AnnotationLibrary {
    /// Load the annotations that ship with `unit`.
    pub fn for_unit(unit: &Unit) -> CodebookResult<Self> {
        let mut lib = Self {
            unit_id: unit.id.clone(),
            tokens: unit.tokens(),
            ..Self::default()
        };
        lib.replace_all(unit.annotations.clone())?;
        Ok(lib)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Annotation> {
        self.annotations.get(id)
    }

    /// Annotations in insertion order.
    pub fn annotations(&self) -> impl Iterator<Item = &Annotation> {
        self.history.iter().filter_map(|id| self.annotations.get(id))
    }

    pub fn to_vec(&self) -> Vec<Annotation> {
        self.annotations().cloned().collect()
    }

    pub fn for_variable<'a>(&'a self, variable: &str) -> impl Iterator<Item = &'a Annotation> + 'a {
        self.by_variable
            .get(variable)
            .into_iter()
            .flatten()
            .filter_map(|id| self.annotations.get(id))
    }

    /// Span annotations covering the token at `index`.
    pub fn at_token(&self, index: usize) -> impl Iterator<Item = &Annotation> {
        self.by_token
            .get(&index)
            .into_iter()
            .flatten()
            .filter_map(|id| self.annotations.get(id))
    }

    pub fn history(&self) -> &[AnnotationId] {
        &self.history
    }

    pub fn global_annotations(&self) -> &[Annotation] {
        &self.global_annotations
    }

    pub fn set_global_annotations(&mut self, annotations: Vec<Annotation>) {
        self.global_annotations = annotations;
    }

    /// Add an annotation with a caller-chosen id.
    pub fn add(&mut self, annotation: Annotation) -> CodebookResult<()> {
        if self.annotations.contains_key(&annotation.id) {
            return Err(CodebookError::invalid_argument(format!(
                "duplicate annotation id: {}",
                annotation.id
            )));
        }
        self.check_endpoints(&annotation)?;
        self.history.push(annotation.id.clone());
        self.annotations.insert(annotation.id.clone(), annotation);
        self.rebuild_indices();
        Ok(())
    }

    /// Create an annotation with a fresh id and creation time.
    pub fn add_new(
        &mut self,
        variable: impl Into<String>,
        kind: AnnotationKind,
        clock: &Clock,
        edit: impl FnOnce(&mut Annotation),
    ) -> CodebookResult<AnnotationId> {
        let id = Uuid::new_v4().to_string();
        let mut a = Annotation::new(id.clone(), variable, kind);
        a.created = Some(clock.now().to_string());
        edit(&mut a);
        a.id = id.clone();
        self.add(a)?;
        Ok(id)
    }

    /// Edit an annotation in place. The id cannot change, and the edited
    /// annotation is checked like a new one before it replaces the old.
    pub fn update(&mut self, id: &str, edit: impl FnOnce(&mut Annotation)) -> CodebookResult<()> {
        let mut a = self
            .annotations
            .get(id)
            .cloned()
            .ok_or_else(|| CodebookError::invalid_argument(format!("unknown annotation id: {id}")))?;
        edit(&mut a);
        a.id = id.to_string();
        self.check_endpoints(&a)?;

        self.annotations.insert(a.id.clone(), a);
        self.rebuild_indices();
        Ok(())
    }

    /// Remove an annotation and every relation that points at it, directly or
    /// through other removed relations. Returns the removed annotations.
    pub fn remove(&mut self, id: &str) -> Vec<Annotation> {
        let Some(first) = self.annotations.remove(id) else {
            return Vec::new();
        };
        let mut removed = vec![first];
        let mut gone: BTreeSet<AnnotationId> = BTreeSet::from([id.to_string()]);

        loop {
            let dependent: Vec<AnnotationId> = self
                .annotations
                .values()
                .filter(|a| {
                    matches!(&a.kind, AnnotationKind::Relation { from_id, to_id }
                        if gone.contains(from_id) || gone.contains(to_id))
                })
                .map(|a| a.id.clone())
                .collect();
            if dependent.is_empty() {
                break;
            }
            for d in dependent {
                if let Some(a) = self.annotations.remove(&d) {
                    removed.push(a);
                }
                gone.insert(d);
            }
        }

        self.history.retain(|h| self.annotations.contains_key(h));
        self.rebuild_indices();
        removed
    }

    /// Replace the whole set, keeping the given order as history.
    pub fn replace_all(&mut self, annotations: Vec<Annotation>) -> CodebookResult<()> {
        validate::annotations_basic(&annotations)?;
        self.history = annotations.iter().map(|a| a.id.clone()).collect();
        self.annotations = annotations.into_iter().map(|a| (a.id.clone(), a)).collect();
        self.rebuild_indices();
        Ok(())
    }

    fn check_endpoints(&self, annotation: &Annotation) -> CodebookResult<()> {
        if let AnnotationKind::Relation { from_id, to_id } = &annotation.kind {
            for end in [from_id, to_id] {
                if !self.annotations.contains_key(end) {
                    return Err(CodebookError::invalid_argument(format!(
                        "relation {} references missing annotation id: {end}",
                        annotation.id
                    )));
                }
            }
        }
        Ok(())
    }

    /// Recompute `by_variable` and `by_token` from `annotations`.
    fn rebuild_indices(&mut self) {
        self.by_variable.clear();
        self.by_token.clear();

        for a in self.annotations.values() {
            self.by_variable
                .entry(a.variable.clone())
                .or_default()
                .insert(a.id.clone());

            if let AnnotationKind::Span { field, offset, length, .. } = &a.kind {
                for t in self.tokens.iter().filter(|t| t.overlaps(field, *offset, *length)) {
                    self.by_token.entry(t.index).or_default().insert(a.id.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::model::{UnitField, UnitType};

    fn library() -> AnnotationLibrary {
        let mut unit = Unit::new("u1", UnitType::Code).with_field(UnitField::text("text", "Alice met Bob"));
        unit.annotations = vec![
            Annotation::span("a", "actor", "text", 0, 5).with_value("person"),
            Annotation::span("b", "actor", "text", 10, 3).with_value("person"),
        ];
        AnnotationLibrary::for_unit(&unit).unwrap()
    }

    #[test]
    fn indices_follow_changes() {
        let mut lib = library();
        assert_eq!(lib.for_variable("actor").count(), 2);
        assert_eq!(lib.at_token(0).map(|a| a.id.as_str()).collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(lib.at_token(2).count(), 1);
        assert_eq!(lib.at_token(1).count(), 0);

        lib.update("b", |a| a.variable = "target".into()).unwrap();
        assert_eq!(lib.for_variable("actor").count(), 1);
        assert_eq!(lib.for_variable("target").count(), 1);
    }

    #[test]
    fn removal_cascades_to_relations() {
        let mut lib = library();
        lib.add(Annotation::new(
            "r",
            "rel",
            AnnotationKind::Relation {
                from_id: "a".into(),
                to_id: "b".into(),
            },
        ))
        .unwrap();
        assert_eq!(lib.len(), 3);

        let removed = lib.remove("b");
        assert_eq!(removed.len(), 2);
        assert_eq!(lib.history(), &["a".to_string()]);
        assert_eq!(lib.at_token(2).count(), 0);
    }

    #[test]
    fn add_new_stamps_id_and_time() {
        let mut lib = library();
        let clock = Clock::at(OffsetDateTime::UNIX_EPOCH).unwrap();
        let id = lib
            .add_new("topic", AnnotationKind::Unit, &clock, |a| {
                a.value = Some("economy".into());
            })
            .unwrap();
        let a = lib.get(&id).cloned().unwrap();
        assert_eq!(a.created.as_deref(), Some("1970-01-01T00:00:00Z"));
        assert_eq!(lib.history().last(), Some(&id));
        assert!(lib.add(a).is_err());
    }

    fn relation(id: &str, from: &str, to: &str) -> Annotation {
        Annotation::new(
            id,
            "rel",
            AnnotationKind::Relation {
                from_id: from.into(),
                to_id: to.into(),
            },
        )
    }

    #[test]
    fn update_rejects_dangling_relation_and_keeps_old() {
        let mut lib = library();
        let err = lib
            .update("a", |a| {
                a.kind = AnnotationKind::Relation {
                    from_id: "ghost".into(),
                    to_id: "b".into(),
                }
            })
            .unwrap_err();
        assert!(err.to_string().contains("ghost"));
        assert_matches!(lib.get("a").map(|a| &a.kind), Some(AnnotationKind::Span { .. }));
        assert_eq!(lib.at_token(0).count(), 1);
    }

    #[test]
    fn update_cannot_rename_an_annotation() {
        let mut lib = library();
        lib.update("a", |a| a.id = "b".into()).unwrap();
        assert_eq!(lib.len(), 2);
        assert_eq!(lib.get("a").map(|a| a.id.as_str()), Some("a"));
    }

    #[test]
    fn removal_cascades_through_nested_relations() {
        let mut lib = library();
        lib.add(relation("r1", "a", "b")).unwrap();
        lib.add(relation("r2", "r1", "a")).unwrap();
        lib.add(relation("r3", "b", "r2")).unwrap();

        let mut removed: Vec<_> = lib.remove("a").into_iter().map(|a| a.id).collect();
        removed.sort();
        assert_eq!(removed, vec!["a", "r1", "r2", "r3"]);
        assert_eq!(lib.history(), &["b".to_string()]);
    }

    #[test]
    fn deserialized_library_rebuilds_indices() {
        let lib: AnnotationLibrary = serde_json::from_value(serde_json::json!({
            "unitId": "u1",
            "annotations": [{"id": "a", "type": "unit", "variable": "x", "value": 1}],
            "byVariable": {}
        }))
        .unwrap();
        assert_eq!(lib.for_variable("x").count(), 1);

        let round: AnnotationLibrary = serde_json::from_value(serde_json::to_value(library()).unwrap()).unwrap();
        assert_eq!(round, library());
        assert_eq!(round.at_token(2).count(), 1);
    }

    #[test]
    fn deserialized_library_rejects_dangling_relation() {
        let res = serde_json::from_value::<AnnotationLibrary>(serde_json::json!({
            "unitId": "u1",
            "annotations": [{"id": "r", "type": "relation", "variable": "rel", "fromId": "a", "toId": "b"}]
        }));
        assert!(res.is_err());
    }

    #[test]
    fn dangling_relation_is_rejected() {
        let mut lib = library();
        let err = lib
            .add(Annotation::new(
                "r",
                "rel",
                AnnotationKind::Relation {
                    from_id: "a".into(),
                    to_id: "nope".into(),
                },
            ))
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }
}
